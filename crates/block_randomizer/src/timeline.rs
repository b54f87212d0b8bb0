//! One-time indexing of the deserializer's timeline: per-chunk sequence and
//! sample offsets, totals, and frame-mode detection.

use crate::errors::RandomizerError;

/// Describes one sequence on the deserializer's timeline.
///
/// A valid timeline is an ordered list of descriptions whose `id`s form a
/// dense zero-based range, whose `chunk_id` never decreases and advances by
/// at most one between neighbors, and whose `num_samples` is at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceDescription {
    pub id: usize,
    pub chunk_id: usize,
    pub num_samples: usize,
}

/// Start offsets of one chunk within the original timeline.
///
/// `ChunkInformation` entries live in an array of `num_chunks + 1`; the
/// final sentinel holds the totals, so chunk `k`'s sequence and sample
/// counts are the difference between entries `k + 1` and `k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInformation {
    pub sequence_position_start: usize,
    pub sample_position_start: usize,
}

/// Summary of a timeline, built once at randomizer construction.
#[derive(Debug, Clone)]
pub struct TimelineIndex {
    pub num_sequences: usize,
    pub num_chunks: usize,
    pub num_samples: usize,
    /// True when every sequence holds exactly one sample.
    pub frame_mode: bool,
    chunks: Vec<ChunkInformation>,
}

impl TimelineIndex {
    /// Scans the timeline once, validating the invariants above and
    /// deriving per-chunk offsets.
    pub fn build(timeline: &[SequenceDescription]) -> Result<Self, RandomizerError> {
        let last = timeline.last().ok_or_else(|| {
            RandomizerError::InvalidTimeline("timeline contains no sequences".to_string())
        })?;

        let mut previous: Option<SequenceDescription> = None;
        for current in timeline {
            let adjacent = match previous {
                None => current.id == 0 && current.chunk_id == 0,
                Some(previous) => {
                    current.id == previous.id + 1
                        && (current.chunk_id == previous.chunk_id
                            || current.chunk_id == previous.chunk_id + 1)
                }
            };
            if !adjacent || current.num_samples == 0 {
                return Err(RandomizerError::InvalidTimeline(format!(
                    "sequence {} (chunk {}, {} samples) breaks timeline ordering",
                    current.id, current.chunk_id, current.num_samples
                )));
            }
            previous = Some(*current);
        }

        let num_sequences = last.id + 1;
        let num_chunks = last.chunk_id + 1;

        let mut chunks = vec![
            ChunkInformation {
                sequence_position_start: usize::MAX,
                sample_position_start: usize::MAX,
            };
            num_chunks + 1
        ];

        let mut num_samples = 0;
        let mut max_samples_per_sequence = 0;
        for description in timeline {
            let chunk = &mut chunks[description.chunk_id];
            chunk.sequence_position_start = chunk.sequence_position_start.min(description.id);
            chunk.sample_position_start = chunk.sample_position_start.min(num_samples);
            max_samples_per_sequence = max_samples_per_sequence.max(description.num_samples);
            num_samples += description.num_samples;
        }
        chunks[num_chunks] = ChunkInformation {
            sequence_position_start: num_sequences,
            sample_position_start: num_samples,
        };

        Ok(Self {
            num_sequences,
            num_chunks,
            num_samples,
            frame_mode: max_samples_per_sequence == 1,
            chunks,
        })
    }

    /// Start offsets of chunk `index`; `index == num_chunks` is the sentinel.
    pub fn chunk(&self, index: usize) -> ChunkInformation {
        self.chunks[index]
    }

    /// Original sequence positions belonging to chunk `index`.
    pub fn sequence_range(&self, index: usize) -> std::ops::Range<usize> {
        self.chunks[index].sequence_position_start..self.chunks[index + 1].sequence_position_start
    }

    pub fn num_sequences_in_chunk(&self, index: usize) -> usize {
        self.chunks[index + 1].sequence_position_start - self.chunks[index].sequence_position_start
    }

    pub fn num_samples_in_chunk(&self, index: usize) -> usize {
        self.chunks[index + 1].sample_position_start - self.chunks[index].sample_position_start
    }
}
