//! Per-sweep chunk randomization: shuffles chunk order, accumulates the
//! shuffled sequence/sample offsets, and computes each chunk's
//! randomization window over the shuffled order.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::errors::RandomizerError;
use crate::timeline::{SequenceDescription, TimelineIndex};

/// One chunk at its position in the shuffled order.
///
/// `window_begin..window_end` is the interval of shuffled chunk positions
/// whose sequences may trade places with this chunk's. Both bounds are
/// monotonic non-decreasing over positions, and every chunk lies inside
/// its own window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomizedChunk {
    /// Index of this chunk in the original chunk order; the sentinel entry
    /// carries `usize::MAX`.
    pub original_chunk_index: usize,
    pub sequence_position_start: usize,
    pub sample_position_start: usize,
    pub window_begin: usize,
    pub window_end: usize,
}

/// The chunk-level randomization of one sweep.
#[derive(Debug, Clone)]
pub struct ChunkRandomization {
    chunks: Vec<RandomizedChunk>,
    sequence_position_to_chunk: Vec<usize>,
}

impl ChunkRandomization {
    /// Shuffles chunks with a generator seeded by the sweep index and
    /// computes randomization windows of `randomization_range_in_samples`
    /// (half to each side).
    pub fn randomize(
        index: &TimelineIndex,
        sweep: u64,
        sweep_start_in_samples: usize,
        randomization_range_in_samples: usize,
    ) -> Result<Self, RandomizerError> {
        let mut order: Vec<usize> = (0..index.num_chunks).collect();
        let mut rng = StdRng::seed_from_u64(sweep);
        order.shuffle(&mut rng);

        // Place the shuffled chunks on the global sample timeline.
        let mut chunks = Vec::with_capacity(index.num_chunks + 1);
        let mut sequence_position = 0;
        let mut sample_position = sweep_start_in_samples;
        for &original_chunk_index in &order {
            chunks.push(RandomizedChunk {
                original_chunk_index,
                sequence_position_start: sequence_position,
                sample_position_start: sample_position,
                window_begin: 0,
                window_end: 0,
            });
            sequence_position += index.num_sequences_in_chunk(original_chunk_index);
            sample_position += index.num_samples_in_chunk(original_chunk_index);
        }
        chunks.push(RandomizedChunk {
            original_chunk_index: usize::MAX,
            sequence_position_start: sequence_position,
            sample_position_start: sample_position,
            window_begin: 0,
            window_end: 0,
        });

        // Each window starts from its left neighbor's and only ever grows
        // to the right, so the whole sweep is amortized linear. The lower
        // clamp to k + 1 keeps the chunk inside its own window even when a
        // single chunk outweighs the half range.
        let half_window = randomization_range_in_samples / 2;
        for k in 0..index.num_chunks {
            let (mut begin, mut end) = if k == 0 {
                (0, 1)
            } else {
                (chunks[k - 1].window_begin, chunks[k - 1].window_end.max(k + 1))
            };
            while chunks[k].sample_position_start - chunks[begin].sample_position_start
                > half_window
            {
                begin += 1;
            }
            while end < index.num_chunks
                && chunks[end + 1].sample_position_start - chunks[k].sample_position_start
                    < half_window
            {
                end += 1;
            }
            if begin > k || end <= k {
                return Err(RandomizerError::InvalidChunkBounds {
                    chunk: k,
                    window_begin: begin,
                    window_end: end,
                });
            }
            chunks[k].window_begin = begin;
            chunks[k].window_end = end;
        }

        // Run-length expansion: randomized sequence position -> chunk position.
        let mut sequence_position_to_chunk = Vec::with_capacity(index.num_sequences);
        for k in 0..index.num_chunks {
            let count = chunks[k + 1].sequence_position_start - chunks[k].sequence_position_start;
            sequence_position_to_chunk.extend(std::iter::repeat(k).take(count));
        }
        debug_assert_eq!(sequence_position_to_chunk.len(), index.num_sequences);

        Ok(Self {
            chunks,
            sequence_position_to_chunk,
        })
    }

    /// Chunk at shuffled position `k`; `k == num_chunks` is the sentinel.
    pub fn chunk(&self, k: usize) -> &RandomizedChunk {
        &self.chunks[k]
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len() - 1
    }

    /// Shuffled chunk position containing randomized sequence `position`.
    pub fn chunk_for_sequence_position(&self, position: usize) -> usize {
        self.sequence_position_to_chunk[position]
    }

    /// Original chunk indices in shuffled order (sentinel excluded).
    pub fn original_order(&self) -> impl Iterator<Item = usize> + '_ {
        self.chunks[..self.num_chunks()]
            .iter()
            .map(|chunk| chunk.original_chunk_index)
    }

    /// Whether `description` may sit at randomized `position`, i.e. its
    /// rewritten chunk id lies inside the window of the chunk that owns
    /// the position.
    pub fn is_valid_for_position(&self, position: usize, description: &SequenceDescription) -> bool {
        let chunk = &self.chunks[self.sequence_position_to_chunk[position]];
        chunk.window_begin <= description.chunk_id && description.chunk_id < chunk.window_end
    }
}
