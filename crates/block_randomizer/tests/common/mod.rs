//! Shared test fixtures: an in-memory deserializer with deterministic
//! per-sequence payloads that records every chunk residency hint.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use block_randomizer::{
    BlockRandomizer, Deserializer, ElementType, EpochConfiguration, RandomizerConfig,
    RandomizerError, SampleData, SequenceDescription, SequenceProvider, StorageKind,
    StreamDescription,
};

pub const SAMPLE_ELEMENTS: usize = 4;

/// One residency hint observed by the deserializer, carrying the original
/// chunk index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkHint {
    Require(usize),
    Release(usize),
}

impl ChunkHint {
    pub fn chunk(self) -> usize {
        match self {
            ChunkHint::Require(chunk) | ChunkHint::Release(chunk) => chunk,
        }
    }
}

/// In-memory deserializer over a frame-mode timeline. `fetch` fabricates
/// payloads from the sequence id alone, so any two instances over the same
/// timeline agree byte for byte.
pub struct RecordingDeserializer {
    streams: Vec<StreamDescription>,
    timeline: Vec<SequenceDescription>,
    hints: Arc<Mutex<Vec<ChunkHint>>>,
}

impl RecordingDeserializer {
    pub fn frame_mode(num_chunks: usize, sequences_per_chunk: usize) -> Self {
        let timeline = (0..num_chunks * sequences_per_chunk)
            .map(|id| SequenceDescription {
                id,
                chunk_id: id / sequences_per_chunk,
                num_samples: 1,
            })
            .collect();
        Self {
            streams: vec![StreamDescription::new(
                "features",
                SAMPLE_ELEMENTS,
                ElementType::Float32,
                StorageKind::Dense,
            )],
            timeline,
            hints: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_streams(mut self, streams: Vec<StreamDescription>) -> Self {
        self.streams = streams;
        self
    }

    pub fn with_timeline(mut self, timeline: Vec<SequenceDescription>) -> Self {
        self.timeline = timeline;
        self
    }

    /// Handle onto the hint log; clone it before boxing the deserializer.
    pub fn hints(&self) -> Arc<Mutex<Vec<ChunkHint>>> {
        Arc::clone(&self.hints)
    }
}

impl Deserializer for RecordingDeserializer {
    fn stream_descriptions(&self) -> &[StreamDescription] {
        &self.streams
    }

    fn sequence_descriptions(&self) -> &[SequenceDescription] {
        &self.timeline
    }

    fn start_epoch(&mut self, _config: &EpochConfiguration) {}

    fn require_chunk(&mut self, original_chunk_index: usize) {
        self.hints
            .lock()
            .unwrap()
            .push(ChunkHint::Require(original_chunk_index));
    }

    fn release_chunk(&mut self, original_chunk_index: usize) {
        self.hints
            .lock()
            .unwrap()
            .push(ChunkHint::Release(original_chunk_index));
    }

    fn fetch(&mut self, ids: &[usize]) -> Result<Vec<Vec<SampleData>>, RandomizerError> {
        Ok(ids
            .iter()
            .map(|&id| {
                self.streams
                    .iter()
                    .map(|stream| match stream.storage {
                        StorageKind::Dense => SampleData::Dense {
                            bytes: sample_bytes(id),
                            num_samples: 1,
                        },
                        StorageKind::SparseCsc => SampleData::SparseCsc {
                            bytes: bytemuck::cast_slice(&[id as f32][..]).to_vec(),
                            indices: vec![vec![id % stream.sample_elements]],
                        },
                    })
                    .collect()
            })
            .collect())
    }
}

/// The dense payload `fetch` fabricates for sequence `id`.
pub fn sample_values(id: usize) -> [f32; SAMPLE_ELEMENTS] {
    let base = id as f32;
    [base, base + 0.25, base + 0.5, base + 0.75]
}

pub fn sample_bytes(id: usize) -> Vec<u8> {
    bytemuck::cast_slice(&sample_values(id)[..]).to_vec()
}

/// A randomizer over a fresh frame-mode deserializer, plus the handle onto
/// its hint log.
pub fn frame_randomizer(
    num_chunks: usize,
    sequences_per_chunk: usize,
    randomization_range_in_samples: usize,
) -> Result<(BlockRandomizer, Arc<Mutex<Vec<ChunkHint>>>)> {
    let deserializer = RecordingDeserializer::frame_mode(num_chunks, sequences_per_chunk);
    let hints = deserializer.hints();
    let randomizer = BlockRandomizer::new(
        RandomizerConfig::builder()
            .randomization_range_in_samples(randomization_range_in_samples)
            .build(),
        Box::new(deserializer),
    )?;
    Ok((randomizer, hints))
}

/// Pulls batches of `batch_size` until end of epoch, returning the yielded
/// original ids in order.
pub fn drain_ids(randomizer: &mut BlockRandomizer, batch_size: usize) -> Result<Vec<usize>> {
    let mut ids = Vec::new();
    loop {
        let sequences = randomizer.next_sequences(batch_size)?;
        ids.extend_from_slice(&sequences.ids);
        if sequences.end_of_epoch {
            break;
        }
    }
    Ok(ids)
}
