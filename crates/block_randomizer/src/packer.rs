//! Assembles yielded sample vectors into contiguous fixed-size minibatches.
//!
//! One dense buffer per stream is allocated up front and reused for every
//! batch; the returned [`Minibatch`] borrows those buffers, so a batch must
//! be consumed before the next `read_minibatch` call.

use crate::config::EpochConfiguration;
use crate::deserializer::SequenceProvider;
use crate::errors::RandomizerError;
use crate::sample::{ElementType, SampleData, StorageKind, StreamDescription};

/// Shape of one packed minibatch: `num_parallel` independent sequences of
/// `num_time_steps` samples each. The frame-mode packer always emits a
/// single time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinibatchLayout {
    pub num_parallel: usize,
    pub num_time_steps: usize,
}

/// One stream of a packed minibatch, borrowed from the packer's buffer.
#[derive(Debug)]
pub struct StreamMinibatch<'a> {
    pub data: &'a [u8],
    pub layout: MinibatchLayout,
}

impl StreamMinibatch<'_> {
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }
}

/// A packed minibatch. `streams` is empty for the terminal empty batch,
/// which is a legal way for an epoch to end.
#[derive(Debug)]
pub struct Minibatch<'a> {
    pub at_end_of_epoch: bool,
    pub streams: Vec<StreamMinibatch<'a>>,
}

/// Byte buffer backed by `u64` words, which keeps it aligned for the
/// widest supported element type and the pointer size.
struct AlignedBuffer {
    words: Vec<u64>,
    len: usize,
}

impl AlignedBuffer {
    fn new(len: usize) -> Self {
        Self {
            words: vec![0u64; len.div_ceil(std::mem::size_of::<u64>())],
            len,
        }
    }

    fn as_slice(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.words)[..self.len]
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.words)[..self.len]
    }
}

/// Packs single-sample sequences into dense per-stream minibatch buffers.
///
/// Dense records are copied as-is; one-frame sparse-CSC records are
/// scattered into a zero-filled slot. Supported element types are
/// `Float32` and `Float64`; anything else is rejected at construction.
pub struct FrameModePacker {
    provider: Box<dyn SequenceProvider>,
    streams: Vec<StreamDescription>,
    buffers: Vec<AlignedBuffer>,
    minibatch_size: usize,
}

impl FrameModePacker {
    pub fn new(
        provider: Box<dyn SequenceProvider>,
        minibatch_size: usize,
    ) -> Result<Self, RandomizerError> {
        debug_assert!(minibatch_size > 0);

        let streams = provider.streams().to_vec();
        for stream in &streams {
            match stream.element_type {
                ElementType::Float32 | ElementType::Float64 => {}
                other => {
                    return Err(RandomizerError::UnsupportedElementType {
                        stream: stream.name.clone(),
                        element_type: other,
                    })
                }
            }
        }

        let buffers = streams
            .iter()
            .map(|stream| AlignedBuffer::new(minibatch_size * stream.sample_size_in_bytes()))
            .collect();

        Ok(Self {
            provider,
            streams,
            buffers,
            minibatch_size,
        })
    }

    /// Arms the underlying provider chain for an epoch.
    pub fn start_epoch(&mut self, config: &EpochConfiguration) -> Result<(), RandomizerError> {
        self.provider.start_epoch(config)
    }

    /// Pulls up to `minibatch_size` sequences from the provider and packs
    /// them. Stream `j` of the result holds the fetched frames of the
    /// batch concatenated in yielded order, `sample_size_in_bytes` apiece.
    pub fn read_minibatch(&mut self) -> Result<Minibatch<'_>, RandomizerError> {
        let sequences = self.provider.next_sequences(self.minibatch_size)?;
        let num_records = sequences.data.len();

        for (i, record) in sequences.data.iter().enumerate() {
            debug_assert_eq!(record.len(), self.streams.len());
            for (j, stream) in self.streams.iter().enumerate() {
                let sample_size = stream.sample_size_in_bytes();
                let element_size = stream.element_type.size_in_bytes();
                let slot =
                    &mut self.buffers[j].as_mut_slice()[i * sample_size..(i + 1) * sample_size];

                match (&record[j], stream.storage) {
                    (SampleData::Dense { bytes, num_samples }, StorageKind::Dense) => {
                        debug_assert_eq!(*num_samples, 1);
                        slot.copy_from_slice(&bytes[..sample_size]);
                    }
                    (SampleData::SparseCsc { bytes, indices }, StorageKind::SparseCsc) => {
                        debug_assert_eq!(indices.len(), 1);
                        slot.fill(0);
                        for (n, &row) in indices[0].iter().enumerate() {
                            let source = &bytes[n * element_size..(n + 1) * element_size];
                            slot[row * element_size..(row + 1) * element_size]
                                .copy_from_slice(source);
                        }
                    }
                    _ => {
                        return Err(RandomizerError::UnsupportedStorage {
                            stream: stream.name.clone(),
                        })
                    }
                }
            }
        }

        if num_records == 0 {
            return Ok(Minibatch {
                at_end_of_epoch: sequences.end_of_epoch,
                streams: Vec::new(),
            });
        }

        let layout = MinibatchLayout {
            num_parallel: num_records,
            num_time_steps: 1,
        };
        let streams = self
            .buffers
            .iter()
            .zip(&self.streams)
            .map(|(buffer, stream)| StreamMinibatch {
                data: &buffer.as_slice()[..num_records * stream.sample_size_in_bytes()],
                layout,
            })
            .collect();

        Ok(Minibatch {
            at_end_of_epoch: sequences.end_of_epoch,
            streams,
        })
    }
}
