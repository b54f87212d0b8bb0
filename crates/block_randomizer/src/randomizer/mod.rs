//! The block randomizer: a deterministic, windowed shuffle over a chunked
//! timeline, driven one epoch at a time.
//!
//! Each sweep (full pass) gets its own chunk permutation and windowed
//! sequence permutation, derived from a generator seeded by the sweep
//! index alone. Restarting at any epoch therefore reproduces the exact
//! schedule, and data-parallel workers that see the same timeline agree on
//! it without coordination.

pub mod chunks;
pub mod sequence;

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::config::{EpochConfiguration, RandomizerConfig};
use crate::deserializer::{Deserializer, SequenceProvider, Sequences};
use crate::errors::RandomizerError;
use crate::sample::StreamDescription;
use crate::timeline::{SequenceDescription, TimelineIndex};

use chunks::ChunkRandomization;
use sequence::randomize_sequences;

/// Randomization state of the current sweep, replaced wholesale whenever a
/// new sweep is entered.
struct SweepRandomization {
    chunks: ChunkRandomization,
    timeline: Vec<SequenceDescription>,
}

/// Produces a reproducible pseudo-random order over a chunked corpus while
/// keeping chunk residency inside a bounded window.
///
/// The randomizer owns the epoch cursor: construct it once per worker,
/// call [`start_epoch`](Self::start_epoch), then pull batches through
/// [`SequenceProvider::next_sequences`]. Between batches it drives
/// `require_chunk`/`release_chunk` on the deserializer so that only the
/// active window is resident.
pub struct BlockRandomizer {
    config: RandomizerConfig,
    deserializer: Box<dyn Deserializer>,
    index: TimelineIndex,
    original_timeline: Vec<SequenceDescription>,
    randomization: Option<SweepRandomization>,
    sweep: Option<u64>,
    sweep_start_in_samples: usize,
    sequence_position_in_sweep: usize,
    sample_position_in_epoch: usize,
    epoch_size: usize,
    worker_rank: usize,
    num_workers: usize,
}

impl BlockRandomizer {
    /// Indexes the deserializer's timeline and prepares an idle randomizer.
    ///
    /// Fails with `InvalidTimeline` when the timeline breaks the ordering
    /// invariants (dense ids, chunk ids advancing by at most one, at least
    /// one sample per sequence).
    pub fn new(
        config: RandomizerConfig,
        deserializer: Box<dyn Deserializer>,
    ) -> Result<Self, RandomizerError> {
        let original_timeline = deserializer.sequence_descriptions().to_vec();
        let index = TimelineIndex::build(&original_timeline)?;
        debug!(
            num_sequences = index.num_sequences,
            num_chunks = index.num_chunks,
            num_samples = index.num_samples,
            frame_mode = index.frame_mode,
            "indexed timeline"
        );

        Ok(Self {
            config,
            deserializer,
            index,
            original_timeline,
            randomization: None,
            sweep: None,
            sweep_start_in_samples: 0,
            sequence_position_in_sweep: 0,
            sample_position_in_epoch: 0,
            epoch_size: 0,
            worker_rank: 0,
            num_workers: 1,
        })
    }

    /// Positions the cursor at `config.index * epoch_size` samples into the
    /// global schedule and randomizes the sweep containing that offset.
    ///
    /// `total_size: None` means one full sweep. Restarting with an equal
    /// configuration reproduces the epoch exactly.
    pub fn start_epoch(&mut self, config: &EpochConfiguration) -> Result<(), RandomizerError> {
        if config.num_workers == 0 || config.worker_rank >= config.num_workers {
            return Err(RandomizerError::InvalidEpochConfiguration(format!(
                "worker rank {} is not valid for {} workers",
                config.worker_rank, config.num_workers
            )));
        }
        self.deserializer.start_epoch(config);

        self.worker_rank = config.worker_rank;
        self.num_workers = config.num_workers;
        self.epoch_size = config.total_size.unwrap_or(self.index.num_samples);
        self.sample_position_in_epoch = 0;

        let global_sample_position = self.epoch_size * config.index;
        debug!(
            epoch = config.index,
            epoch_size = self.epoch_size,
            worker_rank = self.worker_rank,
            num_workers = self.num_workers,
            global_sample_position,
            "starting epoch"
        );
        self.randomize_for_global_sample_position(global_sample_position)
    }

    pub fn num_sequences(&self) -> usize {
        self.index.num_sequences
    }

    pub fn num_chunks(&self) -> usize {
        self.index.num_chunks
    }

    pub fn num_samples(&self) -> usize {
        self.index.num_samples
    }

    /// True when every sequence of the timeline holds exactly one sample.
    pub fn frame_mode(&self) -> bool {
        self.index.frame_mode
    }

    fn randomize_for_global_sample_position(
        &mut self,
        global_sample_position: usize,
    ) -> Result<(), RandomizerError> {
        let sweep = (global_sample_position / self.index.num_samples) as u64;
        if self.sweep != Some(sweep) {
            self.sweep = Some(sweep);
            self.sweep_start_in_samples = sweep as usize * self.index.num_samples;
            self.randomize(sweep)?;
        }
        self.sequence_position_in_sweep = global_sample_position % self.index.num_samples;
        Ok(())
    }

    fn randomize(&mut self, sweep: u64) -> Result<(), RandomizerError> {
        let chunks = ChunkRandomization::randomize(
            &self.index,
            sweep,
            self.sweep_start_in_samples,
            self.config.randomization_range_in_samples,
        )?;
        let timeline = randomize_sequences(&self.original_timeline, &self.index, &chunks, sweep)?;
        self.randomization = Some(SweepRandomization { chunks, timeline });
        Ok(())
    }

    fn randomize_if_new_sweep_is_entered(&mut self) -> Result<(), RandomizerError> {
        if self.sequence_position_in_sweep >= self.index.num_sequences {
            let sweep = self.sweep.map_or(0, |sweep| sweep + 1);
            if self.config.verbosity > 0 {
                let mode = if self.index.frame_mode { "frame" } else { "sequence" };
                info!(sweep, mode, "re-randomizing for new sweep");
            }
            self.sweep = Some(sweep);
            self.sweep_start_in_samples += self.index.num_samples;
            self.randomize(sweep)?;
            self.sequence_position_in_sweep = 0;
        }
        Ok(())
    }

    fn current_description(&self) -> Result<SequenceDescription, RandomizerError> {
        let randomization = self
            .randomization
            .as_ref()
            .ok_or(RandomizerError::EpochUnderflow)?;
        Ok(randomization.timeline[self.sequence_position_in_sweep])
    }

    /// Skips positions owned by other workers, charging their samples to
    /// the epoch without yielding them. Returns true at end of epoch.
    fn advance_to_next_position_for_this_worker(&mut self) -> Result<bool, RandomizerError> {
        while self.sample_position_in_epoch < self.epoch_size {
            self.randomize_if_new_sweep_is_entered()?;

            let description = self.current_description()?;
            if description.chunk_id % self.num_workers == self.worker_rank {
                break;
            }

            self.sample_position_in_epoch += description.num_samples;
            self.sequence_position_in_sweep += 1;
        }
        Ok(self.epoch_size <= self.sample_position_in_epoch)
    }

    /// Folds the window of `position`'s chunk, under the current sweep's
    /// randomization, into the set of original chunks the batch keeps
    /// resident. Windows must be resolved while the sweep that owns the
    /// position is still current; a later rollover replaces the chunk
    /// order, and the position would map to an unrelated chunk. The
    /// windows of consecutive positions overlap heavily, so a chunk
    /// already folded for this sweep is skipped.
    fn fold_window_for_position(
        &self,
        position: usize,
        required: &mut BTreeSet<usize>,
        folded: &mut Option<(Option<u64>, usize)>,
    ) -> Result<(), RandomizerError> {
        let randomization = self
            .randomization
            .as_ref()
            .ok_or(RandomizerError::EpochUnderflow)?;
        let chunks = &randomization.chunks;
        let k = chunks.chunk_for_sequence_position(position);
        if *folded == Some((self.sweep, k)) {
            return Ok(());
        }

        let chunk = chunks.chunk(k);
        for window_position in chunk.window_begin..chunk.window_end {
            required.insert(chunks.chunk(window_position).original_chunk_index);
        }
        *folded = Some((self.sweep, k));
        Ok(())
    }

    /// Requires every chunk the batch's windows touch and releases the
    /// rest. The deserializer sees exactly one call per chunk per batch.
    fn update_chunk_residency(&mut self, required: &BTreeSet<usize>) {
        for original_chunk_index in 0..self.index.num_chunks {
            if required.contains(&original_chunk_index) {
                self.deserializer.require_chunk(original_chunk_index);
            } else {
                self.deserializer.release_chunk(original_chunk_index);
            }
        }
    }
}

impl SequenceProvider for BlockRandomizer {
    fn streams(&self) -> &[StreamDescription] {
        self.deserializer.stream_descriptions()
    }

    fn start_epoch(&mut self, config: &EpochConfiguration) -> Result<(), RandomizerError> {
        BlockRandomizer::start_epoch(self, config)
    }

    /// Collects up to `count` positions owned by this worker, updates
    /// chunk residency for the batch, and fetches the sample data. Both
    /// the original id and the chunk window of a position are resolved at
    /// the moment it is accepted: a sweep rollover inside the batch
    /// replaces the randomization, and stale positions resolved against it
    /// afterwards would name the wrong sequences and the wrong chunks.
    fn next_sequences(&mut self, count: usize) -> Result<Sequences, RandomizerError> {
        if self.randomization.is_none() {
            return Err(RandomizerError::EpochUnderflow);
        }

        let mut ids = Vec::with_capacity(count);
        let mut required = BTreeSet::new();
        let mut folded = None;
        let mut end_of_epoch = false;
        while ids.len() < count {
            end_of_epoch = self.advance_to_next_position_for_this_worker()?;
            if end_of_epoch {
                break;
            }

            debug_assert!(self.sequence_position_in_sweep < self.index.num_sequences);
            let description = self.current_description()?;
            self.fold_window_for_position(
                self.sequence_position_in_sweep,
                &mut required,
                &mut folded,
            )?;
            ids.push(description.id);
            self.sample_position_in_epoch += description.num_samples;
            self.sequence_position_in_sweep += 1;
        }

        if ids.is_empty() {
            return Ok(Sequences {
                end_of_epoch,
                ids,
                data: Vec::new(),
            });
        }

        self.update_chunk_residency(&required);

        let data = self.deserializer.fetch(&ids)?;
        Ok(Sequences {
            end_of_epoch,
            ids,
            data,
        })
    }
}
