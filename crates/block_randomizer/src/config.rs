//! Configuration for the block randomizer and for individual epochs.
//!
//! Example:
//! ```ignore
//! let config = RandomizerConfig::builder()
//!     .randomization_range_in_samples(30_000)
//!     .verbosity(1)
//!     .build();
//! ```

/// Configuration of a `BlockRandomizer` instance.
///
/// `randomization_range_in_samples` bounds how far a sample may move from
/// its chunk-shuffled position; half of it extends to each side. It should
/// be at least the largest chunk's sample count, otherwise windows shrink
/// to a single chunk and shuffling quality degrades (the randomizer still
/// accepts such ranges).
#[derive(Debug, Clone)]
pub struct RandomizerConfig {
    pub randomization_range_in_samples: usize,
    /// Emits a log event on every sweep re-randomization when > 0.
    pub verbosity: u32,
}

impl Default for RandomizerConfig {
    fn default() -> Self {
        Self {
            // Wide enough that every chunk's window spans the whole sweep.
            randomization_range_in_samples: usize::MAX / 2,
            verbosity: 0,
        }
    }
}

impl RandomizerConfig {
    pub fn builder() -> RandomizerConfigBuilder {
        RandomizerConfigBuilder::default()
    }
}

/// Builder for RandomizerConfig with method chaining.
#[derive(Default)]
pub struct RandomizerConfigBuilder {
    config: RandomizerConfig,
}

impl RandomizerConfigBuilder {
    /// Set the randomization range in samples.
    pub fn randomization_range_in_samples(mut self, range: usize) -> Self {
        self.config.randomization_range_in_samples = range;
        self
    }

    /// Set the verbosity level.
    pub fn verbosity(mut self, verbosity: u32) -> Self {
        self.config.verbosity = verbosity;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> RandomizerConfig {
        self.config
    }
}

/// Per-epoch configuration handed to `BlockRandomizer::start_epoch` and
/// forwarded to the deserializer.
///
/// - `index`: zero-based epoch number; positions the cursor at
///   `index * total_size` samples into the global schedule.
/// - `total_size`: samples per epoch; `None` means one full sweep.
/// - `minibatch_size`: samples per minibatch, used by downstream stages.
/// - `worker_rank` / `num_workers`: this worker's slot in a data-parallel
///   run. Must satisfy `worker_rank < num_workers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochConfiguration {
    pub index: usize,
    pub total_size: Option<usize>,
    pub minibatch_size: usize,
    pub worker_rank: usize,
    pub num_workers: usize,
}

impl Default for EpochConfiguration {
    fn default() -> Self {
        Self {
            index: 0,
            total_size: None,
            minibatch_size: 1,
            worker_rank: 0,
            num_workers: 1,
        }
    }
}
