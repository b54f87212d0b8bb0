//! Interfaces to the external collaborators: the deserializer that owns the
//! timeline and performs chunk I/O, and the pull-based provider seam through
//! which the packer (or a chain of transform stages) consumes sequences.

use crate::config::EpochConfiguration;
use crate::errors::RandomizerError;
use crate::sample::{SampleData, StreamDescription};
use crate::timeline::SequenceDescription;

/// A batch of sequences yielded by a [`SequenceProvider`].
///
/// `ids[i]` is the original timeline id whose per-stream payloads sit in
/// `data[i]`. `end_of_epoch` is a benign signal; an empty terminal batch
/// with the flag set is legal.
#[derive(Debug, Default)]
pub struct Sequences {
    pub end_of_epoch: bool,
    pub ids: Vec<usize>,
    pub data: Vec<Vec<SampleData>>,
}

/// The data source the randomizer drives.
///
/// The randomizer never performs I/O itself: it hints residency through
/// `require_chunk`/`release_chunk` between batches and pulls sample bytes
/// with `fetch`. Both residency calls must be idempotent, and
/// `release_chunk` must tolerate chunks that were never made resident.
/// Only `fetch` may block.
pub trait Deserializer: Send {
    /// The streams each fetched sequence carries, in record order.
    fn stream_descriptions(&self) -> &[StreamDescription];

    /// The immutable timeline of sequence descriptions.
    fn sequence_descriptions(&self) -> &[SequenceDescription];

    /// Arms the source for the upcoming pass.
    fn start_epoch(&mut self, config: &EpochConfiguration);

    /// Hint that `original_chunk_index` will be read soon.
    fn require_chunk(&mut self, original_chunk_index: usize);

    /// Hint that `original_chunk_index` left the active window.
    fn release_chunk(&mut self, original_chunk_index: usize);

    /// Returns per-sequence, per-stream sample data for `ids`.
    fn fetch(&mut self, ids: &[usize]) -> Result<Vec<Vec<SampleData>>, RandomizerError>;
}

/// Head of the pull chain feeding the packer.
///
/// The randomizer implements this directly; transform stages that decorate
/// samples wrap another provider and must preserve the order of each batch
/// they pass through.
pub trait SequenceProvider: Send {
    fn streams(&self) -> &[StreamDescription];

    /// Arms the chain for the upcoming epoch. Stages forward the call to
    /// the provider they wrap.
    fn start_epoch(&mut self, config: &EpochConfiguration) -> Result<(), RandomizerError>;

    /// Yields up to `count` sequences, advancing the epoch cursor.
    fn next_sequences(&mut self, count: usize) -> Result<Sequences, RandomizerError>;
}
