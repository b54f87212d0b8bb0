use thiserror::Error;

use crate::sample::ElementType;

/// Error type for timeline indexing, randomization, and packing failures.
///
/// End of epoch is not an error; it is reported through the
/// `at_end_of_epoch` flag on the yielded batch.
#[derive(Debug, Error)]
pub enum RandomizerError {
    #[error("invalid timeline: {0}")]
    InvalidTimeline(String),
    #[error(
        "chunk {chunk} fell outside its own randomization window [{window_begin}, {window_end})"
    )]
    InvalidChunkBounds {
        chunk: usize,
        window_begin: usize,
        window_end: usize,
    },
    #[error("windowed shuffle left a sequence outside its window at position {position}")]
    LogicMangledPermutation { position: usize },
    #[error("sample record does not match the declared storage of stream '{stream}'")]
    UnsupportedStorage { stream: String },
    #[error("element type {element_type:?} is not supported for stream '{stream}'")]
    UnsupportedElementType {
        stream: String,
        element_type: ElementType,
    },
    #[error("invalid epoch configuration: {0}")]
    InvalidEpochConfiguration(String),
    #[error("sequences requested before start_epoch")]
    EpochUnderflow,
}
