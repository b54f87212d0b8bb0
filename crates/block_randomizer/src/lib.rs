pub mod config;
pub mod deserializer;
pub mod errors;
pub mod packer;
pub mod randomizer;
pub mod sample;
pub mod timeline;

pub use config::{EpochConfiguration, RandomizerConfig};
pub use deserializer::{Deserializer, SequenceProvider, Sequences};
pub use errors::RandomizerError;
pub use packer::{FrameModePacker, Minibatch, MinibatchLayout};
pub use randomizer::BlockRandomizer;
pub use sample::{ElementType, SampleData, StorageKind, StreamDescription};
pub use timeline::SequenceDescription;
