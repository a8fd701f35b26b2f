pub mod decoder;
pub mod ingest;

pub use decoder::{AudioDecoder, SymphoniaDecoder, WaveformBuffer};
pub use ingest::{supported_extension, AudioIngest, StagedAudioFile, SUPPORTED_FORMATS};
