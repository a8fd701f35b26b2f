//! Voice activity detection: scorer lifecycle, segment extraction and
//! summary statistics.

pub mod energy;
pub mod factory;
pub mod interface;
pub mod loader;
pub mod segments;
pub mod statistics;

#[cfg(feature = "onnx")]
pub mod silero;

pub use energy::{EnergyScorer, EnergyScorerProvider};
pub use factory::ScorerFactory;
pub use interface::{FrameScore, ScoreTrack, ScorerProvider, SpeechScorer};
pub use loader::{ModelLoader, ModelState};
pub use segments::{extract_segments, DetectionConfig, SegmentExtractor, SpeechSegment};
pub use statistics::{aggregate, Statistics};

/// Everything a successful detection produces
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub segments: Vec<SpeechSegment>,
    pub statistics: Statistics,
}
