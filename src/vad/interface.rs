/// Speech scorer interface - the acoustic model sits behind these traits

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Speech probability reported by a scorer for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameScore {
    /// Frame start, in seconds from the beginning of the clip
    pub time: f64,
    pub probability: f32,
}

/// Scorer output for a whole clip. Frames are ordered by non-decreasing time
/// and spaced `hop_secs` apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTrack {
    pub hop_secs: f64,
    pub frames: Vec<FrameScore>,
}

impl ScoreTrack {
    pub fn new(hop_secs: f64, frames: Vec<FrameScore>) -> Self {
        Self { hop_secs, frames }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// A loaded acoustic model. Scoring is blocking and must be called from a
/// worker thread, never directly on the async runtime.
pub trait SpeechScorer: Send + Sync {
    fn name(&self) -> &str;

    /// Score a mono waveform. Identical input must yield identical output.
    fn score(&self, samples: &[f32], sample_rate: u32) -> Result<ScoreTrack, anyhow::Error>;
}

/// Knows how to acquire a scorer. Loading may be slow and may fail; the
/// model loader decides when and how often it is attempted.
#[async_trait]
pub trait ScorerProvider: Send + Sync {
    /// Human-readable model name reported by `/info`
    fn model_name(&self) -> &str;

    fn description(&self) -> &str;

    /// Sample rates the model natively operates on
    fn supported_sample_rates(&self) -> Vec<u32>;

    async fn load(&self) -> Result<Arc<dyn SpeechScorer>, anyhow::Error>;
}
