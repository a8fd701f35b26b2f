use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for the RMS energy scorer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyScorerConfig {
    /// Frame length and hop, in milliseconds
    #[serde(rename = "frame_ms")]
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u32,

    /// Frame level (dBFS) that maps to a speech probability of 0.5
    #[serde(rename = "center_db")]
    #[serde(default = "default_center_db")]
    pub center_db: f32,

    /// Steepness of the dB → probability curve
    #[serde(rename = "width_db")]
    #[serde(default = "default_width_db")]
    pub width_db: f32,
}

fn default_frame_ms() -> u32 {
    20
}

fn default_center_db() -> f32 {
    -35.0
}

fn default_width_db() -> f32 {
    4.0
}

impl Default for EnergyScorerConfig {
    fn default() -> Self {
        Self {
            frame_ms: default_frame_ms(),
            center_db: default_center_db(),
            width_db: default_width_db(),
        }
    }
}

/// Settings for the Silero ONNX scorer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SileroScorerConfig {
    #[serde(rename = "model_path")]
    #[serde(default = "default_silero_model_path")]
    pub model_path: PathBuf,
}

fn default_silero_model_path() -> PathBuf {
    PathBuf::from("models/silero_vad.onnx")
}

impl Default for SileroScorerConfig {
    fn default() -> Self {
        Self {
            model_path: default_silero_model_path(),
        }
    }
}

/// Which acoustic scorer backs the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(rename = "backend")]
    #[serde(default = "default_backend")]
    pub backend: String, // "energy" | "silero"

    #[serde(default)]
    pub energy: EnergyScorerConfig,

    #[serde(default)]
    pub silero: SileroScorerConfig,
}

fn default_backend() -> String {
    "energy".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            energy: EnergyScorerConfig::default(),
            silero: SileroScorerConfig::default(),
        }
    }
}

/// Values used for `/detect` query parameters the caller leaves out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionDefaults {
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    #[serde(default = "default_min_speech_duration_ms")]
    pub min_speech_duration_ms: u32,

    #[serde(default = "default_min_silence_duration_ms")]
    pub min_silence_duration_ms: u32,
}

fn default_threshold() -> f32 {
    0.5
}

fn default_min_speech_duration_ms() -> u32 {
    250
}

fn default_min_silence_duration_ms() -> u32 {
    100
}

impl Default for DetectionDefaults {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            min_speech_duration_ms: default_min_speech_duration_ms(),
            min_silence_duration_ms: default_min_silence_duration_ms(),
        }
    }
}
