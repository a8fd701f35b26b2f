//! Wire types for the HTTP surface. Shared by the server and `VadClient`.

use serde::{Deserialize, Serialize};

use crate::vad::statistics::serialize_rounded;
use crate::vad::{DetectionResult, SpeechSegment, Statistics};

/// `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub message: String,
    pub status: String,
    pub model_loaded: bool,
    pub version: String,
}

/// `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub timestamp: String,
}

/// `GET /info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub model_loaded: bool,
    pub supported_sample_rates: Vec<u32>,
    pub supported_formats: Vec<String>,
    pub default_threshold: f32,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentReport {
    #[serde(serialize_with = "serialize_rounded")]
    pub start: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub end: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub duration: f64,
}

impl From<&SpeechSegment> for SegmentReport {
    fn from(segment: &SpeechSegment) -> Self {
        Self {
            start: segment.start,
            end: segment.end,
            duration: segment.duration(),
        }
    }
}

/// `POST /detect` success body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    pub status: String,
    pub speech_segments: Vec<SegmentReport>,
    pub statistics: Statistics,
}

impl DetectResponse {
    pub fn success(result: &DetectionResult) -> Self {
        Self {
            status: "success".to_string(),
            speech_segments: result.segments.iter().map(SegmentReport::from).collect(),
            statistics: result.statistics.clone(),
        }
    }

    pub fn has_speech(&self) -> bool {
        !self.speech_segments.is_empty()
    }
}

/// Body of every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub error_type: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error_type: error_type.into(),
            message: message.into(),
        }
    }
}
