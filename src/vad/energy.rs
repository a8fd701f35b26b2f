//! RMS energy scorer.
//!
//! Each frame's RMS level (dBFS) is mapped through a logistic curve centred
//! on `center_db`, so loud frames score close to 1 and digital silence
//! scores close to 0. Works at any sample rate.

use std::sync::Arc;

use async_trait::async_trait;

use super::interface::{FrameScore, ScoreTrack, ScorerProvider, SpeechScorer};
use crate::config_manager::EnergyScorerConfig;

/// Floor used instead of log10(0) for silent frames
const MIN_RMS: f32 = 1e-10;

#[derive(Debug, Clone)]
pub struct EnergyScorer {
    frame_ms: u32,
    center_db: f32,
    width_db: f32,
}

impl EnergyScorer {
    pub fn new(config: &EnergyScorerConfig) -> anyhow::Result<Self> {
        if config.frame_ms == 0 {
            anyhow::bail!("energy scorer frame length must be positive");
        }
        if !(config.width_db > 0.0) {
            anyhow::bail!("energy scorer width_db must be positive");
        }
        Ok(Self {
            frame_ms: config.frame_ms,
            center_db: config.center_db,
            width_db: config.width_db,
        })
    }

    fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
        (sum_sq / samples.len() as f32).sqrt()
    }

    fn probability(&self, rms: f32) -> f32 {
        let db = 20.0 * rms.max(MIN_RMS).log10();
        1.0 / (1.0 + (-(db - self.center_db) / self.width_db).exp())
    }
}

impl SpeechScorer for EnergyScorer {
    fn name(&self) -> &str {
        "energy"
    }

    fn score(&self, samples: &[f32], sample_rate: u32) -> anyhow::Result<ScoreTrack> {
        if sample_rate == 0 {
            anyhow::bail!("sample rate must be positive");
        }

        let frame_len = ((sample_rate as u64 * self.frame_ms as u64) / 1000).max(1) as usize;
        let hop_secs = frame_len as f64 / sample_rate as f64;

        let frames = samples
            .chunks(frame_len)
            .enumerate()
            .map(|(i, chunk)| FrameScore {
                time: (i * frame_len) as f64 / sample_rate as f64,
                probability: self.probability(Self::rms(chunk)),
            })
            .collect();

        Ok(ScoreTrack::new(hop_secs, frames))
    }
}

/// Provider for the energy scorer. Loading only validates the settings.
pub struct EnergyScorerProvider {
    config: EnergyScorerConfig,
}

impl EnergyScorerProvider {
    pub fn new(config: EnergyScorerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ScorerProvider for EnergyScorerProvider {
    fn model_name(&self) -> &str {
        "Energy VAD"
    }

    fn description(&self) -> &str {
        "Frame RMS energy mapped to a speech probability"
    }

    fn supported_sample_rates(&self) -> Vec<u32> {
        vec![8000, 16000, 22050, 44100, 48000]
    }

    async fn load(&self) -> anyhow::Result<Arc<dyn SpeechScorer>> {
        let scorer = EnergyScorer::new(&self.config)?;
        Ok(Arc::new(scorer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> EnergyScorer {
        EnergyScorer::new(&EnergyScorerConfig::default()).unwrap()
    }

    #[test]
    fn silence_scores_near_zero_and_tone_near_one() {
        let s = scorer();
        assert!(s.probability(0.0) < 0.01);
        assert!(s.probability(0.5) > 0.99);
    }

    #[test]
    fn hop_and_frame_times_follow_frame_length() {
        let s = scorer();
        let samples = vec![0.0f32; 16000];
        let track = s.score(&samples, 16000).unwrap();

        assert!((track.hop_secs - 0.02).abs() < 1e-12);
        assert_eq!(track.frames.len(), 50);
        assert!((track.frames[25].time - 0.5).abs() < 1e-12);
    }

    #[test]
    fn trailing_partial_frame_is_scored() {
        let s = scorer();
        let samples = vec![0.3f32; 330];
        let track = s.score(&samples, 16000).unwrap();
        assert_eq!(track.frames.len(), 2);
        assert!(track.frames[1].probability > 0.99);
    }

    #[test]
    fn empty_waveform_yields_no_frames() {
        let track = scorer().score(&[], 16000).unwrap();
        assert!(track.is_empty());
    }

    #[test]
    fn zero_sample_rate_is_rejected() {
        assert!(scorer().score(&[0.1, 0.2], 0).is_err());
    }

    #[test]
    fn scoring_is_deterministic() {
        let s = scorer();
        let samples: Vec<f32> = (0..4000).map(|i| ((i as f32) * 0.01).sin() * 0.2).collect();
        assert_eq!(s.score(&samples, 8000).unwrap(), s.score(&samples, 8000).unwrap());
    }

    #[tokio::test]
    async fn provider_rejects_invalid_settings() {
        let provider = EnergyScorerProvider::new(EnergyScorerConfig {
            frame_ms: 0,
            ..EnergyScorerConfig::default()
        });
        assert!(provider.load().await.is_err());
    }
}
