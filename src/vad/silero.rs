//! Silero VAD scorer backed by ONNX Runtime.
//!
//! Targets the v5 export of <https://github.com/snakers4/silero-vad>:
//!
//! | Name     | Shape        | DType | Direction |
//! |----------|--------------|-------|-----------|
//! | `input`  | `[1, 64+512]`| f32   | in        |
//! | `state`  | `[2, 1, 128]`| f32   | in        |
//! | `sr`     | `[1]`        | i64   | in        |
//! | `output` | `[1, 1]`     | f32   | out       |
//! | `stateN` | `[2, 1, 128]`| f32   | out       |
//!
//! Each 512-sample window is prefixed with the last 64 samples of the
//! previous one. Audio that is not 16 kHz is resampled first.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use ndarray::{Array1, Array2, Array3};
use ort::session::builder::SessionBuilder;
use ort::session::{Session, SessionInputValue};
use ort::value::Value;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::interface::{FrameScore, ScoreTrack, ScorerProvider, SpeechScorer};
use crate::config_manager::SileroScorerConfig;

const MODEL_SAMPLE_RATE: u32 = 16_000;
/// Samples per scored window (32 ms at 16 kHz)
const WINDOW: usize = 512;
/// Tail of the previous window fed in front of the current one
const CONTEXT: usize = 64;
/// 2 layers × 1 batch × 128 units
const STATE_SIZE: usize = 256;

pub struct SileroScorer {
    session: Mutex<Session>,
}

impl SileroScorer {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!("Silero model file not found: {}", path.display());
        }

        let session = SessionBuilder::new()
            .map_err(|e| anyhow::anyhow!("onnx session: {}", e))?
            .commit_from_file(path)
            .map_err(|e| anyhow::anyhow!("onnx session: {}", e))?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|outlet| outlet.name().to_string())
            .collect();
        if !input_names.iter().any(|n| n == "state") {
            anyhow::bail!(
                "unsupported Silero export (expected a v5 model with a `state` input, found {:?})",
                input_names
            );
        }

        info!("Silero model loaded from {}", path.display());
        Ok(Self {
            session: Mutex::new(session),
        })
    }

    fn run_window(
        session: &mut Session,
        input: &[f32],
        state: &mut Vec<f32>,
    ) -> anyhow::Result<f32> {
        let onnx = |e: ort::Error| anyhow::anyhow!("onnx inference: {}", e);

        let input_arr = Array2::<f32>::from_shape_vec((1, CONTEXT + WINDOW), input.to_vec())?;
        let state_arr = Array3::<f32>::from_shape_vec((2, 1, 128), state.clone())?;
        let sr_arr = Array1::<i64>::from_elem(1, MODEL_SAMPLE_RATE as i64);

        let input_values: Vec<(String, SessionInputValue<'_>)> = vec![
            ("input".to_string(), Value::from_array(input_arr).map_err(onnx)?.into()),
            ("state".to_string(), Value::from_array(state_arr).map_err(onnx)?.into()),
            ("sr".to_string(), Value::from_array(sr_arr).map_err(onnx)?.into()),
        ];

        let outputs = session.run(input_values).map_err(onnx)?;

        let (_, prob_data) = outputs["output"].try_extract_tensor::<f32>().map_err(onnx)?;
        let probability = prob_data.first().copied().unwrap_or(0.0);

        let (_, state_data) = outputs["stateN"].try_extract_tensor::<f32>().map_err(onnx)?;
        *state = state_data.to_vec();

        Ok(probability)
    }
}

impl SpeechScorer for SileroScorer {
    fn name(&self) -> &str {
        "silero"
    }

    fn score(&self, samples: &[f32], sample_rate: u32) -> anyhow::Result<ScoreTrack> {
        let hop_secs = WINDOW as f64 / MODEL_SAMPLE_RATE as f64;
        if samples.is_empty() {
            return Ok(ScoreTrack::new(hop_secs, Vec::new()));
        }

        let resampled;
        let samples = if sample_rate == MODEL_SAMPLE_RATE {
            samples
        } else {
            resampled = resample(samples, sample_rate, MODEL_SAMPLE_RATE)?;
            resampled.as_slice()
        };

        // Fresh recurrent state per clip keeps scoring deterministic
        let mut state = vec![0.0f32; STATE_SIZE];
        let mut buffer = vec![0.0f32; CONTEXT + WINDOW];
        let mut frames = Vec::with_capacity(samples.len() / WINDOW + 1);
        let mut session = self.session.lock();

        for (i, chunk) in samples.chunks(WINDOW).enumerate() {
            // Shift the previous window's tail into the context slot
            buffer.copy_within(WINDOW.., 0);
            buffer[CONTEXT..].fill(0.0);
            buffer[CONTEXT..CONTEXT + chunk.len()].copy_from_slice(chunk);

            let probability = Self::run_window(&mut session, &buffer, &mut state)?;
            frames.push(FrameScore {
                time: i as f64 * hop_secs,
                probability,
            });
        }

        debug!(windows = frames.len(), "Silero scoring finished");
        Ok(ScoreTrack::new(hop_secs, frames))
    }
}

fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> anyhow::Result<Vec<f32>> {
    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
    };

    if from_rate == 0 {
        anyhow::bail!("sample rate must be positive");
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let chunk_size = 1024;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1)
        .map_err(|e| anyhow::anyhow!("resampler init: {}", e))?;

    let mut output = Vec::with_capacity((samples.len() as f64 * ratio) as usize + chunk_size);

    for chunk in samples.chunks(chunk_size) {
        let mut input = chunk.to_vec();
        input.resize(chunk_size, 0.0);

        let result = resampler
            .process(&[input], None)
            .map_err(|e| anyhow::anyhow!("resample: {}", e))?;

        if let Some(channel) = result.first() {
            output.extend_from_slice(channel);
        }
    }

    output.truncate((samples.len() as f64 * ratio) as usize);
    Ok(output)
}

/// Loads the Silero model from disk on a blocking thread
pub struct SileroScorerProvider {
    model_path: PathBuf,
}

impl SileroScorerProvider {
    pub fn new(config: SileroScorerConfig) -> Self {
        Self {
            model_path: config.model_path,
        }
    }
}

#[async_trait]
impl ScorerProvider for SileroScorerProvider {
    fn model_name(&self) -> &str {
        "Silero VAD"
    }

    fn description(&self) -> &str {
        "Deep-learning voice activity detection model"
    }

    fn supported_sample_rates(&self) -> Vec<u32> {
        vec![8000, 16000]
    }

    async fn load(&self) -> anyhow::Result<Arc<dyn SpeechScorer>> {
        let path = self.model_path.clone();
        let scorer = tokio::task::spawn_blocking(move || SileroScorer::from_file(&path)).await??;
        Ok(Arc::new(scorer))
    }
}
