//! The blocking half of a `/detect` request: ingest, extract, aggregate.

use std::sync::Arc;

use axum::body::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::audio::AudioIngest;
use crate::error::VadError;
use crate::state::AppState;
use crate::vad::{aggregate, DetectionConfig, DetectionResult, SegmentExtractor, SpeechScorer};

/// One validated detection request, ready to hand to a worker
#[derive(Debug, Clone)]
pub struct DetectionJob {
    pub request_id: Uuid,
    pub filename: String,
    pub audio: Bytes,
    pub config: DetectionConfig,
}

/// Runs on a worker thread. The staged upload never outlives this call.
pub fn run_detection(
    ingest: &AudioIngest,
    scorer: Arc<dyn SpeechScorer>,
    job: &DetectionJob,
) -> Result<DetectionResult, VadError> {
    let waveform = ingest.ingest(&job.audio, &job.filename, job.request_id)?;

    let segments = SegmentExtractor::new(scorer).extract(&waveform, &job.config)?;
    let statistics = aggregate(
        &segments,
        waveform.duration(),
        waveform.sample_rate(),
        job.config.threshold(),
    );

    info!(
        segments = statistics.total_segments,
        speech_secs = statistics.total_speech_duration,
        audio_secs = statistics.total_audio_duration,
        "Detected speech"
    );
    Ok(DetectionResult {
        segments,
        statistics,
    })
}

/// Schedule a job on the blocking pool once a detection slot is free.
///
/// The job keeps running if the caller goes away; the slot is held until it
/// finishes.
pub async fn detect(state: &AppState, job: DetectionJob) -> Result<DetectionResult, VadError> {
    let scorer = state
        .model
        .scorer()
        .ok_or_else(|| VadError::ModelUnavailable("model is not loaded".to_string()))?;

    let permit = Arc::clone(&state.detection_slots)
        .acquire_owned()
        .await
        .map_err(|_| VadError::processing("detection pool is shut down"))?;

    let ingest = Arc::clone(&state.ingest);
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || {
        let _permit = permit;
        let _entered = span.enter();
        run_detection(&ingest, scorer, &job)
    })
    .await?
}
