use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::QueryRejection,
        DefaultBodyLimit, Multipart, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::api_types::{DetectResponse, HealthResponse, ModelInfo, ServiceStatus};
use crate::audio::SUPPORTED_FORMATS;
use crate::error::VadError;
use crate::pipeline::{self, DetectionJob};
use crate::state::AppState;
use crate::vad::DetectionConfig;

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Multipart field names that carry the upload
const AUDIO_FIELDS: [&str; 2] = ["audio_file", "file"];

pub fn create_app(state: AppState) -> Router {
    let body_limit = state
        .config
        .server
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/info", get(model_info))
        .route("/detect", post(detect_speech))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn root(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(ServiceStatus {
        message: state.config.server.service_name.clone(),
        status: "running".to_string(),
        model_loaded: state.model.is_ready(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Loads the model on first use, so a healthy answer means `/detect` can run.
async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, VadError> {
    if !state.model.ensure_ready().await {
        return Err(model_unavailable(&state));
    }

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: true,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

async fn model_info(State(state): State<AppState>) -> Result<Json<ModelInfo>, VadError> {
    if !state.model.is_ready() {
        return Err(VadError::ModelUnavailable("model is not loaded".to_string()));
    }

    let provider = state.model.provider();
    Ok(Json(ModelInfo {
        model_name: provider.model_name().to_string(),
        model_loaded: true,
        supported_sample_rates: provider.supported_sample_rates(),
        supported_formats: SUPPORTED_FORMATS.iter().map(|f| f.to_string()).collect(),
        default_threshold: state.detection_defaults.threshold(),
        description: provider.description().to_string(),
    }))
}

/// Raw `/detect` query. Typed loosely so out-of-range values reach our own
/// validation instead of a framework rejection.
#[derive(Debug, Default, Deserialize)]
pub struct DetectParams {
    pub threshold: Option<f64>,
    pub min_speech_duration_ms: Option<i64>,
    pub min_silence_duration_ms: Option<i64>,
}

impl DetectParams {
    pub fn into_config(self, defaults: &DetectionConfig) -> Result<DetectionConfig, VadError> {
        let threshold = match self.threshold {
            // Checked as f64: narrowing first rounds 1.00000001 down to 1
            Some(t) if t.is_finite() && (0.0..=1.0).contains(&t) => t as f32,
            Some(t) => {
                return Err(VadError::validation(format!(
                    "threshold must be between 0 and 1, got {}",
                    t
                )))
            }
            None => defaults.threshold(),
        };
        let min_speech = duration_param(
            "min_speech_duration_ms",
            self.min_speech_duration_ms,
            defaults.min_speech_duration_ms(),
        )?;
        let min_silence = duration_param(
            "min_silence_duration_ms",
            self.min_silence_duration_ms,
            defaults.min_silence_duration_ms(),
        )?;

        DetectionConfig::new(threshold, min_speech, min_silence)
    }
}

fn duration_param(name: &str, value: Option<i64>, default: u32) -> Result<u32, VadError> {
    match value {
        None => Ok(default),
        Some(ms) => u32::try_from(ms).map_err(|_| {
            VadError::validation(format!(
                "{} must be a non-negative number of milliseconds, got {}",
                name, ms
            ))
        }),
    }
}

async fn detect_speech(
    State(state): State<AppState>,
    params: Result<Query<DetectParams>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectResponse>, VadError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("detect", %request_id);

    async move {
        let Query(params) = params
            .map_err(|e| VadError::validation(format!("invalid query parameters: {}", e.body_text())))?;
        let config = params.into_config(&state.detection_defaults)?;

        if !state.model.ensure_ready().await {
            return Err(model_unavailable(&state));
        }

        let multipart =
            multipart.map_err(|e| VadError::validation(format!("invalid upload: {}", e.body_text())))?;
        let (filename, audio) = read_upload(multipart).await?;
        // Before taking a detection slot
        state.ingest.validate(&audio, &filename)?;
        info!(
            filename = %filename,
            threshold = config.threshold(),
            min_speech_ms = config.min_speech_duration_ms(),
            min_silence_ms = config.min_silence_duration_ms(),
            "Detection requested"
        );

        let job = DetectionJob {
            request_id,
            filename,
            audio,
            config,
        };
        let result = pipeline::detect(&state, job).await?;
        Ok(Json(DetectResponse::success(&result)))
    }
    .instrument(span)
    .await
}

/// First audio field of the form, with the name the client gave it
async fn read_upload(mut multipart: Multipart) -> Result<(String, axum::body::Bytes), VadError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| VadError::validation(format!("malformed multipart body: {}", e.body_text())))?
    {
        let is_audio = field.name().is_some_and(|name| AUDIO_FIELDS.contains(&name));
        if !is_audio {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let audio = field
            .bytes()
            .await
            .map_err(|e| VadError::validation(format!("could not read upload: {}", e.body_text())))?;
        return Ok((filename, audio));
    }

    Err(VadError::validation(
        "no audio file provided; send it in the 'audio_file' form field",
    ))
}

fn model_unavailable(state: &AppState) -> VadError {
    let cause = state
        .model
        .last_error()
        .unwrap_or_else(|| "model is not loaded".to_string());
    VadError::ModelUnavailable(cause)
}
