use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::info;

use crate::audio::{AudioDecoder, AudioIngest, SymphoniaDecoder};
use crate::config_manager::Config;
use crate::vad::{DetectionConfig, ModelLoader, ScorerFactory, ScorerProvider};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub model: Arc<ModelLoader>,
    pub ingest: Arc<AudioIngest>,
    /// Used for query parameters a `/detect` caller leaves out
    pub detection_defaults: DetectionConfig,
    /// Bounds detections running on the blocking pool
    pub detection_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let provider = ScorerFactory::create_provider(&config.model);
        Self::with_components(config, provider, Arc::new(SymphoniaDecoder))
    }

    /// Build the state around an explicit scorer provider and decoder
    pub fn with_components(
        config: Config,
        provider: Arc<dyn ScorerProvider>,
        decoder: Arc<dyn AudioDecoder>,
    ) -> anyhow::Result<Self> {
        let temp_dir = config.server.temp_dir_path();
        std::fs::create_dir_all(&temp_dir)?;
        info!("Staging uploads in {}", temp_dir.display());

        let defaults = &config.detection;
        let detection_defaults = DetectionConfig::new(
            defaults.threshold,
            defaults.min_speech_duration_ms,
            defaults.min_silence_duration_ms,
        )
        .map_err(|e| anyhow::anyhow!("invalid detection defaults: {}", e))?;

        let ingest = AudioIngest::new(decoder, temp_dir, config.server.max_upload_bytes);
        let detection_slots = Arc::new(Semaphore::new(config.server.max_concurrent_detections));

        Ok(Self {
            model: Arc::new(ModelLoader::new(provider)),
            ingest: Arc::new(ingest),
            detection_defaults,
            detection_slots,
            config,
        })
    }
}
