use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::energy::EnergyScorerProvider;
use super::interface::{ScorerProvider, SpeechScorer};
use crate::config_manager::ModelConfig;

/// Factory for scorer providers
pub struct ScorerFactory;

impl ScorerFactory {
    /// Pick a provider for the configured backend.
    ///
    /// Never fails: a backend that cannot be served yields a provider whose
    /// load always errors, so the service still starts and reports 503.
    pub fn create_provider(model_config: &ModelConfig) -> Arc<dyn ScorerProvider> {
        info!("Configuring speech scorer backend: {}", model_config.backend);

        match model_config.backend.as_str() {
            "energy" => Arc::new(EnergyScorerProvider::new(model_config.energy.clone())),
            #[cfg(feature = "onnx")]
            "silero" => Arc::new(super::silero::SileroScorerProvider::new(
                model_config.silero.clone(),
            )),
            #[cfg(not(feature = "onnx"))]
            "silero" => {
                warn!("Silero backend requested but the `onnx` feature is not enabled");
                Arc::new(UnavailableProvider::new(
                    "Silero VAD",
                    "this build does not include the `onnx` feature",
                ))
            }
            other => {
                warn!("Unknown scorer backend: {}", other);
                Arc::new(UnavailableProvider::new(
                    other,
                    format!("unknown scorer backend '{}'", other),
                ))
            }
        }
    }
}

/// Stands in for a backend this build cannot serve
struct UnavailableProvider {
    name: String,
    reason: String,
}

impl UnavailableProvider {
    fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ScorerProvider for UnavailableProvider {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Unavailable scorer backend"
    }

    fn supported_sample_rates(&self) -> Vec<u32> {
        Vec::new()
    }

    async fn load(&self) -> anyhow::Result<Arc<dyn SpeechScorer>> {
        anyhow::bail!("{}", self.reason)
    }
}
