use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config_manager::system::ServerConfig;
use crate::config_manager::vad::{DetectionDefaults, ModelConfig};

/// Environment variable that points at an explicit config file
pub const CONFIG_PATH_ENV: &str = "VAD_CONFIG_PATH";

const CONFIG_CANDIDATES: [&str; 3] = ["conf.yaml", "conf.json", "config/conf.yaml"];

/// Main configuration for the service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub detection: DetectionDefaults,
}

impl Config {
    /// Load configuration from a YAML or JSON file
    pub fn load(path: &str) -> anyhow::Result<Self> {
        use crate::config_manager::utils::{read_config, validate_config};
        let value = read_config(path)?;
        validate_config(value)
    }

    /// Try the configured path and the usual locations in order. Returns the
    /// built-in defaults (and no path) when none of them exists.
    ///
    /// A file that exists but fails to parse or validate is an error.
    pub fn discover() -> anyhow::Result<(Self, Option<String>)> {
        let config_paths: Vec<String> = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .into_iter()
            .chain(CONFIG_CANDIDATES.iter().map(|p| p.to_string()))
            .collect();

        for path in config_paths {
            if !std::path::Path::new(&path).exists() {
                debug!("No config file at {}", path);
                continue;
            }
            let config = Self::load(&path)
                .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", path, e))?;
            return Ok((config, Some(path)));
        }

        Ok((Self::default(), None))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.server.validate().map_err(anyhow::Error::msg)?;

        let detection = &self.detection;
        if !(0.0..=1.0).contains(&detection.threshold) {
            anyhow::bail!("detection.threshold must be within [0, 1]");
        }

        let energy = &self.model.energy;
        if energy.frame_ms == 0 {
            anyhow::bail!("model.energy.frame_ms must be positive");
        }
        if !(energy.width_db > 0.0) {
            anyhow::bail!("model.energy.width_db must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.model.backend, "energy");
        assert_eq!(config.detection.threshold, 0.5);
        assert_eq!(config.detection.min_speech_duration_ms, 250);
        assert_eq!(config.detection.min_silence_duration_ms, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_falls_back_to_defaults_per_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.yaml");
        std::fs::write(
            &path,
            "server:\n  port: 9001\nmodel:\n  backend: silero\n  silero:\n    model_path: /models/vad.onnx\n",
        )
        .unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.model.backend, "silero");
        assert_eq!(
            config.model.silero.model_path,
            std::path::PathBuf::from("/models/vad.onnx")
        );
        assert_eq!(config.model.energy.frame_ms, 20);
        assert_eq!(config.detection.min_silence_duration_ms, 100);
    }

    #[test]
    fn zero_frame_length_is_rejected() {
        let mut config = Config::default();
        config.model.energy.frame_ms = 0;
        assert!(config.validate().is_err());
    }
}
