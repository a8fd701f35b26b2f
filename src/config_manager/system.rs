use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// HTTP server and request-handling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Name reported by `GET /`
    #[serde(rename = "service_name")]
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Where uploads are staged while they are decoded. Falls back to the
    /// OS temp directory.
    #[serde(rename = "temp_dir")]
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    #[serde(rename = "max_upload_bytes")]
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Upper bound on detections running on the blocking pool at once
    #[serde(rename = "max_concurrent_detections")]
    #[serde(default = "default_max_concurrent_detections")]
    pub max_concurrent_detections: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_service_name() -> String {
    "Silero VAD Service".to_string()
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

fn default_max_concurrent_detections() -> usize {
    4
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("server.port must be between 1 and 65535".to_string());
        }
        if self.max_upload_bytes == 0 {
            return Err("server.max_upload_bytes must be positive".to_string());
        }
        if self.max_concurrent_detections == 0 {
            return Err("server.max_concurrent_detections must be positive".to_string());
        }
        Ok(())
    }

    pub fn temp_dir_path(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            service_name: default_service_name(),
            temp_dir: None,
            max_upload_bytes: default_max_upload_bytes(),
            max_concurrent_detections: default_max_concurrent_detections(),
        }
    }
}
