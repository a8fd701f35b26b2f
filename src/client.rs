use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::api_types::{DetectResponse, ErrorResponse, HealthResponse, ModelInfo};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for a running detection service
#[derive(Debug, Clone)]
pub struct VadClient {
    client: Client,
    base_url: String,
}

/// Per-request overrides. Anything left `None` uses the server's defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_speech_duration_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_silence_duration_ms: Option<u32>,
}

impl VadClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        parse_response(response).await
    }

    pub async fn info(&self) -> Result<ModelInfo> {
        let url = format!("{}/info", self.base_url);
        let response = self.client.get(&url).send().await?;
        parse_response(response).await
    }

    /// Upload in-memory audio. `filename` decides how the server decodes it.
    pub async fn detect_bytes(
        &self,
        audio: Vec<u8>,
        filename: &str,
        options: &DetectOptions,
    ) -> Result<DetectResponse> {
        let url = format!("{}/detect", self.base_url);
        let part = Part::bytes(audio).file_name(filename.to_string());
        let form = Form::new().part("audio_file", part);

        let response = self
            .client
            .post(&url)
            .query(options)
            .multipart(form)
            .send()
            .await?;
        parse_response(response).await
    }

    pub async fn detect_file(
        &self,
        path: impl AsRef<Path>,
        options: &DetectOptions,
    ) -> Result<DetectResponse> {
        let path = path.as_ref();
        let audio = tokio::fs::read(path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        self.detect_bytes(audio, &filename, options).await
    }

    /// Whether the file contains at least one speech segment
    pub async fn has_speech(&self, path: impl AsRef<Path>, options: &DetectOptions) -> Result<bool> {
        Ok(self.detect_file(path, options).await?.has_speech())
    }

    /// Whether in-memory audio contains at least one speech segment
    pub async fn has_speech_bytes(
        &self,
        audio: Vec<u8>,
        filename: &str,
        options: &DetectOptions,
    ) -> Result<bool> {
        Ok(self.detect_bytes(audio, filename, options).await?.has_speech())
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(error) => anyhow::bail!("{} ({}): {}", status, error.error_type, error.message),
        Err(_) => anyhow::bail!("{}: {}", status, body),
    }
}
