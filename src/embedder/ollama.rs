//! Ollama-style `/api/embed` client.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{first_vector, EmbeddingProvider};
use crate::error::FetchError;

/// Default embedding model served by the local inference host.
pub const DEFAULT_MODEL: &str = "bge-m3";

/// Async embeddings client for hosts exposing `POST /api/embed`.
#[derive(Clone)]
pub struct OllamaEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: Option<usize>,
}

impl OllamaEmbedder {
    /// Builds a new client.
    ///
    /// # Arguments
    /// * `base_url` - Inference host, e.g. `http://localhost:11434`
    /// * `model` - Model tag to run, e.g. `bge-m3`
    /// * `dimensions` - Expected vector length; mismatches fail the job
    pub fn new(
        base_url: String,
        model: String,
        dimensions: Option<usize>,
        timeout: Duration,
    ) -> Result<Self> {
        anyhow::ensure!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            "embedding base URL must be an http(s) URL"
        );
        anyhow::ensure!(!model.trim().is_empty(), "missing embedding model name");
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build embedding HTTP client")?;
        let endpoint = format!("{}/api/embed", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model,
            dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, input: &str) -> Result<Vec<f32>, FetchError> {
        let request = EmbedRequest {
            model: &self.model,
            input,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(FetchError::status(status, &body));
        }
        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|err| FetchError::Decode(err.to_string()))?;
        first_vector(parsed.embeddings, self.dimensions)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}
