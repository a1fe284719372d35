// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Hosted embedding backend using the Gemini `batchEmbedContents` API

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::TextEmbedder;
use crate::llm::API_KEY_HEADER;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The API accepts at most 100 requests per batch call
const MAX_BATCH: usize = 100;

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Clone)]
pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    /// Fully qualified model name, e.g. `models/embedding-001`
    model: String,
    dimension: usize,
    base_url: String,
}

impl std::fmt::Debug for GeminiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiEmbedder")
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl GeminiEmbedder {
    /// Create the client and embed one sample to learn its dimension
    pub async fn new(api_key: String, model: &str, timeout: Duration) -> Result<Self> {
        Self::with_base_url(api_key, model, timeout, API_BASE).await
    }

    pub async fn with_base_url(
        api_key: String,
        model: &str,
        timeout: Duration,
        base_url: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let model = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };

        let mut embedder = Self {
            client,
            api_key,
            model,
            dimension: 0,
            base_url: base_url.trim_end_matches('/').to_string(),
        };

        let sample = embedder.request_batch(&["dimension check".to_string()]).await?;
        embedder.dimension = sample.first().map(Vec::len).unwrap_or(0);
        if embedder.dimension == 0 {
            anyhow::bail!("Embedding model {} returned an empty vector", embedder.model);
        }

        Ok(embedder)
    }

    async fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: &self.model,
                    content: Content {
                        parts: vec![Part { text }],
                    },
                })
                .collect(),
        };

        let url = format!("{}/{}:batchEmbedContents", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow!("Embedding request failed: {}", e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Embedding API returned {}: {}", status, text));
        }

        let parsed: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Invalid embedding response: {}", e.without_url()))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(anyhow!(
                "Embedding API returned {} vectors for {} texts",
                parsed.embeddings.len(),
                texts.len()
            ));
        }

        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[async_trait]
impl TextEmbedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut result = self.request_batch(&[text.to_string()]).await?;
        result.pop().ok_or_else(|| anyhow!("Embedding API returned no vector"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            debug!("Requesting {} embeddings from {}", batch.len(), self.model);
            all.extend(self.request_batch(batch).await?);
        }
        Ok(all)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
