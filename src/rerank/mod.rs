// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cross-encoder reranking of retrieved chunks

pub mod cross_encoder;

use anyhow::Result;
use async_trait::async_trait;

pub use cross_encoder::OnnxCrossEncoder;

/// Scores (query, document) pairs for relevance
#[async_trait]
pub trait Reranker: Send + Sync {
    /// One score per document, in input order. Higher is more relevant.
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>>;

    fn model_name(&self) -> &str;
}
