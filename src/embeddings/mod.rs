// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Sentence embedding backends
//!
//! Two implementations share the [`TextEmbedder`] seam:
//! - [`OnnxEmbeddingModel`]: local sentence transformer on ONNX Runtime
//! - [`GeminiEmbedder`]: hosted Gemini embedding API

pub mod gemini;
pub mod onnx_model;

use anyhow::Result;
use async_trait::async_trait;

pub use gemini::GeminiEmbedder;
pub use onnx_model::OnnxEmbeddingModel;

/// Produces fixed-dimension embeddings for text
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts, returning one vector per input in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Output dimension
    fn dimension(&self) -> usize;

    /// Model identifier, recorded with every stored collection
    fn model_name(&self) -> &str;
}
