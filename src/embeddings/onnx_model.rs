// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX sentence-transformer wrapper
//!
//! Runs a sentence-transformer export (all-mpnet-base-v2 by default) on ONNX
//! Runtime. The model outputs token embeddings which are mean-pooled over the
//! attention mask and L2-normalized, matching sentence-transformers' default
//! pipeline for these models.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ndarray::{Array2, Axis};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{Encoding, Tokenizer, TruncationParams};
use tracing::{debug, info, warn};

use super::TextEmbedder;
use crate::vector::embeddings::l2_normalize;

/// all-mpnet-base-v2 was trained with sequences of up to 384 tokens
pub const DEFAULT_MAX_LENGTH: usize = 384;

/// Texts per ONNX run when embedding large batches
const INFERENCE_BATCH_SIZE: usize = 32;

/// Build an ONNX Runtime session, preferring CUDA and falling back to CPU
pub(crate) fn build_session(model_path: &Path) -> Result<Session> {
    info!("Initializing ONNX session for {}", model_path.display());

    let cuda_result = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CUDAExecutionProvider::default().build()])
        .context("Failed to set CUDA execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(4)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path);

    match cuda_result {
        Ok(session) => {
            info!("CUDA execution provider initialized");
            Ok(session)
        }
        Err(e) => {
            warn!("CUDA execution provider failed: {}", e);
            warn!("Falling back to CPU execution provider");
            Session::builder()
                .context("Failed to create session builder")?
                .with_execution_providers([CPUExecutionProvider::default().build()])
                .context("Failed to set CPU execution provider")?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .context("Failed to set optimization level")?
                .with_intra_threads(4)
                .context("Failed to set intra threads")?
                .commit_from_file(model_path)
                .context(format!(
                    "Failed to load ONNX model from {}",
                    model_path.display()
                ))
        }
    }
}

/// Load a tokenizer with truncation enabled and padding disabled.
///
/// Padding is done by hand so every batch is only as wide as its longest item.
pub(crate) fn load_tokenizer(tokenizer_path: &Path, max_length: usize) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(tokenizer_path)
        .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
    tokenizer.with_padding(None);
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
    Ok(tokenizer)
}

/// Padded `[batch, max_len]` tensors for a set of encodings
pub(crate) struct BatchTensors {
    pub input_ids: Array2<i64>,
    pub attention_mask: Array2<i64>,
    pub token_type_ids: Array2<i64>,
    pub max_len: usize,
}

pub(crate) fn pad_encodings(encodings: &[Encoding]) -> Result<BatchTensors> {
    let batch = encodings.len();
    let max_len = encodings
        .iter()
        .map(|enc| enc.get_ids().len())
        .max()
        .unwrap_or(0);

    let mut input_ids = Vec::with_capacity(batch * max_len);
    let mut attention_mask = Vec::with_capacity(batch * max_len);
    let mut token_type_ids = Vec::with_capacity(batch * max_len);

    for encoding in encodings {
        let ids = encoding.get_ids();
        let padding_needed = max_len - ids.len();

        input_ids.extend(ids.iter().map(|&id| id as i64));
        attention_mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
        token_type_ids.extend(encoding.get_type_ids().iter().map(|&t| t as i64));

        input_ids.extend(std::iter::repeat(0i64).take(padding_needed));
        attention_mask.extend(std::iter::repeat(0i64).take(padding_needed));
        token_type_ids.extend(std::iter::repeat(0i64).take(padding_needed));
    }

    Ok(BatchTensors {
        input_ids: Array2::from_shape_vec((batch, max_len), input_ids)
            .context("Failed to create input_ids array")?,
        attention_mask: Array2::from_shape_vec((batch, max_len), attention_mask)
            .context("Failed to create attention_mask array")?,
        token_type_ids: Array2::from_shape_vec((batch, max_len), token_type_ids)
            .context("Failed to create token_type_ids array")?,
        max_len,
    })
}

/// True when the session declares an input with this name
pub(crate) fn has_input(session: &Session, name: &str) -> bool {
    session.inputs.iter().any(|input| input.name == name)
}

/// ONNX-based sentence embedding model
///
/// Cheap to clone; the session and tokenizer are shared behind `Arc`s.
#[derive(Clone)]
pub struct OnnxEmbeddingModel {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    dimension: usize,
    uses_token_type_ids: bool,
    normalize: bool,
}

impl std::fmt::Debug for OnnxEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingModel")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("uses_token_type_ids", &self.uses_token_type_ids)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbeddingModel {
    /// Load a sentence transformer from disk.
    ///
    /// The output dimension is discovered with a validation inference, so the
    /// same code serves 384-d MiniLM and 768-d mpnet exports.
    pub async fn new<P: AsRef<Path>>(
        model_name: impl Into<String>,
        model_path: P,
        tokenizer_path: P,
    ) -> Result<Self> {
        let model_name = model_name.into();
        let model_path = model_path.as_ref().to_path_buf();
        let tokenizer_path = tokenizer_path.as_ref().to_path_buf();

        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        let (session, tokenizer) = tokio::task::spawn_blocking(move || -> Result<_> {
            let session = build_session(&model_path)?;
            let tokenizer = load_tokenizer(&tokenizer_path, DEFAULT_MAX_LENGTH)?;
            Ok((session, tokenizer))
        })
        .await
        .context("Model loading task failed")??;

        let uses_token_type_ids = has_input(&session, "token_type_ids");

        let mut model = Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            dimension: 0,
            uses_token_type_ids,
            normalize: true,
        };

        let validation_model = model.clone();
        let sample = tokio::task::spawn_blocking(move || {
            validation_model.run_batch(&["validation test".to_string()])
        })
        .await
        .context("Model validation task failed")??;
        let dimension = sample.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            anyhow::bail!("Model {} produced an empty embedding", model.model_name);
        }
        model.dimension = dimension;

        info!(
            "ONNX embedding model {} loaded ({} dimensions)",
            model.model_name, model.dimension
        );
        Ok(model)
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Encoding>> {
        texts
            .iter()
            .map(|text| {
                self.tokenizer
                    .encode(text.as_str(), true)
                    .map_err(|e| anyhow!("Tokenization failed: {}", e))
            })
            .collect()
    }

    /// Synchronous inference over one batch
    fn run_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self.encode(texts)?;
        let tensors = pad_encodings(&encodings)?;
        let mask = tensors.attention_mask.clone();

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("ONNX session lock poisoned"))?;

        let outputs = if self.uses_token_type_ids {
            session.run(ort::inputs![
                "input_ids" => Value::from_array(tensors.input_ids)?,
                "attention_mask" => Value::from_array(tensors.attention_mask)?,
                "token_type_ids" => Value::from_array(tensors.token_type_ids)?
            ])?
        } else {
            session.run(ort::inputs![
                "input_ids" => Value::from_array(tensors.input_ids)?,
                "attention_mask" => Value::from_array(tensors.attention_mask)?
            ])?
        };

        // Different exports name their outputs differently; take the first
        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;
        let shape = output.shape().to_vec();

        let mut embeddings = Vec::with_capacity(texts.len());

        match shape.len() {
            // Token embeddings: [batch, seq_len, hidden] -> masked mean pooling
            3 => {
                let hidden_dim = shape[2];
                for batch_idx in 0..texts.len() {
                    let item = output.index_axis(Axis(0), batch_idx);
                    let mut pooled = vec![0.0f32; hidden_dim];
                    let mut sum_mask = 0.0f32;

                    for i in 0..shape[1].min(tensors.max_len) {
                        let mask_value = mask[[batch_idx, i]] as f32;
                        if mask_value == 0.0 {
                            continue;
                        }
                        sum_mask += mask_value;
                        for j in 0..hidden_dim {
                            pooled[j] += item[[i, j]] * mask_value;
                        }
                    }

                    for val in &mut pooled {
                        *val /= sum_mask.max(1e-9);
                    }
                    embeddings.push(pooled);
                }
            }
            // Already pooled: [batch, hidden]
            2 => {
                for batch_idx in 0..texts.len() {
                    let row = output.index_axis(Axis(0), batch_idx);
                    embeddings.push(row.iter().copied().collect());
                }
            }
            _ => anyhow::bail!(
                "Model outputs unexpected dimensions: {:?} (expected [batch, seq_len, hidden])",
                shape
            ),
        }

        if self.normalize {
            for embedding in &mut embeddings {
                l2_normalize(embedding);
            }
        }

        if self.dimension != 0 {
            for (i, emb) in embeddings.iter().enumerate() {
                if emb.len() != self.dimension {
                    anyhow::bail!(
                        "Unexpected embedding dimension at index {}: {} (expected {})",
                        i,
                        emb.len(),
                        self.dimension
                    );
                }
            }
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl TextEmbedder for OnnxEmbeddingModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| anyhow!("Model returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let model = self.clone();
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut all = Vec::with_capacity(texts.len());
            for (i, batch) in texts.chunks(INFERENCE_BATCH_SIZE).enumerate() {
                debug!("Embedding batch {} ({} texts)", i, batch.len());
                all.extend(model.run_batch(batch)?);
            }
            Ok(all)
        })
        .await
        .context("Embedding task failed")?
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
