// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ms-marco cross-encoder on ONNX Runtime
//!
//! Each (query, document) pair is encoded as a single sequence with segment
//! ids and the model emits one relevance logit per pair.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{Encoding, Tokenizer};
use tracing::{debug, info};

use super::Reranker;
use crate::embeddings::onnx_model::{build_session, has_input, load_tokenizer, pad_encodings};

/// BERT-style cross-encoders accept at most 512 positions
const MAX_PAIR_LENGTH: usize = 512;

const PAIRS_PER_RUN: usize = 16;

#[derive(Clone)]
pub struct OnnxCrossEncoder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    uses_token_type_ids: bool,
}

impl std::fmt::Debug for OnnxCrossEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxCrossEncoder")
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}

impl OnnxCrossEncoder {
    pub async fn new<P: AsRef<Path>>(
        model_name: impl Into<String>,
        model_path: P,
        tokenizer_path: P,
    ) -> Result<Self> {
        let model_name = model_name.into();
        let model_path = model_path.as_ref().to_path_buf();
        let tokenizer_path = tokenizer_path.as_ref().to_path_buf();

        if !model_path.exists() {
            anyhow::bail!("Reranker model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Reranker tokenizer file not found: {}",
                tokenizer_path.display()
            );
        }

        let (session, tokenizer) = tokio::task::spawn_blocking(move || -> Result<_> {
            let session = build_session(&model_path)?;
            let tokenizer = load_tokenizer(&tokenizer_path, MAX_PAIR_LENGTH)?;
            Ok((session, tokenizer))
        })
        .await
        .context("Reranker loading task failed")??;

        let uses_token_type_ids = has_input(&session, "token_type_ids");
        info!("Cross-encoder {} loaded", model_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            uses_token_type_ids,
        })
    }

    fn encode_pairs(&self, query: &str, documents: &[String]) -> Result<Vec<Encoding>> {
        documents
            .iter()
            .map(|doc| {
                self.tokenizer
                    .encode((query, doc.as_str()), true)
                    .map_err(|e| anyhow!("Tokenization failed: {}", e))
            })
            .collect()
    }

    fn run_pairs(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        let encodings = self.encode_pairs(query, documents)?;
        let tensors = pad_encodings(&encodings)?;

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

        let logits = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract logits")?;
        let shape = logits.shape().to_vec();

        let scores = match shape.as_slice() {
            [batch, _] if *batch == documents.len() => {
                (0..*batch).map(|i| logits[[i, 0]]).collect()
            }
            [batch] if *batch == documents.len() => (0..*batch).map(|i| logits[[i]]).collect(),
            _ => anyhow::bail!("Unexpected cross-encoder output shape: {:?}", shape),
        };

        Ok(scores)
    }
}

#[async_trait]
impl Reranker for OnnxCrossEncoder {
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let encoder = self.clone();
        let query = query.to_string();
        let documents = documents.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut scores = Vec::with_capacity(documents.len());
            for batch in documents.chunks(PAIRS_PER_RUN) {
                scores.extend(encoder.run_pairs(&query, batch)?);
            }
            debug!("Scored {} pairs", scores.len());
            Ok(scores)
        })
        .await
        .context("Reranking task failed")?
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
