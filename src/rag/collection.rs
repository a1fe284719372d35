// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-document vector collection
//!
//! One collection holds every chunk of one uploaded PDF together with its
//! embedding. Collections are validated on construction and on load:
//! - one embedding per chunk, all of the same dimension
//! - every value finite (NaN would poison similarity ranking)
//! - chunk indices unique within the collection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::errors::RagError;
use crate::vector::embeddings::{cosine_similarity, Embedding};

/// A chunk of document text and its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Stable id, `chunk_{index}`
    pub id: String,
    pub chunk_index: usize,
    pub text: String,
    pub embedding: Embedding,
}

/// A search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedChunk {
    pub text: String,
    pub chunk_index: usize,
    pub score: f32,
}

/// Listing entry for a stored collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub pdf_filename: String,
    pub embedding_model: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentCollection {
    pub pdf_filename: String,
    pub embedding_model: String,
    pub dimension: usize,
    /// Hex SHA-256 of the uploaded bytes
    pub source_sha256: String,
    pub created_at: DateTime<Utc>,
    chunks: Vec<StoredChunk>,
}

pub fn chunk_id(index: usize) -> String {
    format!("chunk_{}", index)
}

impl DocumentCollection {
    /// Build a collection from chunk texts and their embeddings, in order
    pub fn build(
        pdf_filename: impl Into<String>,
        embedding_model: impl Into<String>,
        source_sha256: impl Into<String>,
        texts: Vec<String>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self, RagError> {
        if texts.len() != embeddings.len() {
            return Err(RagError::EmbeddingCountMismatch {
                chunks: texts.len(),
                embeddings: embeddings.len(),
            });
        }

        let chunks = texts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (text, vector))| StoredChunk {
                id: chunk_id(i),
                chunk_index: i,
                text,
                embedding: Embedding::new(vector),
            })
            .collect();

        Self::from_chunks(pdf_filename, embedding_model, source_sha256, chunks)
    }

    pub fn from_chunks(
        pdf_filename: impl Into<String>,
        embedding_model: impl Into<String>,
        source_sha256: impl Into<String>,
        chunks: Vec<StoredChunk>,
    ) -> Result<Self, RagError> {
        let pdf_filename = pdf_filename.into();
        if chunks.is_empty() {
            return Err(RagError::EmptyDocument(pdf_filename));
        }

        let collection = Self {
            dimension: chunks[0].embedding.dimension(),
            pdf_filename,
            embedding_model: embedding_model.into(),
            source_sha256: source_sha256.into(),
            created_at: Utc::now(),
            chunks,
        };
        collection.validate()?;
        Ok(collection)
    }

    /// Check the collection invariants
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunks.is_empty() {
            return Err(RagError::EmptyDocument(self.pdf_filename.clone()));
        }

        let mut seen = HashSet::with_capacity(self.chunks.len());
        for chunk in &self.chunks {
            if chunk.embedding.dimension() != self.dimension {
                return Err(RagError::DimensionMismatch {
                    chunk_index: chunk.chunk_index,
                    expected: self.dimension,
                    actual: chunk.embedding.dimension(),
                });
            }
            if !chunk.embedding.is_finite() {
                return Err(RagError::NonFiniteEmbedding(chunk.chunk_index));
            }
            if !seen.insert(chunk.chunk_index) {
                return Err(RagError::DuplicateChunkIndex(chunk.chunk_index));
            }
        }
        Ok(())
    }

    pub fn chunks(&self) -> &[StoredChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn summary(&self) -> CollectionSummary {
        CollectionSummary {
            pdf_filename: self.pdf_filename.clone(),
            embedding_model: self.embedding_model.clone(),
            dimension: self.dimension,
            chunk_count: self.chunks.len(),
            created_at: self.created_at,
        }
    }

    /// Top-k chunks by cosine similarity, highest first.
    ///
    /// Ties keep chunk order so results are deterministic.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>, RagError> {
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                chunk_index: 0,
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut results: Vec<RetrievedChunk> = self
            .chunks
            .iter()
            .map(|chunk| RetrievedChunk {
                text: chunk.text.clone(),
                chunk_index: chunk.chunk_index,
                score: cosine_similarity(query, chunk.embedding.data()),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        results.truncate(k);

        Ok(results)
    }
}
