// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for document ingestion and collection storage

use thiserror::Error;

use crate::documents::DocumentError;

/// Errors that can occur while building, storing or searching collections
#[derive(Error, Debug)]
pub enum RagError {
    /// No collection exists for this document
    #[error("PDF '{0}' not processed. Please upload it first.")]
    NotProcessed(String),

    /// Collection was embedded with a different model than the active one
    #[error("Collection for '{filename}' was built with {stored}, active model is {active}")]
    ModelMismatch {
        filename: String,
        stored: String,
        active: String,
    },

    /// Document produced no text or no chunks
    #[error("No text could be extracted from '{0}'")]
    EmptyDocument(String),

    /// Number of embeddings does not match number of chunks
    #[error("Embedding count mismatch: {chunks} chunks, {embeddings} embeddings")]
    EmbeddingCountMismatch { chunks: usize, embeddings: usize },

    /// Vector dimensions are not uniform
    #[error("Dimension mismatch at chunk {chunk_index}: expected {expected}D, got {actual}D")]
    DimensionMismatch {
        chunk_index: usize,
        expected: usize,
        actual: usize,
    },

    /// Vector contains NaN or Infinity
    #[error("Chunk {0} has a non-finite embedding value")]
    NonFiniteEmbedding(usize),

    /// Two chunks share an index
    #[error("Duplicate chunk index {0}")]
    DuplicateChunkIndex(usize),

    /// Embedding backend failed
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// Collection file could not be encoded or decoded
    #[error("Collection serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unexpected error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Other(err.to_string())
    }
}

impl From<bincode::Error> for RagError {
    fn from(err: bincode::Error) -> Self {
        RagError::Serialization(err.to_string())
    }
}

impl RagError {
    /// Get user-friendly error message for API responses
    pub fn user_message(&self) -> String {
        match self {
            RagError::NotProcessed(filename) => {
                format!("PDF '{}' not processed. Please upload it first.", filename)
            }
            RagError::ModelMismatch { filename, .. } => format!(
                "PDF '{}' was processed with a different embedding model. Please upload it again.",
                filename
            ),
            RagError::EmptyDocument(filename) => {
                format!("Failed to process PDF '{}': no text could be extracted.", filename)
            }
            RagError::Document(DocumentError::NotPdf) => {
                "Invalid file type. Only PDF files are accepted.".to_string()
            }
            RagError::Document(DocumentError::ParseFailed(_)) => {
                "Failed to process PDF: the file could not be parsed.".to_string()
            }
            RagError::Embedding(_) => "Failed to embed document chunks.".to_string(),
            _ => self.to_string(),
        }
    }

    /// Get error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            RagError::NotProcessed(_) => "NOT_PROCESSED",
            RagError::ModelMismatch { .. } => "MODEL_MISMATCH",
            RagError::EmptyDocument(_) => "EMPTY_DOCUMENT",
            RagError::EmbeddingCountMismatch { .. } => "EMBEDDING_COUNT_MISMATCH",
            RagError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            RagError::NonFiniteEmbedding(_) => "NON_FINITE_EMBEDDING",
            RagError::DuplicateChunkIndex(_) => "DUPLICATE_CHUNK_INDEX",
            RagError::Embedding(_) => "EMBEDDING_FAILED",
            RagError::Serialization(_) => "SERIALIZATION_ERROR",
            RagError::Document(_) => "DOCUMENT_ERROR",
            RagError::IoError(_) => "IO_ERROR",
            RagError::Other(_) => "OTHER",
        }
    }

    /// True when the client sent something unusable rather than the server failing
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RagError::Document(DocumentError::NotPdf)
                | RagError::Document(DocumentError::InvalidFilename(_))
        )
    }
}
