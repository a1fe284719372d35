// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::rag::IngestOutcome;

/// Successful upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    pub message: String,
    pub pdf_filename: String,
    pub chunk_count: usize,
    /// True when an identical upload was already processed
    pub reused: bool,
}

impl From<IngestOutcome> for UploadResponse {
    fn from(outcome: IngestOutcome) -> Self {
        Self {
            message: format!(
                "PDF '{}' uploaded and processed successfully.",
                outcome.pdf_filename
            ),
            pdf_filename: outcome.pdf_filename,
            chunk_count: outcome.chunk_count,
            reused: outcome.reused,
        }
    }
}

/// Failed upload, `{"error": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadErrorResponse {
    pub error: String,
}

impl UploadErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
