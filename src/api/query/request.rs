// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::documents::sanitize_filename;

/// Request body for POST /process_query
///
/// ```json
/// { "pdf_filename": "paper.pdf", "question": "Which dataset is used?" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub pdf_filename: String,
    pub question: String,
}

impl QueryRequest {
    /// Validates the request and returns the sanitized filename
    pub fn validate(&self) -> Result<String, ApiError> {
        if self.question.trim().is_empty() {
            return Err(ApiError::ValidationError {
                field: "question".to_string(),
                message: "question cannot be empty or contain only whitespace".to_string(),
            });
        }

        sanitize_filename(&self.pdf_filename).map_err(|e| ApiError::ValidationError {
            field: "pdf_filename".to_string(),
            message: e.to_string(),
        })
    }
}
