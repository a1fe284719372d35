// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

/// Response body for POST /process_query
///
/// `ai_answer` is the generated answer, "unanswerable", or an "Error: ..." string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    pub ai_answer: String,
}
