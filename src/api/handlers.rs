// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::rag::CollectionSummary;

/// Loaded model per component, `None` when it failed to load
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ComponentStatus {
    pub embedder: Option<String>,
    pub reranker: Option<String>,
    pub llm: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub components: ComponentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsResponse {
    pub documents: Vec<CollectionSummary>,
    pub count: usize,
}
