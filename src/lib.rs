// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod documents;
pub mod embeddings;
pub mod llm;
pub mod rag;
pub mod rerank;
pub mod services;
pub mod vector;
pub mod version;

pub use config::RagConfig;
pub use rag::{PipelineAnswer, PipelineOutput, RagPipeline};
pub use services::RagServices;
