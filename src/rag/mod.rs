// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// RAG (Retrieval-Augmented Generation) module
// Per-document vector collections, ingestion and the question-answering pipeline

pub mod collection;
pub mod errors;
pub mod ingest;
pub mod pipeline;
pub mod store;

pub use collection::{CollectionSummary, DocumentCollection, RetrievedChunk, StoredChunk};
pub use errors::RagError;
pub use ingest::{sha256_hex, IngestOutcome, IngestService};
pub use pipeline::{
    PipelineAnswer, PipelineOutput, PipelineSettings, PipelineState, RagPipeline,
    BACKEND_NOT_INITIALIZED, GENERATION_FAILED, RETRIEVAL_FAILED,
};
pub use store::CollectionStore;
