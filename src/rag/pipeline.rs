// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Question answering over one document: retrieve → rerank → generate
//!
//! Each stage takes the [`PipelineState`] produced by the previous one. Once a
//! stage sets an answer (an error or "unanswerable"), later stages pass the
//! state through untouched and make no further external calls.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::collection::RetrievedChunk;
use super::errors::RagError;
use super::store::CollectionStore;
use crate::embeddings::TextEmbedder;
use crate::llm::prompt::UNANSWERABLE;
use crate::llm::{build_answer_prompt, ChatModel, ConversationTurn};
use crate::rerank::Reranker;

pub const RETRIEVAL_FAILED: &str = "Error: Could not retrieve documents from the PDF's database.";
pub const GENERATION_FAILED: &str = "Error: Could not generate answer using LLM.";
pub const BACKEND_NOT_INITIALIZED: &str =
    "Error: Backend services (encoder, LLM, or pipeline) not fully initialized. Cannot process query.";

pub fn not_processed_message(pdf_filename: &str) -> String {
    format!(
        "Error: PDF '{}' not processed. Please upload it first.",
        pdf_filename
    )
}

/// Final answer of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum PipelineAnswer {
    Answered(String),
    Unanswerable,
    /// User-visible error string, always prefixed with "Error: "
    Failed(String),
}

impl PipelineAnswer {
    pub fn text(&self) -> &str {
        match self {
            PipelineAnswer::Answered(text) => text,
            PipelineAnswer::Unanswerable => UNANSWERABLE,
            PipelineAnswer::Failed(message) => message,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, PipelineAnswer::Answered(_))
    }
}

impl fmt::Display for PipelineAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.text())
    }
}

/// State handed from stage to stage
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub pdf_filename: String,
    pub question: String,
    pub history: Vec<ConversationTurn>,
    pub retrieved: Vec<RetrievedChunk>,
    pub top_chunks: Vec<String>,
    pub answer: Option<PipelineAnswer>,
}

impl PipelineState {
    pub fn new(pdf_filename: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            pdf_filename: pdf_filename.into(),
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.history = history;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub pdf_filename: String,
    pub answer: PipelineAnswer,
    pub top_chunks: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    /// Chunks fetched from the collection
    pub retrieve_top_k: usize,
    /// Chunks kept after cross-encoder scoring
    pub rerank_top_n: usize,
    /// Chunks kept when no reranker is available or it fails
    pub fallback_top_n: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            retrieve_top_k: 10,
            rerank_top_n: 20,
            fallback_top_n: 5,
        }
    }
}

pub struct RagPipeline {
    collections: Arc<CollectionStore>,
    embedder: Arc<dyn TextEmbedder>,
    reranker: Option<Arc<dyn Reranker>>,
    llm: Arc<dyn ChatModel>,
    settings: PipelineSettings,
}

impl RagPipeline {
    pub fn new(
        collections: Arc<CollectionStore>,
        embedder: Arc<dyn TextEmbedder>,
        reranker: Option<Arc<dyn Reranker>>,
        llm: Arc<dyn ChatModel>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            collections,
            embedder,
            reranker,
            llm,
            settings,
        }
    }

    /// Answer a single question against one document
    pub async fn run(&self, pdf_filename: &str, question: &str) -> PipelineOutput {
        self.run_state(PipelineState::new(pdf_filename, question)).await
    }

    /// Run all stages over a prepared state
    pub async fn run_state(&self, state: PipelineState) -> PipelineOutput {
        info!(
            "Pipeline run for {}: {:.50}",
            state.pdf_filename, state.question
        );

        let state = self.retrieve(state).await;
        let state = self.rerank(state).await;
        let state = self.generate(state).await;

        PipelineOutput {
            pdf_filename: state.pdf_filename,
            answer: state.answer.unwrap_or(PipelineAnswer::Unanswerable),
            top_chunks: state.top_chunks,
        }
    }

    pub async fn retrieve(&self, mut state: PipelineState) -> PipelineState {
        if state.answer.is_some() {
            return state;
        }

        if !self.collections.exists(&state.pdf_filename).await {
            warn!("No collection for {}", state.pdf_filename);
            state.answer = Some(PipelineAnswer::Failed(not_processed_message(
                &state.pdf_filename,
            )));
            return state;
        }

        match self.search(&state.pdf_filename, &state.question).await {
            Ok(hits) if hits.is_empty() => {
                info!("No chunks retrieved for {}", state.pdf_filename);
                state.answer = Some(PipelineAnswer::Unanswerable);
            }
            Ok(hits) => {
                debug!("Retrieved {} chunks", hits.len());
                state.retrieved = hits;
            }
            Err(RagError::NotProcessed(_)) => {
                state.answer = Some(PipelineAnswer::Failed(not_processed_message(
                    &state.pdf_filename,
                )));
            }
            Err(e) => {
                error!(
                    "Retrieval failed for {} [{}]: {}",
                    state.pdf_filename,
                    e.error_code(),
                    e
                );
                state.answer = Some(PipelineAnswer::Failed(RETRIEVAL_FAILED.to_string()));
            }
        }

        state
    }

    async fn search(&self, pdf_filename: &str, question: &str) -> Result<Vec<RetrievedChunk>, RagError> {
        let collection = self
            .collections
            .load_for_model(pdf_filename, self.embedder.model_name())
            .await?;
        let query = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;
        collection.search(&query, self.settings.retrieve_top_k)
    }

    pub async fn rerank(&self, mut state: PipelineState) -> PipelineState {
        if state.answer.is_some() {
            return state;
        }

        let texts: Vec<String> = state.retrieved.iter().map(|c| c.text.clone()).collect();

        let Some(reranker) = &self.reranker else {
            state.top_chunks = texts
                .into_iter()
                .take(self.settings.fallback_top_n)
                .collect();
            return state;
        };

        match reranker.score(&state.question, &texts).await {
            Ok(scores) if scores.len() == texts.len() => {
                let mut scored: Vec<(f32, String)> = scores.into_iter().zip(texts).collect();
                // Stable sort keeps retrieval order among equal scores
                scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
                state.top_chunks = scored
                    .into_iter()
                    .take(self.settings.rerank_top_n)
                    .map(|(_, text)| text)
                    .collect();
            }
            Ok(scores) => {
                warn!(
                    "Reranker returned {} scores for {} chunks; using retrieval order",
                    scores.len(),
                    texts.len()
                );
                state.top_chunks = texts.into_iter().take(self.settings.fallback_top_n).collect();
            }
            Err(e) => {
                warn!("Reranking failed, using retrieval order: {}", e);
                state.top_chunks = texts.into_iter().take(self.settings.fallback_top_n).collect();
            }
        }

        state
    }

    pub async fn generate(&self, mut state: PipelineState) -> PipelineState {
        if state.answer.is_some() {
            return state;
        }

        if state.top_chunks.is_empty() {
            state.answer = Some(PipelineAnswer::Unanswerable);
            return state;
        }

        let prompt = build_answer_prompt(&state.top_chunks, &state.question, &state.history);

        state.answer = Some(match self.llm.complete(&prompt).await {
            Ok(response) => {
                let answer = response.trim();
                if answer.is_empty() || answer.eq_ignore_ascii_case(UNANSWERABLE) {
                    PipelineAnswer::Unanswerable
                } else {
                    PipelineAnswer::Answered(answer.to_string())
                }
            }
            Err(e) => {
                error!("LLM call to {} failed: {}", self.llm.model_name(), e);
                PipelineAnswer::Failed(GENERATION_FAILED.to_string())
            }
        });

        state
    }
}
