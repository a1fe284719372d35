// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Wiring of stores and model backends shared by the server and the CLI

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{EmbeddingBackend, RagConfig};
use crate::documents::{DocumentStore, RecursiveCharacterSplitter};
use crate::embeddings::{GeminiEmbedder, OnnxEmbeddingModel, TextEmbedder};
use crate::llm::{ChatModel, GeminiChatModel};
use crate::rag::{CollectionStore, IngestService, PipelineSettings, RagPipeline};
use crate::rerank::{OnnxCrossEncoder, Reranker};

/// Loaded components. Model backends are optional so the server can start
/// and report which ones are missing.
#[derive(Clone)]
pub struct RagServices {
    pub documents: Arc<DocumentStore>,
    pub collections: Arc<CollectionStore>,
    pub embedder: Option<Arc<dyn TextEmbedder>>,
    pub reranker: Option<Arc<dyn Reranker>>,
    pub llm: Option<Arc<dyn ChatModel>>,
    splitter: RecursiveCharacterSplitter,
    settings: PipelineSettings,
}

impl RagServices {
    /// Assemble services from already-constructed backends
    pub fn new(
        config: &RagConfig,
        embedder: Option<Arc<dyn TextEmbedder>>,
        reranker: Option<Arc<dyn Reranker>>,
        llm: Option<Arc<dyn ChatModel>>,
    ) -> Result<Self> {
        let documents = DocumentStore::new(&config.upload_dir).with_context(|| {
            format!(
                "Failed to create upload directory {}",
                config.upload_dir.display()
            )
        })?;
        let collections =
            CollectionStore::new(&config.vector_store_dir, config.collection_cache_size)
                .with_context(|| {
                    format!(
                        "Failed to create vector store directory {}",
                        config.vector_store_dir.display()
                    )
                })?;
        let splitter = RecursiveCharacterSplitter::new(config.chunk_size, config.chunk_overlap)
            .map_err(|e| anyhow!(e))?;

        Ok(Self {
            documents: Arc::new(documents),
            collections: Arc::new(collections),
            embedder,
            reranker,
            llm,
            splitter,
            settings: PipelineSettings {
                retrieve_top_k: config.retrieve_top_k,
                rerank_top_n: config.rerank_top_n,
                fallback_top_n: config.fallback_top_n,
            },
        })
    }

    /// Load every backend named by the configuration.
    ///
    /// Storage failures are fatal. Model failures are logged and leave the
    /// component unset.
    pub async fn from_config(config: &RagConfig) -> Result<Self> {
        let embedder = match load_embedder(config).await {
            Ok(embedder) => {
                info!(
                    "Embedding model ready: {} ({}D)",
                    embedder.model_name(),
                    embedder.dimension()
                );
                Some(embedder)
            }
            Err(e) => {
                error!("Failed to load embedding model: {:#}", e);
                None
            }
        };

        let reranker = match load_reranker(config).await {
            Ok(reranker) => {
                info!("Reranker ready: {}", reranker.model_name());
                Some(reranker)
            }
            Err(e) => {
                warn!("Reranker unavailable, continuing without it: {:#}", e);
                None
            }
        };

        let llm = match load_llm(config) {
            Ok(llm) => {
                info!("LLM ready: {}", llm.model_name());
                Some(llm)
            }
            Err(e) => {
                error!("Failed to initialize LLM: {:#}", e);
                None
            }
        };

        Self::new(config, embedder, reranker, llm)
    }

    /// Ingestion needs an embedder
    pub fn ingest_service(&self) -> Option<IngestService> {
        let embedder = self.embedder.clone()?;
        Some(IngestService::new(
            self.documents.clone(),
            self.collections.clone(),
            embedder,
            self.splitter.clone(),
        ))
    }

    /// Querying needs an embedder and an LLM; the reranker is optional
    pub fn pipeline(&self) -> Option<RagPipeline> {
        let embedder = self.embedder.clone()?;
        let llm = self.llm.clone()?;
        Some(RagPipeline::new(
            self.collections.clone(),
            embedder,
            self.reranker.clone(),
            llm,
            self.settings,
        ))
    }
}

async fn load_embedder(config: &RagConfig) -> Result<Arc<dyn TextEmbedder>> {
    match config.embedding_backend {
        EmbeddingBackend::Onnx => {
            let paths = &config.embedding_model;
            let model =
                OnnxEmbeddingModel::new(paths.name.clone(), &paths.model_path, &paths.tokenizer_path)
                    .await?;
            Ok(Arc::new(model))
        }
        EmbeddingBackend::Gemini => {
            let api_key = config
                .google_api_key
                .clone()
                .ok_or_else(|| anyhow!("GOOGLE_API_KEY is required for the gemini embedding backend"))?;
            let embedder = GeminiEmbedder::new(
                api_key,
                &config.gemini_embedding_model,
                config.request_timeout,
            )
            .await?;
            Ok(Arc::new(embedder))
        }
    }
}

async fn load_reranker(config: &RagConfig) -> Result<Arc<dyn Reranker>> {
    let paths = &config.reranker_model;
    let encoder =
        OnnxCrossEncoder::new(paths.name.clone(), &paths.model_path, &paths.tokenizer_path).await?;
    Ok(Arc::new(encoder))
}

fn load_llm(config: &RagConfig) -> Result<Arc<dyn ChatModel>> {
    let api_key = config
        .google_api_key
        .clone()
        .ok_or_else(|| anyhow!("GOOGLE_API_KEY is not set"))?;
    let model = GeminiChatModel::new(
        api_key,
        config.gemini_model.clone(),
        config.llm_temperature,
        config.request_timeout,
    )?;
    Ok(Arc::new(model))
}
