// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload → parse → chunk → embed → store

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::collection::DocumentCollection;
use super::errors::RagError;
use super::store::CollectionStore;
use crate::documents::{
    extract_pdf_text, is_pdf_filename, sanitize_filename, DocumentError, DocumentStore,
    RecursiveCharacterSplitter,
};
use crate::embeddings::TextEmbedder;

/// Result of ingesting one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub pdf_filename: String,
    pub chunk_count: usize,
    /// True when an identical upload was already embedded and nothing was recomputed
    pub reused: bool,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub struct IngestService {
    documents: Arc<DocumentStore>,
    collections: Arc<CollectionStore>,
    embedder: Arc<dyn TextEmbedder>,
    splitter: RecursiveCharacterSplitter,
}

impl IngestService {
    pub fn new(
        documents: Arc<DocumentStore>,
        collections: Arc<CollectionStore>,
        embedder: Arc<dyn TextEmbedder>,
        splitter: RecursiveCharacterSplitter,
    ) -> Self {
        Self {
            documents,
            collections,
            embedder,
            splitter,
        }
    }

    /// Store an uploaded PDF and build its collection.
    ///
    /// The collection is only written once every chunk has been embedded. If
    /// ingestion fails after the new bytes are stored, any collection built
    /// from an earlier upload under the same name is removed.
    pub async fn ingest_pdf(&self, filename: &str, bytes: Vec<u8>) -> Result<IngestOutcome, RagError> {
        let filename = sanitize_filename(filename)?;
        if !is_pdf_filename(&filename) {
            return Err(DocumentError::NotPdf.into());
        }

        let checksum = sha256_hex(&bytes);
        self.documents.save(&filename, &bytes).await?;

        if let Some(outcome) = self.reusable(&filename, &checksum).await {
            info!("{} unchanged since last upload, reusing collection", filename);
            return Ok(outcome);
        }

        let text = match extract_pdf_text(bytes).await {
            Ok(text) => text,
            Err(e) => {
                self.discard_stale(&filename).await;
                return Err(e.into());
            }
        };
        debug!("Extracted {} characters from {}", text.len(), filename);

        self.ingest_text(&filename, &text, &checksum).await
    }

    /// Chunk, embed and store already-extracted text.
    ///
    /// On failure no collection is left for `filename`.
    pub async fn ingest_text(
        &self,
        filename: &str,
        text: &str,
        checksum: &str,
    ) -> Result<IngestOutcome, RagError> {
        let filename = sanitize_filename(filename)?;

        let result = self.build_and_save(&filename, text, checksum).await;
        if result.is_err() {
            self.discard_stale(&filename).await;
        }
        result
    }

    async fn build_and_save(
        &self,
        filename: &str,
        text: &str,
        checksum: &str,
    ) -> Result<IngestOutcome, RagError> {
        let filename = filename.to_string();

        if text.trim().is_empty() {
            return Err(RagError::EmptyDocument(filename));
        }

        let chunks = self.splitter.split_text(text);
        if chunks.is_empty() {
            return Err(RagError::EmptyDocument(filename));
        }
        info!("Split {} into {} chunks", filename, chunks.len());

        let embeddings = self
            .embedder
            .embed_batch(&chunks)
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        let chunk_count = chunks.len();
        let collection = DocumentCollection::build(
            filename.clone(),
            self.embedder.model_name(),
            checksum,
            chunks,
            embeddings,
        )?;
        self.collections.save(collection).await?;

        Ok(IngestOutcome {
            pdf_filename: filename,
            chunk_count,
            reused: false,
        })
    }

    async fn discard_stale(&self, filename: &str) {
        match self.collections.delete(filename).await {
            Ok(true) => info!("Removed stale collection for {}", filename),
            Ok(false) => {}
            Err(e) => warn!("Failed to remove stale collection for {}: {}", filename, e),
        }
    }

    async fn reusable(&self, filename: &str, checksum: &str) -> Option<IngestOutcome> {
        let collection = self
            .collections
            .load_for_model(filename, self.embedder.model_name())
            .await
            .ok()?;

        (collection.source_sha256 == checksum).then(|| IngestOutcome {
            pdf_filename: filename.to_string(),
            chunk_count: collection.len(),
            reused: true,
        })
    }
}
