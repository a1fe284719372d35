// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ingestion tests: chunking, embedding, collection persistence and reuse

use crate::common::{
    test_config, test_services, text_pdf, FailingEmbedder, HashEmbedder, MOCK_EMBEDDER,
    SAMPLE_TEXT,
};
use pdf_rag_node::documents::DocumentError;
use pdf_rag_node::rag::{sha256_hex, CollectionStore, RagError};
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_ingest_text_builds_collection() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let services = test_services(&config, Some(Arc::new(HashEmbedder::new())), None, None);
    let ingest = services.ingest_service().unwrap();

    let outcome = ingest
        .ingest_text("paper.pdf", SAMPLE_TEXT, "abc123")
        .await
        .unwrap();

    assert_eq!(outcome.pdf_filename, "paper.pdf");
    assert_eq!(outcome.chunk_count, 3);
    assert!(!outcome.reused);

    let collection = services.collections.load("paper.pdf").await.unwrap();
    assert_eq!(collection.len(), 3);
    assert_eq!(collection.embedding_model, MOCK_EMBEDDER);
    assert_eq!(collection.source_sha256, "abc123");

    // Chunk indices are unique and ids follow them
    let indices: HashSet<usize> = collection.chunks().iter().map(|c| c.chunk_index).collect();
    assert_eq!(indices.len(), 3);
    for chunk in collection.chunks() {
        assert_eq!(chunk.id, format!("chunk_{}", chunk.chunk_index));
        assert!(chunk.text.chars().count() <= config.chunk_size);
    }
}

#[tokio::test]
async fn test_collection_survives_restart() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let services = test_services(&config, Some(Arc::new(HashEmbedder::new())), None, None);
    services
        .ingest_service()
        .unwrap()
        .ingest_text("paper.pdf", SAMPLE_TEXT, "abc123")
        .await
        .unwrap();

    let reopened = CollectionStore::new(&config.vector_store_dir, 2).unwrap();
    let summaries = reopened.list().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].pdf_filename, "paper.pdf");
    assert_eq!(summaries[0].chunk_count, 3);
}

#[tokio::test]
async fn test_empty_text_creates_no_collection() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let services = test_services(&config, Some(Arc::new(HashEmbedder::new())), None, None);

    let result = services
        .ingest_service()
        .unwrap()
        .ingest_text("scanned.pdf", "  \n\n  ", "x")
        .await;

    assert!(matches!(result, Err(RagError::EmptyDocument(_))));
    assert!(!services.collections.exists("scanned.pdf").await);
}

#[tokio::test]
async fn test_embedding_failure_creates_no_collection() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let services = test_services(&config, Some(Arc::new(FailingEmbedder::new())), None, None);

    let result = services
        .ingest_service()
        .unwrap()
        .ingest_text("paper.pdf", SAMPLE_TEXT, "x")
        .await;

    assert!(matches!(result, Err(RagError::Embedding(_))));
    assert!(!services.collections.exists("paper.pdf").await);
    assert!(!config.vector_store_dir.join("paper.pdf_db").exists());
}

#[tokio::test]
async fn test_ingest_pdf_rejects_non_pdf() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let services = test_services(&config, Some(Arc::new(HashEmbedder::new())), None, None);

    let result = services
        .ingest_service()
        .unwrap()
        .ingest_pdf("notes.txt", b"plain text".to_vec())
        .await;

    assert!(matches!(
        result,
        Err(RagError::Document(DocumentError::NotPdf))
    ));
    assert!(!services.documents.exists("notes.txt").await);
}

#[tokio::test]
async fn test_unparsable_pdf_is_stored_but_not_embedded() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let services = test_services(&config, Some(Arc::new(HashEmbedder::new())), None, None);

    let result = services
        .ingest_service()
        .unwrap()
        .ingest_pdf("broken.pdf", b"%PDF-garbage".to_vec())
        .await;

    assert!(matches!(
        result,
        Err(RagError::Document(DocumentError::ParseFailed(_)))
    ));
    assert!(services.documents.exists("broken.pdf").await);
    assert!(!services.collections.exists("broken.pdf").await);
}

#[tokio::test]
async fn test_identical_upload_reuses_collection() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let embedder = Arc::new(HashEmbedder::new());
    let services = test_services(&config, Some(embedder.clone()), None, None);
    let ingest = services.ingest_service().unwrap();

    let bytes = b"%PDF-1.4 identical bytes".to_vec();
    ingest
        .ingest_text("paper.pdf", SAMPLE_TEXT, &sha256_hex(&bytes))
        .await
        .unwrap();
    let calls_before = embedder.calls.load(Ordering::SeqCst);

    // Same bytes: the checksum matches, so neither parsing nor embedding runs
    let outcome = ingest.ingest_pdf("paper.pdf", bytes).await.unwrap();

    assert!(outcome.reused);
    assert_eq!(outcome.chunk_count, 3);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), calls_before);
}

#[tokio::test]
async fn test_reingest_replaces_previous_chunks() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let services = test_services(&config, Some(Arc::new(HashEmbedder::new())), None, None);
    let ingest = services.ingest_service().unwrap();

    ingest
        .ingest_text("paper.pdf", SAMPLE_TEXT, "v1")
        .await
        .unwrap();
    let outcome = ingest
        .ingest_text("paper.pdf", "A much shorter revision.", "v2")
        .await
        .unwrap();

    assert_eq!(outcome.chunk_count, 1);
    let collection = services.collections.load("paper.pdf").await.unwrap();
    assert_eq!(collection.len(), 1);
    assert_eq!(collection.source_sha256, "v2");
    assert_eq!(collection.chunks()[0].text, "A much shorter revision.");
}

#[tokio::test]
async fn test_ingest_pdf_extracts_and_embeds_text() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let services = test_services(&config, Some(Arc::new(HashEmbedder::new())), None, None);

    let bytes = text_pdf(&[
        "The Qasper dataset contains questions about NLP papers.",
        "Annotators wrote 5049 questions over 1585 papers.",
    ]);
    let outcome = services
        .ingest_service()
        .unwrap()
        .ingest_pdf("qasper.pdf", bytes.clone())
        .await
        .unwrap();

    assert!(!outcome.reused);
    assert!(outcome.chunk_count >= 1);

    let collection = services.collections.load("qasper.pdf").await.unwrap();
    assert_eq!(collection.source_sha256, sha256_hex(&bytes));
    let text: String = collection.chunks().iter().map(|c| c.text.as_str()).collect();
    assert!(text.contains("Qasper"));
    assert!(text.contains("5049"));
}

#[tokio::test]
async fn test_failed_reupload_removes_previous_collection() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let services = test_services(&config, Some(Arc::new(HashEmbedder::new())), None, None);
    let ingest = services.ingest_service().unwrap();

    ingest
        .ingest_text("paper.pdf", SAMPLE_TEXT, "v1")
        .await
        .unwrap();
    // Warm the cache so a stale entry would be served from memory
    services.collections.load("paper.pdf").await.unwrap();

    let result = ingest
        .ingest_pdf("paper.pdf", b"%PDF-garbage".to_vec())
        .await;

    assert!(result.is_err());
    assert_eq!(
        services.documents.read("paper.pdf").await.unwrap(),
        b"%PDF-garbage"
    );
    assert!(!services.collections.exists("paper.pdf").await);
    assert!(matches!(
        services.collections.load("paper.pdf").await,
        Err(RagError::NotProcessed(_))
    ));
}

#[tokio::test]
async fn test_failed_reembedding_removes_previous_collection() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let services = test_services(&config, Some(Arc::new(HashEmbedder::new())), None, None);
    services
        .ingest_service()
        .unwrap()
        .ingest_text("paper.pdf", SAMPLE_TEXT, "v1")
        .await
        .unwrap();

    // Same stores, but the embedder now fails
    let failing = test_services(&config, Some(Arc::new(FailingEmbedder::new())), None, None);
    let result = failing
        .ingest_service()
        .unwrap()
        .ingest_text("paper.pdf", "A revised paper.", "v2")
        .await;

    assert!(matches!(result, Err(RagError::Embedding(_))));
    assert!(!config.vector_store_dir.join("paper.pdf_db").exists());
}
