// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use pdf_rag_node::documents::{DocumentError, DocumentStore};
use tempfile::TempDir;

#[tokio::test]
async fn test_reupload_overwrites_previous_bytes() {
    let dir = TempDir::new().unwrap();
    let store = DocumentStore::new(dir.path().join("uploads")).unwrap();

    store.save("paper.pdf", b"first").await.unwrap();
    let path = store.save("paper.pdf", b"second version").await.unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"second version");
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_traversal_names_are_confined_to_root() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("uploads");
    let store = DocumentStore::new(&root).unwrap();

    let path = store.save("../../escape.pdf", b"%PDF").await.unwrap();

    assert_eq!(path, root.join("escape.pdf"));
    assert!(!dir.path().join("escape.pdf").exists());
}

#[tokio::test]
async fn test_empty_name_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = DocumentStore::new(dir.path()).unwrap();

    let result = store.save("   ", b"%PDF").await;
    assert!(matches!(result, Err(DocumentError::InvalidFilename(_))));
}
