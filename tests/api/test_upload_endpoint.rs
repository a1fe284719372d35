// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /upload_pdf tests

use crate::common::{test_config, test_services, text_pdf, HashEmbedder, RecordingLlm};
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
};
use pdf_rag_node::api::{
    create_app, AppState, QueryResponse, UploadErrorResponse, UploadResponse,
};
use pdf_rag_node::config::RagConfig;
use pdf_rag_node::rag::sha256_hex;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

const BOUNDARY: &str = "X-PDF-RAG-BOUNDARY";

fn multipart_upload(uri: &str, field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn state_with_embedder(config: &RagConfig) -> AppState {
    let services = test_services(config, Some(Arc::new(HashEmbedder::new())), None, None);
    AppState::new(config.clone(), services)
}

#[tokio::test]
async fn test_non_pdf_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let app = create_app(Arc::new(state_with_embedder(&config)));

    let response = app
        .oneshot(multipart_upload("/upload_pdf/", "file", "notes.txt", b"hello"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: UploadErrorResponse = json_body(response).await;
    assert_eq!(body.error, "Invalid file type. Only PDF files are accepted.");
    assert!(!config.upload_dir.join("notes.txt").exists());
}

#[tokio::test]
async fn test_missing_file_field_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let app = create_app(Arc::new(state_with_embedder(&config)));

    let response = app
        .oneshot(multipart_upload("/upload_pdf", "document", "paper.pdf", b"%PDF"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: UploadErrorResponse = json_body(response).await;
    assert_eq!(body.error, "No file uploaded.");
}

#[tokio::test]
async fn test_unparsable_pdf_is_500_and_leaves_no_collection() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let state = state_with_embedder(&config);
    let collections = state.collections.clone();
    let app = create_app(Arc::new(state));

    let response = app
        .oneshot(multipart_upload("/upload_pdf", "file", "broken.pdf", b"%PDF-garbage"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: UploadErrorResponse = json_body(response).await;
    assert_eq!(body.error, "Failed to process PDF 'broken.pdf'. Check server logs.");
    assert!(config.upload_dir.join("broken.pdf").exists());
    assert!(!collections.exists("broken.pdf").await);
}

#[tokio::test]
async fn test_upload_without_embedder_is_503() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let services = test_services(&config, None, None, None);
    let app = create_app(Arc::new(AppState::new(config, services)));

    let response = app
        .oneshot(multipart_upload("/upload_pdf", "file", "paper.pdf", b"%PDF-1.4"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_reupload_of_processed_bytes_is_reused() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let state = state_with_embedder(&config);

    let bytes = b"%PDF-1.4 already processed".to_vec();
    state
        .ingest
        .as_ref()
        .unwrap()
        .ingest_text("paper.pdf", "Previously extracted text.", &sha256_hex(&bytes))
        .await
        .unwrap();

    let app = create_app(Arc::new(state));
    let response = app
        .oneshot(multipart_upload("/upload_pdf", "file", "paper.pdf", &bytes))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: UploadResponse = json_body(response).await;
    assert_eq!(
        body.message,
        "PDF 'paper.pdf' uploaded and processed successfully."
    );
    assert_eq!(body.pdf_filename, "paper.pdf");
    assert_eq!(body.chunk_count, 1);
    assert!(body.reused);
}

#[tokio::test]
async fn test_path_components_are_stripped() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let app = create_app(Arc::new(state_with_embedder(&config)));

    let response = app
        .oneshot(multipart_upload(
            "/upload_pdf",
            "file",
            "../../outside.pdf",
            b"%PDF-garbage",
        ))
        .await
        .unwrap();

    // Parsing fails, but the file must land inside the upload directory
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(config.upload_dir.join("outside.pdf").exists());
    assert!(!dir.path().join("outside.pdf").exists());
}

#[tokio::test]
async fn test_uploaded_pdf_can_be_queried() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let llm = Arc::new(RecordingLlm::replying("5049 questions."));
    let services = test_services(
        &config,
        Some(Arc::new(HashEmbedder::new())),
        None,
        Some(llm.clone()),
    );
    let app = create_app(Arc::new(AppState::new(config, services)));

    let pdf = text_pdf(&[
        "The Qasper dataset contains questions about NLP papers.",
        "Annotators wrote 5049 questions over 1585 papers.",
    ]);
    let response = app
        .clone()
        .oneshot(multipart_upload("/upload_pdf/", "file", "qasper.pdf", &pdf))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: UploadResponse = json_body(response).await;
    assert_eq!(body.pdf_filename, "qasper.pdf");
    assert!(body.chunk_count >= 1);
    assert!(!body.reused);

    let query = serde_json::json!({
        "pdf_filename": "qasper.pdf",
        "question": "How many questions did annotators write?"
    });
    let request = Request::builder()
        .method(Method::POST)
        .uri("/process_query")
        .header("content-type", "application/json")
        .body(Body::from(query.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: QueryResponse = json_body(response).await;
    assert_eq!(body.ai_answer, "5049 questions.");
    assert!(llm.last_prompt().unwrap().contains("Annotators wrote 5049 questions"));
}
