// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /upload_pdf handler

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::Multipart;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{UploadErrorResponse, UploadResponse};
use crate::api::http_server::AppState;
use crate::documents::{is_pdf_filename, sanitize_filename, DocumentError};
use crate::rag::RagError;

const FILE_FIELD: &str = "file";

fn upload_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(UploadErrorResponse::new(message))).into_response()
}

/// Accepts a multipart upload and runs ingestion for it.
///
/// # Responses
/// - 200 `{"message", "pdf_filename", "chunk_count", "reused"}`
/// - 400 `{"error"}` for a missing file or a non-PDF filename
/// - 503 `{"error"}` when no embedding model is loaded
/// - 500 `{"error"}` when saving or processing fails
pub async fn upload_pdf_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let mut upload: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed multipart upload: {}", e);
                return upload_error(e.status(), format!("Invalid upload: {}", e.body_text()));
            }
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(bytes) => upload = Some((filename, bytes.to_vec())),
            Err(e) => {
                warn!("Failed to read uploaded file: {}", e);
                return upload_error(e.status(), format!("Invalid upload: {}", e.body_text()));
            }
        }
        break;
    }

    let Some((raw_filename, bytes)) = upload else {
        return upload_error(StatusCode::BAD_REQUEST, "No file uploaded.");
    };

    let filename = match sanitize_filename(&raw_filename) {
        Ok(name) if is_pdf_filename(&name) => name,
        _ => {
            info!("Rejected upload with filename {:?}", raw_filename);
            return upload_error(StatusCode::BAD_REQUEST, DocumentError::NotPdf.to_string());
        }
    };

    let Some(ingest) = state.ingest.clone() else {
        error!("Upload of {} rejected: embedding model not initialized", filename);
        return upload_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Embedding model not initialized. Cannot process uploads.",
        );
    };

    info!("Received upload {} ({} bytes)", filename, bytes.len());

    match ingest.ingest_pdf(&filename, bytes).await {
        Ok(outcome) => {
            info!(
                "Processed {}: {} chunks (reused: {})",
                outcome.pdf_filename, outcome.chunk_count, outcome.reused
            );
            (StatusCode::OK, Json(UploadResponse::from(outcome))).into_response()
        }
        Err(RagError::Document(DocumentError::Io(e))) => {
            error!("Failed to save {}: {}", filename, e);
            upload_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to save uploaded file: {}", e),
            )
        }
        Err(e) if e.is_client_error() => upload_error(StatusCode::BAD_REQUEST, e.user_message()),
        Err(e) => {
            error!(
                "Failed to process {} [{}]: {}",
                filename,
                e.error_code(),
                e
            );
            upload_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to process PDF '{}'. Check server logs.", filename),
            )
        }
    }
}
