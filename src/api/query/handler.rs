// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /process_query handler

use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::{error, info};

use super::{QueryRequest, QueryResponse};
use crate::api::http_server::AppState;
use crate::api::ApiError;
use crate::rag::BACKEND_NOT_INITIALIZED;

/// Pipeline outcomes, including pipeline errors, are returned as 200 with the
/// message in `ai_answer`. Only malformed requests produce an error status.
pub async fn process_query_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let pdf_filename = request.validate()?;

    info!(
        "Received query for PDF: {}, Question: {:.50}",
        pdf_filename, request.question
    );

    let Some(pipeline) = state.pipeline.clone() else {
        error!("Query rejected: backend components not initialized");
        return Ok(Json(QueryResponse {
            ai_answer: BACKEND_NOT_INITIALIZED.to_string(),
        }));
    };

    let output = pipeline.run(&pdf_filename, request.question.trim()).await;
    info!(
        "Answer for {} ({} context chunks): {:.80}",
        output.pdf_filename,
        output.top_chunks.len(),
        output.answer
    );

    Ok(Json(QueryResponse {
        ai_answer: output.answer.to_string(),
    }))
}
