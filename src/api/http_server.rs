// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{DefaultBodyLimit, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{ComponentStatus, DocumentsResponse, HealthResponse};
use super::query::process_query_handler;
use super::upload::upload_pdf_handler;
use super::ApiError;
use crate::config::RagConfig;
use crate::rag::{CollectionStore, IngestService, RagPipeline};
use crate::services::RagServices;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RagConfig>,
    pub collections: Arc<CollectionStore>,
    /// None when no embedding model is loaded
    pub ingest: Option<Arc<IngestService>>,
    /// None when the embedding model or the LLM is missing
    pub pipeline: Option<Arc<RagPipeline>>,
    pub components: ComponentStatus,
}

impl AppState {
    pub fn new(config: RagConfig, services: RagServices) -> Self {
        let components = ComponentStatus {
            embedder: services.embedder.as_ref().map(|e| e.model_name().to_string()),
            reranker: services.reranker.as_ref().map(|r| r.model_name().to_string()),
            llm: services.llm.as_ref().map(|l| l.model_name().to_string()),
        };

        Self {
            config: Arc::new(config),
            collections: services.collections.clone(),
            ingest: services.ingest_service().map(Arc::new),
            pipeline: services.pipeline().map(Arc::new),
            components,
        }
    }
}

/// Build the router with all routes and layers
pub fn create_app(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .route("/documents", get(documents_handler))
        .route("/upload_pdf", post(upload_pdf_handler))
        .route("/upload_pdf/", post(upload_pdf_handler))
        .route("/process_query", post(process_query_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.listen_addr.clone();
    let app = create_app(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ready = state.pipeline.is_some() && state.ingest.is_some();
    Json(HealthResponse {
        status: if ready { "ok" } else { "degraded" }.to_string(),
        version: crate::version::VERSION.to_string(),
        components: state.components.clone(),
    })
}

async fn documents_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DocumentsResponse>, ApiError> {
    let documents = state.collections.list().await?;
    Ok(Json(DocumentsResponse {
        count: documents.len(),
        documents,
    }))
}
