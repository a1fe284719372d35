// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use pdf_rag_node::{
    api::{start_server, AppState},
    config::RagConfig,
    services::RagServices,
};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting PDF RAG Node...\n");
    println!("📦 BUILD VERSION: {}", pdf_rag_node::version::VERSION);
    println!("📅 Build Date: {}", pdf_rag_node::version::BUILD_DATE);
    println!();

    let config = RagConfig::from_env();
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    if !config.has_api_key() {
        return Err(anyhow!(
            "GOOGLE_API_KEY not found in environment variables. Please set it in a .env file."
        ));
    }

    println!("📂 Upload directory:       {}", config.upload_dir.display());
    println!("🗄️  Vector store directory: {}", config.vector_store_dir.display());
    println!(
        "✂️  Chunking:               {} chars, {} overlap",
        config.chunk_size, config.chunk_overlap
    );
    println!();

    println!("🧠 Loading models...");
    let services = RagServices::from_config(&config).await?;

    let state = AppState::new(config, services);
    if state.pipeline.is_none() {
        tracing::warn!("Backend services not fully initialized; queries will return an error");
    }

    println!("✅ Listening on {}", state.config.listen_addr);
    start_server(state).await
}
