// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::config::RagConfig;
use crate::rag::CollectionStore;

/// Arguments for the ingest command
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Store under this filename instead of the file's own name
    #[arg(long)]
    pub name: Option<String>,
}

/// Ingest a local PDF
pub async fn ingest(config: &RagConfig, args: IngestArgs) -> Result<()> {
    let filename = match args.name {
        Some(name) => name,
        None => args
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Cannot determine filename of {}", args.path.display()))?,
    };

    let bytes = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("Failed to read {}", args.path.display()))?;

    let services = super::load_services(config).await?;
    let ingest = services
        .ingest_service()
        .ok_or_else(|| anyhow!("Embedding model not initialized. Check EMBEDDING_* settings."))?;

    println!("📄 Processing {} ({} bytes)...", filename, bytes.len());
    let outcome = ingest
        .ingest_pdf(&filename, bytes)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    if outcome.reused {
        println!(
            "♻️  {} is unchanged, reusing {} stored chunks",
            outcome.pdf_filename, outcome.chunk_count
        );
    } else {
        println!(
            "✅ PDF '{}' processed: {} chunks stored",
            outcome.pdf_filename, outcome.chunk_count
        );
    }
    Ok(())
}

/// List processed PDFs
pub async fn list(config: &RagConfig) -> Result<()> {
    let store = CollectionStore::new(&config.vector_store_dir, config.collection_cache_size)?;
    let collections = store.list().await?;

    if collections.is_empty() {
        println!("No processed PDFs in {}", config.vector_store_dir.display());
        return Ok(());
    }

    println!("📚 Processed PDFs:");
    for summary in collections {
        println!(
            "  {:<40} {:>5} chunks  {:>4}D  {}  {}",
            summary.pdf_filename,
            summary.chunk_count,
            summary.dimension,
            summary.embedding_model,
            summary.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
