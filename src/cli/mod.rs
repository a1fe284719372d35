// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod chat;
pub mod documents;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

use crate::config::RagConfig;
use crate::services::RagServices;

/// PDF RAG Node CLI
#[derive(Parser, Debug)]
#[command(name = "pdf-rag-cli")]
#[command(version)]
#[command(about = "Ingest PDFs and ask questions about them from the terminal", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a local PDF into its vector collection
    Ingest(documents::IngestArgs),

    /// Ask a single question about a processed PDF
    Ask(chat::AskArgs),

    /// Interactive question loop with conversation history
    Chat(chat::ChatArgs),

    /// List processed PDFs
    List,
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = RagConfig::from_env();
    config.validate().map_err(|e| anyhow!(e))?;

    match cli.command {
        Commands::Ingest(args) => documents::ingest(&config, args).await,
        Commands::Ask(args) => chat::ask(&config, args).await,
        Commands::Chat(args) => chat::chat(&config, args).await,
        Commands::List => documents::list(&config).await,
    }
}

pub(crate) async fn load_services(config: &RagConfig) -> Result<RagServices> {
    RagServices::from_config(config).await
}
