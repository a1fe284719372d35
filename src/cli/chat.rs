// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::RagConfig;
use crate::llm::ConversationTurn;
use crate::rag::{PipelineAnswer, PipelineState, RagPipeline};

/// Earlier turns included in the prompt
const MAX_HISTORY_TURNS: usize = 5;

/// Arguments for the ask command
#[derive(Args, Debug)]
pub struct AskArgs {
    /// Filename of a processed PDF
    #[arg(long, short)]
    pub document: String,

    /// Question to ask
    pub question: String,

    /// Print the context chunks used for the answer
    #[arg(long)]
    pub show_context: bool,
}

/// Arguments for the chat command
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Filename of a processed PDF
    #[arg(long, short)]
    pub document: String,
}

async fn load_pipeline(config: &RagConfig) -> Result<RagPipeline> {
    let services = super::load_services(config).await?;
    services.pipeline().ok_or_else(|| {
        anyhow!("Backend services (encoder or LLM) not initialized. Check model paths and GOOGLE_API_KEY.")
    })
}

/// Answer one question
pub async fn ask(config: &RagConfig, args: AskArgs) -> Result<()> {
    let pipeline = load_pipeline(config).await?;
    let output = pipeline.run(&args.document, &args.question).await;

    if args.show_context {
        for (i, chunk) in output.top_chunks.iter().enumerate() {
            println!("[CHUNK {}]\n{}\n", i + 1, chunk);
        }
    }
    println!("{}", output.answer);
    Ok(())
}

/// Add a turn, dropping the oldest once the history is full
fn push_turn(history: &mut Vec<ConversationTurn>, question: String, answer: String) {
    history.push(ConversationTurn { question, answer });
    if history.len() > MAX_HISTORY_TURNS {
        history.remove(0);
    }
}

/// Interactive loop; type `exit` to leave
pub async fn chat(config: &RagConfig, args: ChatArgs) -> Result<()> {
    let pipeline = load_pipeline(config).await?;
    let mut history: Vec<ConversationTurn> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("💬 Chatting about {}. Type 'exit' to quit.", args.document);

    loop {
        print!("question> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") {
            break;
        }

        let state = PipelineState::new(&args.document, question).with_history(history.clone());
        let output = pipeline.run_state(state).await;
        println!("\nanswer>\n{}\n", output.answer);

        if let PipelineAnswer::Answered(answer) = output.answer {
            push_turn(&mut history, question.to_string(), answer);
        }
    }

    Ok(())
}
