// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Extractive question-answering prompt

use serde::{Deserialize, Serialize};

/// Literal answer the model gives when the context does not contain one
pub const UNANSWERABLE: &str = "unanswerable";

/// One earlier exchange in an interactive session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

const INSTRUCTIONS: &str = "Answer the question using only the context below. \
If you don't know the answer, say 'unanswerable'.
If possible, find the answer in the given context and reuse the corresponding sentence as it is.
Do not give an overly short answer and reply in a single line, except for 'unanswerable'.
If the question is a yes/no question, the answer starts with 'yes' or 'no'.";

/// Build the answer prompt from reranked context chunks.
///
/// `history` is rendered before the question when non-empty.
pub fn build_answer_prompt(
    context_chunks: &[String],
    question: &str,
    history: &[ConversationTurn],
) -> String {
    let context = context_chunks.join("\n\n");

    let mut prompt = String::with_capacity(INSTRUCTIONS.len() + context.len() + question.len() + 64);
    prompt.push_str(INSTRUCTIONS);
    prompt.push_str("\n\nContext:\n");
    prompt.push_str(&context);
    prompt.push_str("\n\n");

    if !history.is_empty() {
        prompt.push_str("Conversation so far:\n");
        for turn in history {
            prompt.push_str("Q: ");
            prompt.push_str(&turn.question);
            prompt.push_str("\nA: ");
            prompt.push_str(&turn.answer);
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    prompt.push_str("Question: ");
    prompt.push_str(question);
    prompt.push_str("\n\nAnswer:");
    prompt
}
