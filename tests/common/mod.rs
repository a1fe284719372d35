// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared test doubles for the embedding, reranking and LLM seams
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use pdf_rag_node::{
    config::RagConfig,
    embeddings::TextEmbedder,
    llm::{ChatModel, LlmError},
    rerank::Reranker,
    services::RagServices,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const MOCK_EMBEDDER: &str = "mock-embedder";
const MOCK_DIMENSION: usize = 256;

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

/// Deterministic bag-of-words embedding: texts sharing words are similar
#[derive(Default)]
pub struct HashEmbedder {
    pub calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; MOCK_DIMENSION];
        for word in words(text) {
            let mut hash: u64 = 0xcbf29ce484222325;
            for byte in word.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            v[(hash % MOCK_DIMENSION as u64) as usize] += 1.0;
        }
        let magnitude = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            v.iter_mut().for_each(|x| *x /= magnitude);
        }
        v
    }
}

#[async_trait]
impl TextEmbedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        MOCK_DIMENSION
    }

    fn model_name(&self) -> &str {
        MOCK_EMBEDDER
    }
}

/// Embedder that always fails but reports a configurable model name
pub struct FailingEmbedder {
    pub model: String,
}

impl FailingEmbedder {
    pub fn new() -> Self {
        Self {
            model: MOCK_EMBEDDER.to_string(),
        }
    }
}

#[async_trait]
impl TextEmbedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(anyhow!("encoder offline"))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(anyhow!("encoder offline"))
    }

    fn dimension(&self) -> usize {
        MOCK_DIMENSION
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Scores a document by how many query words it contains
pub struct KeywordReranker;

#[async_trait]
impl Reranker for KeywordReranker {
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        let query_words: Vec<String> = words(query).collect();
        Ok(documents
            .iter()
            .map(|doc| {
                let doc_words: Vec<String> = words(doc).collect();
                query_words.iter().filter(|w| doc_words.contains(w)).count() as f32
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "keyword-reranker"
    }
}

/// Returns one score fewer than the number of documents
pub struct ShortReranker;

#[async_trait]
impl Reranker for ShortReranker {
    async fn score(&self, _query: &str, documents: &[String]) -> Result<Vec<f32>> {
        // Ascending scores would reverse the order if they were applied
        Ok((1..documents.len()).map(|i| i as f32 * 10.0).collect())
    }

    fn model_name(&self) -> &str {
        "short-reranker"
    }
}

pub struct FailingReranker;

#[async_trait]
impl Reranker for FailingReranker {
    async fn score(&self, _query: &str, _documents: &[String]) -> Result<Vec<f32>> {
        Err(anyhow!("cross-encoder crashed"))
    }

    fn model_name(&self) -> &str {
        "failing-reranker"
    }
}

/// Returns a canned reply and records every prompt it receives
pub struct RecordingLlm {
    reply: Result<String, String>,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: Err("quota exceeded".to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatModel for RecordingLlm {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply
            .clone()
            .map_err(|e| LlmError::Api { status: 429, body: e })
    }

    fn model_name(&self) -> &str {
        "recording-llm"
    }
}

/// Config rooted in a temp directory with small chunks
pub fn test_config(root: &Path) -> RagConfig {
    RagConfig {
        upload_dir: root.join("uploads"),
        vector_store_dir: root.join("stores"),
        chunk_size: 120,
        chunk_overlap: 20,
        retrieve_top_k: 4,
        rerank_top_n: 2,
        fallback_top_n: 3,
        ..RagConfig::default()
    }
}

pub fn test_services(
    config: &RagConfig,
    embedder: Option<Arc<dyn TextEmbedder>>,
    reranker: Option<Arc<dyn Reranker>>,
    llm: Option<Arc<dyn ChatModel>>,
) -> RagServices {
    RagServices::new(config, embedder, reranker, llm).unwrap()
}

/// Five short paragraphs; with `test_config` chunking this yields three chunks
pub const SAMPLE_TEXT: &str = "The Qasper dataset contains questions about NLP papers.\n\n\
Annotators wrote 5049 questions over 1585 papers.\n\n\
The baseline model uses a Longformer encoder.\n\n\
Results show the baseline trails human performance by 27 F1 points.\n\n\
Future work includes multilingual evaluation.";

/// Build a one-page PDF with one Helvetica text line per entry.
///
/// Lines must not contain parentheses or backslashes.
pub fn text_pdf(lines: &[&str]) -> Vec<u8> {
    let mut content = String::from("BT\n/F1 12 Tf\n72 720 Td\n");
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            content.push_str("0 -16 Td\n");
        }
        content.push_str(&format!("({}) Tj\n", line));
    }
    content.push_str("ET");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_offset = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    pdf.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        )
        .as_bytes(),
    );
    pdf
}
