// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Runtime configuration for the PDF RAG node
//!
//! Everything is read from environment variables (optionally seeded from a
//! `.env` file). Unset or unparsable values fall back to defaults.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which backend produces chunk and query embeddings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// Local sentence transformer via ONNX Runtime
    Onnx,
    /// Hosted Gemini embedding API
    Gemini,
}

impl FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "onnx" | "local" => Ok(EmbeddingBackend::Onnx),
            "gemini" | "google" => Ok(EmbeddingBackend::Gemini),
            other => Err(format!(
                "unknown embedding backend '{}'; expected 'onnx' or 'gemini'",
                other
            )),
        }
    }
}

/// Local ONNX model files
#[derive(Debug, Clone)]
pub struct OnnxModelPaths {
    pub name: String,
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
}

/// Configuration for the whole service
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub listen_addr: String,
    pub upload_dir: PathBuf,
    pub vector_store_dir: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieve_top_k: usize,
    pub rerank_top_n: usize,
    pub fallback_top_n: usize,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_model: OnnxModelPaths,
    pub gemini_embedding_model: String,
    pub reranker_model: OnnxModelPaths,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub llm_temperature: f32,
    pub request_timeout: Duration,
    pub max_upload_bytes: usize,
    pub collection_cache_size: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            upload_dir: PathBuf::from("./uploaded_pdfs"),
            vector_store_dir: PathBuf::from("./pdf_vector_stores"),
            chunk_size: 1000,
            chunk_overlap: 200,
            retrieve_top_k: 10,
            rerank_top_n: 20,
            fallback_top_n: 5,
            embedding_backend: EmbeddingBackend::Onnx,
            embedding_model: OnnxModelPaths {
                name: "all-mpnet-base-v2".to_string(),
                model_path: PathBuf::from("./models/all-mpnet-base-v2-onnx/model.onnx"),
                tokenizer_path: PathBuf::from("./models/all-mpnet-base-v2-onnx/tokenizer.json"),
            },
            gemini_embedding_model: "models/embedding-001".to_string(),
            reranker_model: OnnxModelPaths {
                name: "ms-marco-MiniLM-L-6-v2".to_string(),
                model_path: PathBuf::from("./models/ms-marco-MiniLM-L-6-v2-onnx/model.onnx"),
                tokenizer_path: PathBuf::from(
                    "./models/ms-marco-MiniLM-L-6-v2-onnx/tokenizer.json",
                ),
            },
            google_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            llm_temperature: 0.0,
            request_timeout: Duration::from_secs(60),
            max_upload_bytes: 50 * 1024 * 1024,
            collection_cache_size: 16,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Megabytes to bytes; None when unset or too large for `usize`
fn upload_limit_bytes(megabytes: Option<usize>) -> Option<usize> {
    megabytes?.checked_mul(1024 * 1024)
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    env::var(key).map(PathBuf::from).unwrap_or(default)
}

impl RagConfig {
    /// Load configuration from environment variables, reading `.env` first
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let defaults = Self::default();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("API_PORT").unwrap_or_else(|_| "8000".to_string());

        let embedding_backend = match env::var("EMBEDDING_BACKEND") {
            Ok(value) => value.parse().unwrap_or_else(|e: String| {
                tracing::warn!("{}; using onnx", e);
                EmbeddingBackend::Onnx
            }),
            Err(_) => defaults.embedding_backend,
        };

        let google_api_key = env::var("GOOGLE_API_KEY")
            .or_else(|_| env::var("GEMINI_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());

        Self {
            listen_addr: format!("{}:{}", host, port),
            upload_dir: env_path("UPLOAD_DIR", defaults.upload_dir),
            vector_store_dir: env_path("VECTOR_STORE_DIR", defaults.vector_store_dir),
            chunk_size: env_parse("CHUNK_SIZE").unwrap_or(defaults.chunk_size),
            chunk_overlap: env_parse("CHUNK_OVERLAP").unwrap_or(defaults.chunk_overlap),
            retrieve_top_k: env_parse("RETRIEVE_TOP_K").unwrap_or(defaults.retrieve_top_k),
            rerank_top_n: env_parse("RERANK_TOP_N").unwrap_or(defaults.rerank_top_n),
            fallback_top_n: env_parse("RERANK_FALLBACK_N").unwrap_or(defaults.fallback_top_n),
            embedding_backend,
            embedding_model: OnnxModelPaths {
                name: env::var("EMBEDDING_MODEL_NAME").unwrap_or(defaults.embedding_model.name),
                model_path: env_path("EMBEDDING_MODEL_PATH", defaults.embedding_model.model_path),
                tokenizer_path: env_path(
                    "EMBEDDING_TOKENIZER_PATH",
                    defaults.embedding_model.tokenizer_path,
                ),
            },
            gemini_embedding_model: env::var("GEMINI_EMBEDDING_MODEL")
                .unwrap_or(defaults.gemini_embedding_model),
            reranker_model: OnnxModelPaths {
                name: env::var("RERANKER_MODEL_NAME").unwrap_or(defaults.reranker_model.name),
                model_path: env_path("RERANKER_MODEL_PATH", defaults.reranker_model.model_path),
                tokenizer_path: env_path(
                    "RERANKER_TOKENIZER_PATH",
                    defaults.reranker_model.tokenizer_path,
                ),
            },
            google_api_key,
            gemini_model: env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            llm_temperature: env_parse("LLM_TEMPERATURE").unwrap_or(defaults.llm_temperature),
            request_timeout: env_parse::<u64>("LLM_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_upload_bytes: upload_limit_bytes(env_parse("MAX_UPLOAD_MB"))
                .unwrap_or(defaults.max_upload_bytes),
            collection_cache_size: env_parse("COLLECTION_CACHE_SIZE")
                .unwrap_or(defaults.collection_cache_size),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("Chunk size must be greater than 0".to_string());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }
        if self.retrieve_top_k == 0 {
            return Err("RETRIEVE_TOP_K must be greater than 0".to_string());
        }
        if self.max_upload_bytes == 0 {
            return Err("Upload size limit must be greater than 0".to_string());
        }
        if self.collection_cache_size == 0 {
            return Err("Collection cache size must be greater than 0".to_string());
        }
        Ok(())
    }

    /// True when a Google API key is configured
    pub fn has_api_key(&self) -> bool {
        self.google_api_key.is_some()
    }
}
