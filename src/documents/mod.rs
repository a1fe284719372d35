// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Source document handling: upload storage, PDF text extraction and chunking

pub mod filename;
pub mod pdf;
pub mod splitter;
pub mod store;

use thiserror::Error;

pub use filename::{is_pdf_filename, sanitize_filename};
pub use pdf::extract_pdf_text;
pub use splitter::RecursiveCharacterSplitter;
pub use store::{DocumentStore, StoredDocument};

/// Errors raised while accepting, storing or parsing a source document
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Invalid file type. Only PDF files are accepted.")]
    NotPdf,

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Failed to parse PDF: {0}")]
    ParseFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
