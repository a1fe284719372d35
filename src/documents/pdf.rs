// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use tracing::debug;

use super::DocumentError;

/// Extract the text of every page of a PDF, concatenated in page order.
///
/// Parsing is CPU-bound and runs on the blocking pool. A panic inside the
/// parser surfaces as `DocumentError::ParseFailed`.
pub async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String, DocumentError> {
    let size = bytes.len();
    let result = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| DocumentError::ParseFailed(format!("parser aborted: {}", e)))?;

    let text = result.map_err(|e| DocumentError::ParseFailed(e.to_string()))?;
    debug!("Extracted {} characters from {} byte PDF", text.chars().count(), size);
    Ok(text)
}
