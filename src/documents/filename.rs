// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::path::Path;

use super::DocumentError;

/// Reduce a client-supplied filename to a safe, single path component.
///
/// Directory parts are dropped (`../../etc/x.pdf` becomes `x.pdf`). Empty
/// names, `.`/`..`, hidden files and names containing NUL are rejected.
pub fn sanitize_filename(raw: &str) -> Result<String, DocumentError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DocumentError::InvalidFilename(
            "filename cannot be empty".to_string(),
        ));
    }
    if trimmed.contains('\0') {
        return Err(DocumentError::InvalidFilename(
            "filename contains a NUL byte".to_string(),
        ));
    }

    // Browsers on Windows may send backslash-separated paths
    let last = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);

    let name = Path::new(last)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| DocumentError::InvalidFilename(format!("'{}'", raw)))?;

    if name == "." || name == ".." || name.starts_with('.') {
        return Err(DocumentError::InvalidFilename(format!("'{}'", raw)));
    }

    Ok(name)
}

/// True when the filename carries a `.pdf` extension (case-insensitive)
pub fn is_pdf_filename(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}
