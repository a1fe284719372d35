// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! On-disk storage for uploaded source documents

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{sanitize_filename, DocumentError};

/// Metadata about a stored upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub filename: String,
    pub size_bytes: u64,
}

/// Flat directory of uploaded documents, one file per filename
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Create the store, creating the upload directory if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, DocumentError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a document with this filename is stored at
    pub fn path_for(&self, filename: &str) -> Result<PathBuf, DocumentError> {
        let name = sanitize_filename(filename)?;
        Ok(self.root.join(name))
    }

    /// Save document bytes, replacing any earlier upload with the same name.
    ///
    /// The write goes to a temp file in the same directory and is renamed into
    /// place, so readers never observe a half-written file.
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, DocumentError> {
        let target = self.path_for(filename)?;
        let root = self.root.clone();
        let data = bytes.to_vec();
        let destination = target.clone();

        tokio::task::spawn_blocking(move || -> Result<(), DocumentError> {
            let mut tmp = tempfile::NamedTempFile::new_in(&root)?;
            tmp.write_all(&data)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&destination).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| DocumentError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        info!("Saved upload {} ({} bytes)", target.display(), bytes.len());
        Ok(target)
    }

    /// Read a stored document back
    pub async fn read(&self, filename: &str) -> Result<Vec<u8>, DocumentError> {
        let path = self.path_for(filename)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(DocumentError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self, filename: &str) -> bool {
        match self.path_for(filename) {
            Ok(path) => tokio::fs::metadata(path).await.is_ok(),
            Err(_) => false,
        }
    }

    /// Remove a stored document. Returns false when it did not exist.
    pub async fn remove(&self, filename: &str) -> Result<bool, DocumentError> {
        let path = self.path_for(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// List stored documents, sorted by filename
    pub async fn list(&self) -> Result<Vec<StoredDocument>, DocumentError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut documents = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            // Skip in-flight temp files
            if name.starts_with('.') {
                continue;
            }
            documents.push(StoredDocument {
                filename: name,
                size_bytes: metadata.len(),
            });
        }

        documents.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(documents)
    }
}
