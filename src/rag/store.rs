// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! On-disk collection store
//!
//! Layout: `<root>/<filename>_db/collection.bin`, bincode-encoded. Writes go
//! through a temp file in the collection directory and are renamed into place,
//! so a collection file either holds a complete collection or does not exist.

use lru::LruCache;
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::collection::{CollectionSummary, DocumentCollection};
use super::errors::RagError;
use crate::documents::sanitize_filename;

const COLLECTION_FILE: &str = "collection.bin";
const DIR_SUFFIX: &str = "_db";

pub struct CollectionStore {
    root: PathBuf,
    cache: Mutex<LruCache<String, Arc<DocumentCollection>>>,
}

impl std::fmt::Debug for CollectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl CollectionStore {
    pub fn new(root: impl Into<PathBuf>, cache_size: usize) -> Result<Self, RagError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let capacity = NonZeroUsize::new(cache_size)
            .ok_or_else(|| RagError::Other("collection cache size must be non-zero".into()))?;

        Ok(Self {
            root,
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the collection for `filename`
    pub fn collection_dir(&self, filename: &str) -> Result<PathBuf, RagError> {
        let name = sanitize_filename(filename)?;
        Ok(self.root.join(format!("{}{}", name, DIR_SUFFIX)))
    }

    fn collection_path(&self, filename: &str) -> Result<PathBuf, RagError> {
        Ok(self.collection_dir(filename)?.join(COLLECTION_FILE))
    }

    pub async fn exists(&self, filename: &str) -> bool {
        match self.collection_path(filename) {
            Ok(path) => tokio::fs::metadata(path).await.is_ok(),
            Err(_) => false,
        }
    }

    /// Load a collection, serving repeated loads from the LRU cache
    pub async fn load(&self, filename: &str) -> Result<Arc<DocumentCollection>, RagError> {
        let key = sanitize_filename(filename)?;

        if let Some(collection) = self.cache.lock().await.get(&key) {
            debug!("Collection cache hit for {}", key);
            return Ok(collection.clone());
        }

        let collection = Arc::new(self.read_from_disk(&key).await?);
        self.cache.lock().await.put(key, collection.clone());
        Ok(collection)
    }

    /// Load a collection and check it was embedded with `model`
    pub async fn load_for_model(
        &self,
        filename: &str,
        model: &str,
    ) -> Result<Arc<DocumentCollection>, RagError> {
        let collection = self.load(filename).await?;
        if collection.embedding_model != model {
            return Err(RagError::ModelMismatch {
                filename: collection.pdf_filename.clone(),
                stored: collection.embedding_model.clone(),
                active: model.to_string(),
            });
        }
        Ok(collection)
    }

    async fn read_from_disk(&self, filename: &str) -> Result<DocumentCollection, RagError> {
        let path = self.collection_path(filename)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RagError::NotProcessed(filename.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let collection: DocumentCollection = bincode::deserialize(&bytes)?;
        collection.validate()?;
        Ok(collection)
    }

    /// Persist a collection, replacing any previous one for the same document
    pub async fn save(&self, collection: DocumentCollection) -> Result<PathBuf, RagError> {
        collection.validate()?;
        let key = sanitize_filename(&collection.pdf_filename)?;
        let dir = self.collection_dir(&key)?;
        let path = dir.join(COLLECTION_FILE);
        let bytes = bincode::serialize(&collection)?;

        let target = path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), RagError> {
            std::fs::create_dir_all(&dir)?;
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| RagError::Other(format!("Collection write task failed: {}", e)))??;

        info!(
            "Saved collection for {} ({} chunks, {}D, model {})",
            key,
            collection.len(),
            collection.dimension,
            collection.embedding_model
        );

        self.cache.lock().await.put(key, Arc::new(collection));
        Ok(path)
    }

    /// Delete a collection. Returns false when none existed.
    pub async fn delete(&self, filename: &str) -> Result<bool, RagError> {
        let key = sanitize_filename(filename)?;
        self.cache.lock().await.pop(&key);

        let dir = self.collection_dir(&key)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                info!("Deleted collection for {}", key);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Summaries of every readable collection, sorted by filename
    pub async fn list(&self) -> Result<Vec<CollectionSummary>, RagError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut summaries = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let dir_name = entry.file_name();
            let Some(filename) = dir_name
                .to_str()
                .and_then(|name| name.strip_suffix(DIR_SUFFIX))
            else {
                continue;
            };

            match self.load(filename).await {
                Ok(collection) => summaries.push(collection.summary()),
                Err(RagError::NotProcessed(_)) => {}
                Err(e) => warn!("Skipping unreadable collection {}: {}", filename, e),
            }
        }

        summaries.sort_by(|a, b| a.pdf_filename.cmp(&b.pdf_filename));
        Ok(summaries)
    }
}
