//! Document and blob storage behind the map persistence service.
//!
//! DESIGN
//! ======
//! Maps live as one document per map id inside a collection. Saves merge
//! the given fields into the stored document, so fields other writers own
//! survive. Every successful save is broadcast to the document's
//! subscribers, which is how other sessions (and our own) see changes.
//!
//! Two backends: `MemoryStore` for tests and single-process use, and
//! `FileStore`, which keeps JSON documents and blobs under a root directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tokio::sync::{RwLock, broadcast};

/// A stored document: a JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Updates buffered per subscriber before it starts lagging.
const SUBSCRIBER_CAPACITY: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid document json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("document is not a json object: {0}")]
    NotAnObject(String),
    #[error("invalid storage path segment: {0:?}")]
    InvalidPath(String),
}

/// Keyed JSON documents with merge-on-save and change subscriptions.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot be read.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Merge `fields` into the document, creating it if needed, then notify
    /// subscribers with the merged document.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot be read or written.
    async fn save(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError>;

    /// Receive every document saved under `collection/id` from now on.
    fn subscribe(&self, collection: &str, id: &str) -> broadcast::Receiver<Document>;
}

/// Binary uploads addressed by a relative path.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `path` and return a URL the renderer can load.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the path is invalid or the write fails.
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, StoreError>;
}

// =============================================================================
// SUBSCRIPTIONS
// =============================================================================

/// One broadcast channel per document key, created on first use.
#[derive(Default)]
struct Watchers {
    channels: Mutex<HashMap<String, broadcast::Sender<Document>>>,
}

impl Watchers {
    fn subscribe(&self, key: &str) -> broadcast::Receiver<Document> {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(key.to_owned())
            .or_insert_with(|| broadcast::channel(SUBSCRIBER_CAPACITY).0)
            .subscribe()
    }

    fn publish(&self, key: &str, doc: &Document) {
        let channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = channels.get(key) {
            // No receivers is fine: nobody is watching this map.
            if tx.send(doc.clone()).is_err() {
                tracing::trace!(key, "no subscribers for document update");
            }
        }
    }
}

fn doc_key(collection: &str, id: &str) -> String {
    format!("{collection}/{id}")
}

fn merge(doc: &mut Document, fields: Document) {
    for (key, value) in fields {
        doc.insert(key, value);
    }
}

/// Reject empty segments and anything that could escape the store root.
fn check_segment(segment: &str) -> Result<(), StoreError> {
    let bad = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\'])
        || segment.contains('\0');
    if bad {
        return Err(StoreError::InvalidPath(segment.to_owned()));
    }
    Ok(())
}

fn split_blob_path(path: &str) -> Result<Vec<&str>, StoreError> {
    let segments: Vec<&str> = path.split('/').collect();
    for segment in &segments {
        check_segment(segment)?;
    }
    Ok(segments)
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-process store. Blobs get `memory://` URLs.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<String, Document>>,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    watchers: Watchers,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes uploaded at `path`, if any.
    pub async fn blob(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.read().await.get(path).cloned()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.docs.read().await.get(&doc_key(collection, id)).cloned())
    }

    async fn save(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        let key = doc_key(collection, id);
        let merged = {
            let mut docs = self.docs.write().await;
            let doc = docs.entry(key.clone()).or_default();
            merge(doc, fields);
            doc.clone()
        };
        self.watchers.publish(&key, &merged);
        Ok(())
    }

    fn subscribe(&self, collection: &str, id: &str) -> broadcast::Receiver<Document> {
        self.watchers.subscribe(&doc_key(collection, id))
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, StoreError> {
        split_blob_path(path)?;
        self.blobs.write().await.insert(path.to_owned(), bytes);
        Ok(format!("memory://{path}"))
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// Directory-backed store.
///
/// Documents live at `<root>/<collection>/<id>.json` and blobs under
/// `<root>/blobs/`. Subscriptions only see saves made through this process.
pub struct FileStore {
    root: PathBuf,
    /// Serializes read-merge-write cycles so concurrent saves don't drop fields.
    write_lock: tokio::sync::Mutex<()>,
    watchers: Watchers,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), write_lock: tokio::sync::Mutex::new(()), watchers: Watchers::default() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn doc_path(&self, collection: &str, id: &str) -> Result<PathBuf, StoreError> {
        check_segment(collection)?;
        check_segment(id)?;
        Ok(self.root.join(collection).join(format!("{id}.json")))
    }

    async fn read_doc(path: &Path) -> Result<Option<Document>, StoreError> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<serde_json::Value>(&raw)? {
            serde_json::Value::Object(doc) => Ok(Some(doc)),
            _ => Err(StoreError::NotAnObject(path.display().to_string())),
        }
    }

    /// Write through a sibling temp file so readers never see a partial document.
    async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for FileStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let path = self.doc_path(collection, id)?;
        Self::read_doc(&path).await
    }

    async fn save(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        let path = self.doc_path(collection, id)?;
        let merged = {
            let _guard = self.write_lock.lock().await;
            let mut doc = Self::read_doc(&path).await?.unwrap_or_default();
            merge(&mut doc, fields);
            let bytes = serde_json::to_vec_pretty(&doc)?;
            Self::write_atomic(&path, &bytes).await?;
            doc
        };
        tracing::debug!(path = %path.display(), "document saved");
        self.watchers.publish(&doc_key(collection, id), &merged);
        Ok(())
    }

    fn subscribe(&self, collection: &str, id: &str) -> broadcast::Receiver<Document> {
        self.watchers.subscribe(&doc_key(collection, id))
    }
}

#[async_trait::async_trait]
impl BlobStore for FileStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, StoreError> {
        let mut target = self.root.join("blobs");
        for segment in split_blob_path(path)? {
            target.push(segment);
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        let absolute = std::path::absolute(&target)?;
        tracing::debug!(path = %absolute.display(), "blob uploaded");
        Ok(format!("file://{}", absolute.display()))
    }
}

/// Local filesystem path behind a `file://` URL.
#[must_use]
pub fn file_url_path(url: &str) -> Option<PathBuf> {
    url.strip_prefix("file://").filter(|p| !p.is_empty()).map(PathBuf::from)
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
