use crate::content_ref::ContentRef;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// An opaque reference into the external upload/object store where a
/// party's attachments live before issuance.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttachmentId(String);

impl AttachmentId {
    pub fn new(id: impl Into<String>) -> Self {
        AttachmentId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur when talking to the content or upload stores
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Content store unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Reference derivation failed: {0}")]
    Reference(#[from] crate::content_ref::ContentRefError),
}

/// The external content-addressed store. Pushes are independent and may
/// be retried; identical bytes always yield the identical reference.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Push raw bytes, returning their content reference.
    async fn push(&self, bytes: &[u8]) -> Result<ContentRef, ContentError>;

    /// Push a JSON document, returning the reference of its serialized form.
    async fn push_json(&self, value: &serde_json::Value) -> Result<ContentRef, ContentError>;

    /// Fetch previously pushed bytes by reference.
    async fn get(&self, reference: &ContentRef) -> Result<Option<Vec<u8>>, ContentError>;
}

/// In-memory content store for tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryContentStore {
    blobs: Arc<RwLock<HashMap<ContentRef, Vec<u8>>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn push(&self, bytes: &[u8]) -> Result<ContentRef, ContentError> {
        let reference = ContentRef::from_bytes(bytes)?;
        let mut blobs = self.blobs.write().await;
        blobs.insert(reference.clone(), bytes.to_vec());
        Ok(reference)
    }

    async fn push_json(&self, value: &serde_json::Value) -> Result<ContentRef, ContentError> {
        let bytes = serde_json::to_vec(value)?;
        self.push(&bytes).await
    }

    async fn get(&self, reference: &ContentRef) -> Result<Option<Vec<u8>>, ContentError> {
        let blobs = self.blobs.read().await;
        Ok(blobs.get(reference).cloned())
    }
}

/// An attachment as it sits in the upload store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StoredUpload {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// The external upload store holding attachments referenced by a request.
#[async_trait]
pub trait UploadStore: Send + Sync {
    async fn fetch(&self, id: &AttachmentId) -> Result<Option<StoredUpload>, ContentError>;
}

/// In-memory upload store for tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryUploadStore {
    uploads: Arc<RwLock<HashMap<AttachmentId, StoredUpload>>>,
}

impl MemoryUploadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, id: AttachmentId, upload: StoredUpload) {
        let mut uploads = self.uploads.write().await;
        uploads.insert(id, upload);
    }
}

#[async_trait]
impl UploadStore for MemoryUploadStore {
    async fn fetch(&self, id: &AttachmentId) -> Result<Option<StoredUpload>, ContentError> {
        let uploads = self.uploads.read().await;
        Ok(uploads.get(id).cloned())
    }
}
