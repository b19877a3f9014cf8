use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::ContentRef;
use crate::error::StoreError;

// =============================================================================
// BlobStore Trait
// =============================================================================

/// Content-addressable storage of immutable blobs.
///
/// Implementations must be safe for concurrent use; callers never serialise
/// access on their side.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` and return its content reference.
    ///
    /// Writing the same bytes twice is idempotent and yields the same reference.
    async fn put(&self, data: Bytes) -> Result<ContentRef, StoreError>;

    /// Fetch the full content of a blob.
    async fn fetch(&self, content_ref: &ContentRef) -> Result<Bytes, StoreError>;

    /// Whether the store holds a blob with this reference.
    async fn contains(&self, content_ref: &ContentRef) -> Result<bool, StoreError> {
        match self.fetch(content_ref).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// Blob store that keeps everything in process memory.
#[derive(Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<ContentRef, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs held.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn put(&self, data: Bytes) -> Result<ContentRef, StoreError> {
        let content_ref = ContentRef::of(&data);
        self.blobs
            .write()
            .await
            .entry(content_ref.clone())
            .or_insert(data);
        Ok(content_ref)
    }

    async fn fetch(&self, content_ref: &ContentRef) -> Result<Bytes, StoreError> {
        self.blobs
            .read()
            .await
            .get(content_ref)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(content_ref.clone()))
    }

    async fn contains(&self, content_ref: &ContentRef) -> Result<bool, StoreError> {
        Ok(self.blobs.read().await.contains_key(content_ref))
    }
}
