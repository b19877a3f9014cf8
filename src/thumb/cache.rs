//! Scaled image cache on top of the blob store.
//!
//! A cached thumbnail is an ordinary blob; the [`ThumbIndex`] maps the cache
//! key to its reference. Index entries are not fully trusted: on a hit the
//! format is re-derived from the fetched bytes, and anything that does not
//! sniff as an image is treated as a miss.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use super::index::ThumbIndex;
use crate::blob::{BlobStore, ContentRef};
use crate::error::{CacheWriteError, StoreError};
use crate::scale::{sniff_format, ScaledImage};

pub struct ThumbCache<S> {
    store: Arc<S>,
    index: Arc<dyn ThumbIndex>,
}

impl<S> Clone for ThumbCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            index: Arc::clone(&self.index),
        }
    }
}

impl<S: BlobStore> ThumbCache<S> {
    pub fn new(store: Arc<S>, index: Arc<dyn ThumbIndex>) -> Self {
        Self { store, index }
    }

    /// Fetch the cached thumbnail for `key`.
    ///
    /// Returns `None` on a miss. Index or store failures are logged and also
    /// reported as a miss; the caller then scales from the source.
    pub async fn lookup(&self, key: &str) -> Option<ScaledImage> {
        let content_ref = match self.index.get(key).await {
            Ok(Some(content_ref)) => content_ref,
            Ok(None) => {
                debug!(key, "Thumbnail cache miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "Thumbnail index lookup failed");
                return None;
            }
        };

        let data = match self.store.fetch(&content_ref).await {
            Ok(data) => data,
            Err(StoreError::NotFound(_)) => {
                debug!(key, %content_ref, "Indexed thumbnail blob is gone");
                return None;
            }
            Err(e) => {
                warn!(key, %content_ref, error = %e, "Failed to fetch cached thumbnail");
                return None;
            }
        };

        match sniff_format(&data) {
            Some(format) if !format.is_raw() => {
                debug!(key, %content_ref, %format, "Thumbnail cache hit");
                Some(ScaledImage { format, data })
            }
            _ => {
                warn!(
                    key,
                    %content_ref,
                    "Cached thumbnail is not a recognized image, ignoring index entry"
                );
                None
            }
        }
    }

    /// Persist `data` as the thumbnail for `key`.
    pub async fn store(&self, key: &str, data: Bytes) -> Result<ContentRef, CacheWriteError> {
        let content_ref = self
            .store
            .put(data)
            .await
            .map_err(|source| CacheWriteError::Store {
                key: key.to_string(),
                source,
            })?;

        self.index
            .put(key, content_ref.clone())
            .await
            .map_err(|e| CacheWriteError::Index {
                key: key.to_string(),
                content_ref: content_ref.clone(),
                message: e.to_string(),
            })?;

        debug!(key, %content_ref, "Stored scaled thumbnail");
        Ok(content_ref)
    }
}
