//! Blob store backed by a local directory.
//!
//! Blobs live at `<root>/<aa>/<bb>/<digest>` where `aa` and `bb` are the first
//! two byte pairs of the hex digest. Writes go to a temporary file first and are
//! renamed into place, so a reader never observes a partially written blob.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use super::{BlobStore, ContentRef};
use crate::error::StoreError;

/// Directory under the root that holds in-progress writes.
const TMP_DIR: &str = "tmp";

pub struct DiskStore {
    root: PathBuf,
    tmp_seq: AtomicU64,
}

impl DiskStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        // Runs once at startup; not worth an async constructor.
        std::fs::create_dir_all(root.join(TMP_DIR))?;
        Ok(Self {
            root,
            tmp_seq: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, content_ref: &ContentRef) -> PathBuf {
        let digest = content_ref.digest_hex();
        self.root
            .join(&digest[0..2])
            .join(&digest[2..4])
            .join(digest)
    }

    fn tmp_path(&self, content_ref: &ContentRef) -> PathBuf {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        self.root.join(TMP_DIR).join(format!(
            "{}.{}.{}",
            content_ref.digest_hex(),
            std::process::id(),
            seq
        ))
    }
}

#[async_trait]
impl BlobStore for DiskStore {
    async fn put(&self, data: Bytes) -> Result<ContentRef, StoreError> {
        let content_ref = ContentRef::of(&data);
        let path = self.blob_path(&content_ref);
        if fs::try_exists(&path).await? {
            return Ok(content_ref);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp = self.tmp_path(&content_ref);
        if let Err(e) = fs::write(&tmp, &data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(content_ref)
    }

    async fn fetch(&self, content_ref: &ContentRef) -> Result<Bytes, StoreError> {
        match fs::read(self.blob_path(content_ref)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(content_ref.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn contains(&self, content_ref: &ContentRef) -> Result<bool, StoreError> {
        Ok(fs::try_exists(self.blob_path(content_ref)).await?)
    }
}
