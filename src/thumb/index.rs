//! Cache key → scaled blob index.
//!
//! Two backends:
//!
//! - [`LruThumbIndex`]: bounded in-memory index, forgotten on restart
//! - [`LogThumbIndex`]: append-only file replayed at startup

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lru::LruCache;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::blob::ContentRef;
use crate::error::StoreError;

/// Default maximum number of entries in the in-memory index.
pub const DEFAULT_INDEX_CAPACITY: usize = 10_000;

/// Mapping from thumbnail cache keys to the blobs holding the scaled bytes.
#[async_trait]
pub trait ThumbIndex: Send + Sync {
    /// Look up `key`. A missing entry is `Ok(None)`, not an error.
    async fn get(&self, key: &str) -> Result<Option<ContentRef>, StoreError>;

    /// Record `key -> content_ref`, replacing any previous entry.
    async fn put(&self, key: &str, content_ref: ContentRef) -> Result<(), StoreError>;
}

// =============================================================================
// LruThumbIndex
// =============================================================================

pub struct LruThumbIndex {
    entries: Mutex<LruCache<String, ContentRef>>,
}

impl LruThumbIndex {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INDEX_CAPACITY)
    }

    /// A zero capacity is treated as one entry.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl Default for LruThumbIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ThumbIndex for LruThumbIndex {
    async fn get(&self, key: &str) -> Result<Option<ContentRef>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, content_ref: ContentRef) -> Result<(), StoreError> {
        self.entries.lock().await.put(key.to_string(), content_ref);
        Ok(())
    }
}

// =============================================================================
// LogThumbIndex
// =============================================================================

/// Durable index kept as `key<TAB>ref` lines in a single file.
///
/// The whole log is loaded into memory on open; later entries for the same
/// key win. Malformed lines (for example a torn final write) are skipped,
/// and an unterminated last line is closed off on open so the next append
/// starts on a fresh line.
pub struct LogThumbIndex {
    path: PathBuf,
    entries: RwLock<HashMap<String, ContentRef>>,
    log: Mutex<File>,
}

impl LogThumbIndex {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut entries = HashMap::new();

        let mut unterminated = false;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                unterminated = !contents.is_empty() && !contents.ends_with('\n');
                for (lineno, line) in contents.lines().enumerate() {
                    match parse_line(line) {
                        Some((key, content_ref)) => {
                            entries.insert(key.to_string(), content_ref);
                        }
                        None if line.is_empty() => {}
                        None => warn!(
                            path = %path.display(),
                            line = lineno + 1,
                            "Skipping malformed thumbnail index entry"
                        ),
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        debug!(path = %path.display(), entries = entries.len(), "Loaded thumbnail index");

        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        if unterminated {
            warn!(path = %path.display(), "Thumbnail index ends mid-line, terminating it");
            log.write_all(b"\n").await?;
            log.flush().await?;
        }

        Ok(Self {
            path,
            entries: RwLock::new(entries),
            log: Mutex::new(log),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn parse_line(line: &str) -> Option<(&str, ContentRef)> {
    let (key, content_ref) = line.split_once('\t')?;
    if key.is_empty() {
        return None;
    }
    Some((key, content_ref.parse().ok()?))
}

#[async_trait]
impl ThumbIndex for LogThumbIndex {
    async fn get(&self, key: &str) -> Result<Option<ContentRef>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, content_ref: ContentRef) -> Result<(), StoreError> {
        if key.contains(['\t', '\n']) {
            return Err(StoreError::Io(format!(
                "thumbnail index key contains a separator: {:?}",
                key
            )));
        }
        if self.entries.read().await.get(key) == Some(&content_ref) {
            return Ok(());
        }

        {
            let mut log = self.log.lock().await;
            log.write_all(format!("{}\t{}\n", key, content_ref).as_bytes())
                .await?;
            log.flush().await?;
        }
        self.entries
            .write()
            .await
            .insert(key.to_string(), content_ref);
        Ok(())
    }
}
