//! Byte counters for served and fetched image data.
//!
//! The handler and scaler take an `Arc<dyn Metrics>` at construction. The
//! server installs [`Counters`], which is also exported as JSON on
//! `/debug/vars`; tests can pass [`NoopMetrics`].

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Sink for the image byte counters.
pub trait Metrics: Send + Sync {
    /// Bytes of scaled image data handed to clients.
    fn add_bytes_served(&self, n: u64);

    /// Bytes of source image data read from the blob store.
    fn add_bytes_fetched(&self, n: u64);
}

/// Metrics sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn add_bytes_served(&self, _n: u64) {}
    fn add_bytes_fetched(&self, _n: u64) {}
}

/// Atomic in-process counters.
#[derive(Debug, Default)]
pub struct Counters {
    bytes_served: AtomicU64,
    bytes_fetched: AtomicU64,
}

/// Point-in-time copy of [`Counters`], serialised with the exported names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountersSnapshot {
    #[serde(rename = "image-bytes-served")]
    pub bytes_served: u64,

    #[serde(rename = "image-bytes-fetched")]
    pub bytes_fetched: u64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            bytes_served: self.bytes_served.load(Ordering::Relaxed),
            bytes_fetched: self.bytes_fetched.load(Ordering::Relaxed),
        }
    }
}

impl Metrics for Counters {
    fn add_bytes_served(&self, n: u64) {
        self.bytes_served.fetch_add(n, Ordering::Relaxed);
    }

    fn add_bytes_fetched(&self, n: u64) {
        self.bytes_fetched.fetch_add(n, Ordering::Relaxed);
    }
}
