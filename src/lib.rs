//! # blob-thumbs
//!
//! On-demand thumbnail generation and caching in front of a
//! content-addressable blob store.
//!
//! Given a reference to a stored image and target dimensions, the server
//! produces a correctly sized (optionally square-cropped) image, serves it
//! with cache-validation headers, and stores the result so later identical
//! requests are answered from cache.
//!
//! ## Features
//!
//! - **Bounded work**: separate admission gates for reading sources and for
//!   decode/resize/encode
//! - **Request collapsing**: identical concurrent requests share one scale
//! - **Persistent cache**: scaled images are stored as blobs and indexed by a
//!   versioned key
//! - **Conditional requests**: `ETag`/`If-None-Match` and `If-Modified-Since`
//!
//! ## Architecture
//!
//! - [`blob`] - Content references and blob store backends
//! - [`scale`] - Gates, singleflight, decode/crop/encode pipeline
//! - [`thumb`] - Cache keys, thumbnail index and cache
//! - [`server`] - Axum-based HTTP server and routes
//! - [`metrics`] - Byte counters
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use blob_thumbs::{
//!     create_router, AppState, CodecDecoder, Counters, ImageHandler, LruThumbIndex,
//!     MemoryStore, RouterConfig, Scaler, ThumbCache,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(MemoryStore::new());
//!     let counters = Arc::new(Counters::new());
//!
//!     let scaler = Scaler::new(store.clone(), Arc::new(CodecDecoder));
//!     let cache = ThumbCache::new(store.clone(), Arc::new(LruThumbIndex::new()));
//!     let images = ImageHandler::new(scaler)
//!         .with_cache(cache)
//!         .with_metrics(counters.clone());
//!
//!     let router = create_router(AppState::new(images, store, counters), RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3179").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod blob;
pub mod config;
pub mod error;
pub mod metrics;
pub mod scale;
pub mod server;
pub mod thumb;

// Re-export commonly used types
pub use blob::{BlobStore, ContentRef, DiskStore, MemoryStore};
pub use config::Config;
pub use error::{CacheWriteError, ScaleError, StoreError, ThumbError, ValidationError};
pub use metrics::{Counters, CountersSnapshot, Metrics, NoopMetrics};
pub use scale::{
    CodecDecoder, Gate, Group, ImageDecode, ImageFormat, ScaleRequest, ScaledImage, Scaler,
};
pub use server::{create_router, AppState, ImageHandler, RouterConfig, ThumbRequest};
pub use thumb::{cache_key, etag_for_key, LogThumbIndex, LruThumbIndex, ThumbCache, ThumbIndex};
