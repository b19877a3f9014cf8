//! Persistent thumbnail cache.
//!
//! - [`cache_key`]: versioned cache key for `(source, width, height)`
//! - [`ThumbIndex`]: key → blob reference index
//! - [`ThumbCache`]: lookup and store of scaled images

mod cache;
mod index;
mod key;

pub use cache::ThumbCache;
pub use index::{LogThumbIndex, LruThumbIndex, ThumbIndex, DEFAULT_INDEX_CAPACITY};
pub use key::{cache_key, cache_key_with_version, etag_for_key, ALGORITHM_VERSION};
