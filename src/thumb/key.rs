//! Cache key derivation.
//!
//! Keys are persisted in the thumbnail index, so their text format must stay
//! stable across releases. Bump [`ALGORITHM_VERSION`] whenever the scaling
//! output changes: every previously cached thumbnail becomes unreachable
//! (the blobs themselves are left alone).

use crate::blob::ContentRef;

/// Version stamp of the scaling algorithm embedded in every cache key.
pub const ALGORITHM_VERSION: u32 = 1;

/// Cache key for `source` scaled to fit `width × height`.
///
/// Format: `scaled:<sourceRef>:<width>x<height>:v<version>`.
///
/// Square cropping is not encoded, so square and non-square requests of
/// one size map to the same key.
pub fn cache_key(source: &ContentRef, width: u32, height: u32) -> String {
    cache_key_with_version(source, width, height, ALGORITHM_VERSION)
}

/// [`cache_key`] with an explicit algorithm version.
pub fn cache_key_with_version(
    source: &ContentRef,
    width: u32,
    height: u32,
    version: u32,
) -> String {
    format!("scaled:{}:{}x{}:v{}", source, width, height, version)
}

/// Entity tag for a cache key: the lowercase hex SHA-256 of the key text.
pub fn etag_for_key(key: &str) -> String {
    ContentRef::of(key.as_bytes()).digest_hex().to_string()
}
