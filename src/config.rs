//! Configuration management for the thumbnail server.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `THUMBS_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Environment Variables
//!
//! - `THUMBS_HOST` - Server bind address (default: 0.0.0.0)
//! - `THUMBS_PORT` - Server port (default: 3179)
//! - `THUMBS_DATA_DIR` - Blob and thumbnail index directory (in-memory when unset)
//! - `THUMBS_MAX_IMAGE_SIZE` - Largest accepted width or height (default: 2000)
//! - `THUMBS_DEFAULT_WIDTH` / `THUMBS_DEFAULT_HEIGHT` - Size when `mw`/`mh` are omitted (default: 100)
//! - `THUMBS_SLURP_CONCURRENCY` - Concurrent source reads (default: 5)
//! - `THUMBS_RESIZE_CONCURRENCY` - Concurrent decode/resize/encode jobs (default: 2)
//! - `THUMBS_NO_THUMB_CACHE` - Disable cache lookups and cache headers
//! - `THUMBS_INDEX_CAPACITY` - In-memory thumbnail index entries (default: 10000)
//! - `THUMBS_MAX_UPLOAD_BYTES` - Largest accepted upload (default: 64 MiB)
//! - `THUMBS_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;

use clap::Parser;

use crate::scale::{DEFAULT_RESIZE_CONCURRENCY, DEFAULT_SLURP_CONCURRENCY};
use crate::server::{DEFAULT_MAX_IMAGE_SIZE, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_THUMB_SIZE};
use crate::thumb::DEFAULT_INDEX_CAPACITY;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3179;

/// Name of the thumbnail index log inside the data directory.
pub const THUMB_INDEX_FILE: &str = "thumbmeta.log";

// =============================================================================
// CLI Arguments
// =============================================================================

/// blob-thumbs - On-demand thumbnails for a content-addressable blob store.
///
/// Serves scaled (optionally square-cropped) versions of stored images and
/// caches the results back into the store.
#[derive(Parser, Debug, Clone)]
#[command(name = "blob-thumbs")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "THUMBS_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "THUMBS_PORT")]
    pub port: u16,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// Directory holding blobs and the thumbnail index.
    ///
    /// If not specified, blobs and the index live in memory and are lost on exit.
    #[arg(long, env = "THUMBS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Largest upload body accepted on /blobs, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "THUMBS_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,

    // =========================================================================
    // Thumbnail Configuration
    // =========================================================================
    /// Largest width or height a client may request.
    #[arg(long, default_value_t = DEFAULT_MAX_IMAGE_SIZE, env = "THUMBS_MAX_IMAGE_SIZE")]
    pub max_image_size: u32,

    /// Width used when a request omits `mw`.
    #[arg(long, default_value_t = DEFAULT_THUMB_SIZE, env = "THUMBS_DEFAULT_WIDTH")]
    pub default_width: u32,

    /// Height used when a request omits `mh`.
    #[arg(long, default_value_t = DEFAULT_THUMB_SIZE, env = "THUMBS_DEFAULT_HEIGHT")]
    pub default_height: u32,

    /// Number of source images read into memory at once.
    #[arg(long, default_value_t = DEFAULT_SLURP_CONCURRENCY, env = "THUMBS_SLURP_CONCURRENCY")]
    pub slurp_concurrency: usize,

    /// Number of decode/resize/encode jobs run at once.
    #[arg(long, default_value_t = DEFAULT_RESIZE_CONCURRENCY, env = "THUMBS_RESIZE_CONCURRENCY")]
    pub resize_concurrency: usize,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Disable thumbnail cache lookups and HTTP cache headers.
    ///
    /// Scaled images are still written to the store.
    #[arg(long, default_value_t = false, env = "THUMBS_NO_THUMB_CACHE")]
    pub no_thumb_cache: bool,

    /// Entries kept by the in-memory thumbnail index (no data dir only).
    #[arg(long, default_value_t = DEFAULT_INDEX_CAPACITY, env = "THUMBS_INDEX_CAPACITY")]
    pub index_capacity: usize,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "THUMBS_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_image_size == 0 {
            return Err("max_image_size must be greater than 0".to_string());
        }

        if self.default_width == 0 || self.default_height == 0 {
            return Err("default_width and default_height must be greater than 0".to_string());
        }
        if self.default_width > self.max_image_size || self.default_height > self.max_image_size
        {
            return Err(format!(
                "default size {}x{} exceeds max_image_size {}",
                self.default_width, self.default_height, self.max_image_size
            ));
        }

        if self.slurp_concurrency == 0 {
            return Err("slurp_concurrency must be greater than 0".to_string());
        }
        if self.resize_concurrency == 0 {
            return Err("resize_concurrency must be greater than 0".to_string());
        }

        if self.index_capacity == 0 {
            return Err("index_capacity must be greater than 0".to_string());
        }

        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether cache lookups and cache headers are on.
    pub fn cache_enabled(&self) -> bool {
        !self.no_thumb_cache
    }

    /// Path of the thumbnail index log, when a data directory is set.
    pub fn index_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(THUMB_INDEX_FILE))
    }
}

// =============================================================================
// Tests
// =============================================================================
