//! Router configuration for the thumbnail server.
//!
//! # Route Structure
//!
//! ```text
//! /health                            - Health check
//! /thumbnail/{blobref}[/{filename}]  - Scaled image (any method, GET/HEAD served)
//! /blobs                             - Upload an original (PUT or POST)
//! /debug/vars                        - Byte counters
//! ```
//!
//! # Example
//!
//! ```ignore
//! use blob_thumbs::server::{create_router, AppState, ImageHandler, RouterConfig};
//!
//! let state = AppState::new(ImageHandler::new(scaler), store, counters);
//! let router = create_router(state, RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3179").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{any, get, post};
use axum::Router;
use http::header::{CONTENT_TYPE, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    debug_vars_handler, health_handler, thumbnail_handler, upload_handler, AppState,
};
use crate::blob::BlobStore;

/// Default cap on upload bodies (64 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Largest accepted upload body in bytes
    pub max_upload_bytes: usize,
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Tracing is enabled
    /// - Uploads are capped at 64 MiB
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    /// Pass None (or don't call this method) to allow any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// This function builds the complete Axum router with:
/// - Thumbnail routes (every method reaches the handler, which rejects
///   anything but GET and HEAD)
/// - Upload route with a body size limit
/// - Health and counter routes
/// - CORS configuration
/// - Request tracing (optional)
pub fn create_router<S>(state: AppState<S>, config: RouterConfig) -> Router
where
    S: BlobStore + 'static,
{
    let cors = build_cors_layer(&config);

    let upload_routes = Router::new()
        .route(
            "/blobs",
            post(upload_handler::<S>).put(upload_handler::<S>),
        )
        .layer(DefaultBodyLimit::max(config.max_upload_bytes));

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/debug/vars", get(debug_vars_handler::<S>))
        .route("/thumbnail/{blobref}", any(thumbnail_handler::<S>))
        .route(
            "/thumbnail/{blobref}/{filename}",
            any(thumbnail_handler::<S>),
        )
        .merge(upload_routes)
        .with_state(state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::POST,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, IF_NONE_MATCH, IF_MODIFIED_SINCE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => {
            // No origins allowed - this effectively disables CORS
            cors
        }
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
