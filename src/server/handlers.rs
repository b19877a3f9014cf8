//! HTTP request handlers for the thumbnail API.
//!
//! # Endpoints
//!
//! - `GET /thumbnail/{blobref}[/{filename}]` - Serve a scaled image
//! - `PUT /blobs` - Store an original
//! - `GET /health` - Health check endpoint
//! - `GET /debug/vars` - Byte counters

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::blob::{BlobStore, ContentRef};
use crate::error::{ScaleError, StoreError, ThumbError, ValidationError};
use crate::metrics::{Counters, CountersSnapshot};

use super::image::{ImageHandler, ThumbRequest};

/// Dimensions used when a request omits `mw` or `mh`.
pub const DEFAULT_THUMB_SIZE: u32 = 100;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S> {
    /// Thumbnail request orchestration
    pub images: Arc<ImageHandler<S>>,

    /// Store that originals are uploaded to and read from
    pub store: Arc<S>,

    /// Counters exported on `/debug/vars`
    pub counters: Arc<Counters>,

    /// Width used when `mw` is absent
    pub default_width: u32,

    /// Height used when `mh` is absent
    pub default_height: u32,
}

impl<S: BlobStore + 'static> AppState<S> {
    /// Create a new application state.
    pub fn new(images: ImageHandler<S>, store: Arc<S>, counters: Arc<Counters>) -> Self {
        Self {
            images: Arc::new(images),
            store,
            counters,
            default_width: DEFAULT_THUMB_SIZE,
            default_height: DEFAULT_THUMB_SIZE,
        }
    }

    /// Set the dimensions used when the query omits them.
    pub fn with_default_size(mut self, width: u32, height: u32) -> Self {
        self.default_width = width;
        self.default_height = height;
        self
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            images: Arc::clone(&self.images),
            store: Arc::clone(&self.store),
            counters: Arc::clone(&self.counters),
            default_width: self.default_width,
            default_height: self.default_height,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for thumbnail requests.
///
/// Extracted from: `/thumbnail/{blobref}` or `/thumbnail/{blobref}/{filename}`.
/// The filename is cosmetic and never interpreted.
#[derive(Debug, Deserialize)]
pub struct ThumbPathParams {
    pub blobref: String,

    #[serde(default)]
    pub filename: Option<String>,
}

/// Query parameters for thumbnail requests.
#[derive(Debug, Default, Deserialize)]
pub struct ThumbQueryParams {
    /// Maximum width
    #[serde(default)]
    pub mw: Option<u32>,

    /// Maximum height
    #[serde(default)]
    pub mh: Option<u32>,

    /// `1` or `true` to crop to a centered square
    #[serde(default)]
    pub square: Option<String>,
}

impl ThumbQueryParams {
    pub fn square(&self) -> bool {
        matches!(self.square.as_deref(), Some("1") | Some("true"))
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned by the JSON endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "storage_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// Response from the upload endpoint.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Reference of the stored blob
    #[serde(rename = "ref")]
    pub content_ref: String,

    /// Size of the stored blob in bytes
    pub size: usize,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert ThumbError to HTTP response.
///
/// Thumbnail errors are answered with a plain-text body carrying the error
/// message:
/// - validation failures are 400 and logged at WARN
/// - scale failures are 500 and logged at ERROR
impl IntoResponse for ThumbError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ThumbError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            ThumbError::Scale(ScaleError::Read { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "read_error")
            }
            ThumbError::Scale(ScaleError::Decode { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "decode_error")
            }
            ThumbError::Scale(ScaleError::Encode { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "encode_error")
            }
            ThumbError::Scale(ScaleError::Abandoned { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "abandoned")
            }
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        (status, message).into_response()
    }
}

/// Wrapper for upload errors to implement IntoResponse.
pub struct UploadError(pub StoreError);

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self.0 {
            StoreError::InvalidRef(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            StoreError::NotFound(_) | StoreError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
        };
        let message = self.0.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

impl From<StoreError> for UploadError {
    fn from(err: StoreError) -> Self {
        UploadError(err)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle thumbnail requests.
///
/// # Endpoint
///
/// `GET /thumbnail/{blobref}` or `GET /thumbnail/{blobref}/{filename}`
///
/// The route accepts every method; anything other than GET or HEAD is
/// rejected here with a 400.
///
/// # Query Parameters
///
/// - `mw`: Maximum width (default: configured default width)
/// - `mh`: Maximum height (default: configured default height)
/// - `square`: `1` to crop to a centered square
///
/// # Limitations
///
/// `square` is not part of the cache key. A square request for a size that
/// was already served non-square (or the reverse) gets the cached image, and
/// concurrent square and non-square requests for one size share a single
/// scale result.
///
/// # Response
///
/// - `200 OK`: The scaled image
/// - `304 Not Modified`: `If-None-Match` matched, or `If-Modified-Since` was
///   sent while caching is enabled
/// - `400 Bad Request`: Bad method, dimensions or reference
/// - `500 Internal Server Error`: The image could not be read, decoded or encoded
///
/// # Headers
///
/// - `Content-Type: image/jpeg` or `image/png`
/// - `ETag`, `Last-Modified`, `Expires` when caching is enabled
/// - `X-Thumb-Cache-Hit: true|false`
pub async fn thumbnail_handler<S: BlobStore + 'static>(
    State(state): State<AppState<S>>,
    method: Method,
    headers: HeaderMap,
    Path(params): Path<ThumbPathParams>,
    Query(query): Query<ThumbQueryParams>,
) -> Result<Response, ThumbError> {
    let source: ContentRef = params
        .blobref
        .parse()
        .map_err(|_| ValidationError::InvalidRef(params.blobref.clone()))?;

    let request = ThumbRequest {
        source,
        max_width: query.mw.unwrap_or(state.default_width),
        max_height: query.mh.unwrap_or(state.default_height),
        square: query.square(),
    };

    state.images.serve(&method, &headers, request).await
}

/// Handle upload requests.
///
/// # Endpoint
///
/// `PUT /blobs` or `POST /blobs` with the raw bytes as the body.
///
/// # Response
///
/// `201 Created` with JSON body:
/// ```json
/// {
///   "ref": "sha256-...",
///   "size": 1234
/// }
/// ```
pub async fn upload_handler<S: BlobStore + 'static>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), UploadError> {
    let size = body.len();
    let content_ref = state.store.put(body).await?;
    debug!(%content_ref, size, "Stored blob");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            content_ref: content_ref.to_string(),
            size,
        }),
    ))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle counter export requests.
///
/// `GET /debug/vars` returns `{"image-bytes-served": n, "image-bytes-fetched": n}`.
pub async fn debug_vars_handler<S: BlobStore + 'static>(
    State(state): State<AppState<S>>,
) -> Json<CountersSnapshot> {
    Json(state.counters.snapshot())
}
