//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │          GET /thumbnail/{blobref}?mw=..&mh=..&square=1          │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌────────────┐  ┌─────────┐  │
//! │  │  handlers   │  │    image    │  │   routes   │  │  body   │  │
//! │  │ (extractors)│  │(orchestrate)│  │  (router)  │  │(counted)│  │
//! │  └─────────────┘  └─────────────┘  └────────────┘  └─────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod body;
pub mod handlers;
pub mod image;
pub mod routes;

pub use body::ServedBody;
pub use handlers::{
    debug_vars_handler, health_handler, thumbnail_handler, upload_handler, AppState,
    ErrorResponse, HealthResponse, ThumbPathParams, ThumbQueryParams, UploadError,
    UploadResponse, DEFAULT_THUMB_SIZE,
};
pub use image::{http_date, is_get_like, ImageHandler, ThumbRequest, DEFAULT_MAX_IMAGE_SIZE};
pub use routes::{create_router, RouterConfig, DEFAULT_MAX_UPLOAD_BYTES};
