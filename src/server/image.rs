//! Thumbnail request handling.
//!
//! [`ImageHandler`] answers a request for a scaled version of a stored image:
//!
//! ```text
//! validate ──► conditional check ──► 304
//!                     │
//!                     ▼
//!               cache lookup ──hit──────────────────────────┐
//!                     │ miss                                │
//!                     ▼                                     ▼
//!         singleflight(key, scale) ──► store in cache ──► respond
//! ```
//!
//! The gates, singleflight group and metrics sink are fields of the handler,
//! so separate handlers (in tests, for example) never share them.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::Response;
use time::macros::format_description;
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use super::body::ServedBody;
use crate::blob::{BlobStore, ContentRef};
use crate::error::{ScaleError, ThumbError, ValidationError};
use crate::metrics::{Metrics, NoopMetrics};
use crate::scale::{Group, ScaleRequest, ScaledImage, Scaler};
use crate::thumb::{cache_key, etag_for_key, ThumbCache};

/// Largest width or height a client may ask for.
pub const DEFAULT_MAX_IMAGE_SIZE: u32 = 2000;

/// How far in the future `Expires` is set on cacheable responses.
const ONE_YEAR: Duration = Duration::days(365);

/// A request for a scaled image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbRequest {
    pub source: ContentRef,
    pub max_width: u32,
    pub max_height: u32,
    pub square: bool,
}

type ScaleOutcome = Result<ScaledImage, ScaleError>;

pub struct ImageHandler<S> {
    scaler: Arc<Scaler<S>>,
    cache: Option<ThumbCache<S>>,
    flights: Group<ScaleOutcome>,
    metrics: Arc<dyn Metrics>,
    max_image_size: u32,
    cache_enabled: bool,
}

impl<S: BlobStore + 'static> ImageHandler<S> {
    /// Create a handler without a thumbnail cache.
    pub fn new(scaler: Scaler<S>) -> Self {
        Self {
            scaler: Arc::new(scaler),
            cache: None,
            flights: Group::new(),
            metrics: Arc::new(NoopMetrics),
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
            cache_enabled: true,
        }
    }

    /// Store scaled images in (and serve them from) `cache`.
    pub fn with_cache(mut self, cache: ThumbCache<S>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Report served byte counts to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_max_image_size(mut self, max: u32) -> Self {
        self.max_image_size = max;
        self
    }

    /// Turn off cache lookups, the `If-Modified-Since` shortcut and the
    /// caching response headers. Freshly scaled images are still stored.
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn max_image_size(&self) -> u32 {
        self.max_image_size
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    /// Number of scale operations currently in flight.
    pub async fn in_flight(&self) -> usize {
        self.flights.in_flight().await
    }

    /// Reject requests the handler will not serve.
    pub fn validate(
        &self,
        method: &Method,
        width: u32,
        height: u32,
    ) -> Result<(), ValidationError> {
        if !is_get_like(method) {
            return Err(ValidationError::InvalidMethod);
        }
        let max = self.max_image_size;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(ValidationError::BogusDimensions { width, height });
        }
        Ok(())
    }

    /// Serve `request`.
    pub async fn serve(
        &self,
        method: &Method,
        headers: &HeaderMap,
        request: ThumbRequest,
    ) -> Result<Response, ThumbError> {
        self.validate(method, request.max_width, request.max_height)?;

        let key = cache_key(&request.source, request.max_width, request.max_height);
        let etag = etag_for_key(&key);
        if self.is_not_modified(headers, &etag) {
            return Ok(not_modified());
        }

        let cached = match (&self.cache, self.cache_enabled) {
            (Some(cache), true) => cache.lookup(&key).await,
            _ => None,
        };
        let cache_hit = cached.is_some();

        let image = match cached {
            Some(image) => image,
            None => {
                let image = self.scale_once(&key, &request).await?;
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.store(&key, image.data.clone()).await {
                        warn!(error = %e, "image resize: failed to cache thumbnail");
                    }
                }
                image
            }
        };

        Ok(self.respond(method, &request.source, &etag, image, cache_hit))
    }

    /// Conditional request validation.
    ///
    /// A matching `If-None-Match` is a 304. Without `If-None-Match`, any
    /// `If-Modified-Since` is also a 304 when caching is on: a thumbnail for a
    /// given key never changes, so the timestamp itself is not compared.
    fn is_not_modified(&self, headers: &HeaderMap, etag: &str) -> bool {
        match headers.get(header::IF_NONE_MATCH) {
            Some(inm) => inm
                .to_str()
                .map(|v| v.trim_matches('"') == etag)
                .unwrap_or(false),
            None => self.cache_enabled && headers.contains_key(header::IF_MODIFIED_SINCE),
        }
    }

    async fn scale_once(&self, key: &str, request: &ThumbRequest) -> ScaleOutcome {
        let scaler = Arc::clone(&self.scaler);
        let scale_request = ScaleRequest {
            source: request.source.clone(),
            max_width: request.max_width,
            max_height: request.max_height,
            square: request.square,
        };
        self.flights
            .run(key, move || async move { scaler.scale(&scale_request).await })
            .await
            .unwrap_or_else(|abandoned| Err(abandoned.into()))
    }

    fn respond(
        &self,
        method: &Method,
        source: &ContentRef,
        etag: &str,
        image: ScaledImage,
        cache_hit: bool,
    ) -> Response {
        let size = image.data.len();
        let mut builder = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, image.format.content_type())
            .header(header::CONTENT_LENGTH, size)
            .header("X-Thumb-Cache-Hit", cache_hit.to_string());

        if self.cache_enabled {
            let now = OffsetDateTime::now_utc();
            builder = builder
                .header(header::EXPIRES, http_date(now + ONE_YEAR))
                .header(header::LAST_MODIFIED, http_date(now))
                .header(header::ETAG, format!("\"{}\"", etag));
        }

        // HEAD gets the headers only.
        let body = if method == Method::GET {
            Body::new(ServedBody::new(
                image.data,
                source.clone(),
                Arc::clone(&self.metrics),
            ))
        } else {
            Body::empty()
        };

        debug!(%source, format = %image.format, size, cache_hit, "Serving thumbnail");
        builder.body(body).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build thumbnail response");
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        })
    }
}

/// GET and HEAD are the methods a thumbnail can be fetched with.
pub fn is_get_like(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

fn not_modified() -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NOT_MODIFIED;
    response
}

/// Format `t` as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn http_date(t: OffsetDateTime) -> HeaderValue {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    let text = t
        .to_offset(time::UtcOffset::UTC)
        .format(format)
        .unwrap_or_default();
    HeaderValue::from_str(&text).unwrap_or_else(|_| HeaderValue::from_static(""))
}
