//! The read → decode → crop → encode pipeline.
//!
//! ```text
//!   slurp gate (5)            resize gate (2)
//! ┌────────────────┐   ┌──────────────────────────────────────┐
//! │ fetch source   │ → │ decode (bounded) → square crop →      │
//! │ into memory    │   │ reuse source bytes or re-encode       │
//! └────────────────┘   └──────────────────────────────────────┘
//! ```
//!
//! The slurp slot is released before the resize slot is requested, so a
//! single scale never holds both. Decode and encode run on the blocking pool.

use std::sync::Arc;

use bytes::Bytes;

use super::crop::square_crop;
use super::decode::{DecodeOpts, ImageDecode};
use super::encode::OutputEncoder;
use super::format::ImageFormat;
use super::gate::{Gate, DEFAULT_RESIZE_CONCURRENCY, DEFAULT_SLURP_CONCURRENCY};
use crate::blob::{BlobStore, ContentRef};
use crate::error::ScaleError;
use crate::metrics::{Metrics, NoopMetrics};

// =============================================================================
// Request / Result
// =============================================================================

/// Parameters of a single scale operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleRequest {
    /// Source image blob
    pub source: ContentRef,

    /// Maximum output width in pixels
    pub max_width: u32,

    /// Maximum output height in pixels
    pub max_height: u32,

    /// Crop the output to a centered square
    pub square: bool,
}

/// Encoded output of the scaler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaledImage {
    pub format: ImageFormat,
    pub data: Bytes,
}

// =============================================================================
// Scaler
// =============================================================================

pub struct Scaler<S> {
    store: Arc<S>,
    decoder: Arc<dyn ImageDecode>,
    slurp: Gate,
    resize: Gate,
    metrics: Arc<dyn Metrics>,
}

impl<S: BlobStore> Scaler<S> {
    /// Create a scaler with the default gate capacities and no metrics.
    pub fn new(store: Arc<S>, decoder: Arc<dyn ImageDecode>) -> Self {
        Self::with_gates(
            store,
            decoder,
            Gate::new("slurp", DEFAULT_SLURP_CONCURRENCY),
            Gate::new("resize", DEFAULT_RESIZE_CONCURRENCY),
        )
    }

    /// Create a scaler with explicit gates.
    pub fn with_gates(
        store: Arc<S>,
        decoder: Arc<dyn ImageDecode>,
        slurp: Gate,
        resize: Gate,
    ) -> Self {
        Self {
            store,
            decoder,
            slurp,
            resize,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Report fetched byte counts to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn slurp_gate(&self) -> &Gate {
        &self.slurp
    }

    pub fn resize_gate(&self) -> &Gate {
        &self.resize
    }

    /// Produce the scaled image described by `request`.
    pub async fn scale(&self, request: &ScaleRequest) -> Result<ScaledImage, ScaleError> {
        let data = {
            let _slurp = self.slurp.acquire().await;
            self.store
                .fetch(&request.source)
                .await
                .map_err(|e| ScaleError::Read {
                    source_ref: request.source.clone(),
                    message: e.to_string(),
                })?
        };
        self.metrics.add_bytes_fetched(data.len() as u64);

        let _resize = self.resize.acquire().await;

        let decoder = Arc::clone(&self.decoder);
        let request = request.clone();
        let source_ref = request.source.clone();
        tokio::task::spawn_blocking(move || transform(decoder.as_ref(), &request, data))
            .await
            .map_err(|e| ScaleError::Decode {
                source_ref,
                message: format!("scaling task failed: {}", e),
            })?
    }
}

/// Decode, crop and (if needed) re-encode `data`.
fn transform(
    decoder: &dyn ImageDecode,
    request: &ScaleRequest,
    data: Bytes,
) -> Result<ScaledImage, ScaleError> {
    let opts = DecodeOpts {
        max_width: request.max_width,
        max_height: request.max_height,
    };
    let decoded = decoder
        .decode(&data, opts)
        .map_err(|e| ScaleError::Decode {
            source_ref: request.source.clone(),
            message: e.to_string(),
        })?;

    let format = decoded.format;
    let (width, height) = decoded.bounds();
    // Raw camera bytes are never a deliverable image.
    let mut reuse_original = !decoded.modified && !format.is_raw();

    let mut image = decoded.image;
    if request.square && width != height {
        image = square_crop(&image);
        reuse_original = false;
    }

    if reuse_original {
        return Ok(ScaledImage { format, data });
    }

    let encoder = OutputEncoder::for_source(format);
    let encoded = encoder.encode(&image).map_err(|e| ScaleError::Encode {
        source_ref: request.source.clone(),
        message: e.to_string(),
    })?;

    Ok(ScaledImage {
        format: encoder.output_format(),
        data: Bytes::from(encoded),
    })
}

// =============================================================================
// Tests
// =============================================================================
