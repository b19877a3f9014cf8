//! Image scaling.
//!
//! # Components
//!
//! - [`Gate`]: bounded admission for the slurp and resize stages
//! - [`Group`]: singleflight group collapsing identical concurrent work
//! - [`ImageDecode`] / [`CodecDecoder`]: bounded decoding capability
//! - [`OutputEncoder`]: format-to-encoder dispatch table
//! - [`Scaler`]: the full pipeline producing a [`ScaledImage`]

mod cr2;
mod crop;
mod decode;
mod encode;
mod format;
mod gate;
mod scaler;
mod singleflight;

pub use crop::{centered_square, square_crop};
pub use decode::{CodecDecoder, CodecError, DecodeOpts, Decoded, ImageDecode};
pub use encode::{OutputEncoder, JPEG_QUALITY};
pub use format::{sniff_format, ImageFormat};
pub use gate::{Gate, GatePermit, DEFAULT_RESIZE_CONCURRENCY, DEFAULT_SLURP_CONCURRENCY};
pub use scaler::{ScaleRequest, ScaledImage, Scaler};
pub use singleflight::{Abandoned, Group};
