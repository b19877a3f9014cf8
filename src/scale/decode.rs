//! Bounded image decoding.
//!
//! The scaler treats decoding as a capability behind [`ImageDecode`] so that
//! the codec can be swapped (or counted, in tests). [`CodecDecoder`] is the
//! production implementation on top of the `image` crate.

use std::io::Cursor;

use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use thiserror::Error;

use super::cr2;
use super::format::{sniff_format, ImageFormat};

/// Size limits passed to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOpts {
    pub max_width: u32,
    pub max_height: u32,
}

/// Output of a decode.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub image: DynamicImage,

    /// Format detected from the source bytes
    pub format: ImageFormat,

    /// Whether pixels differ from the source beyond format bookkeeping
    /// (downscaled or re-oriented). When false the source bytes can be
    /// served unchanged.
    pub modified: bool,
}

impl Decoded {
    /// `(width, height)` of the decoded image.
    pub fn bounds(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct CodecError(pub String);

impl From<image::ImageError> for CodecError {
    fn from(err: image::ImageError) -> Self {
        CodecError(err.to_string())
    }
}

/// Decode capability used by the scaler.
pub trait ImageDecode: Send + Sync {
    /// Decode `data`, which may be downscaled to fit within `opts`.
    fn decode(&self, data: &[u8], opts: DecodeOpts) -> Result<Decoded, CodecError>;
}

/// Decoder built on the `image` crate.
///
/// CR2 sources are decoded from the JPEG preview embedded in IFD0.
/// Applies EXIF orientation and downscales with a triangle filter to fit the
/// bounds, preserving aspect ratio. Either step marks the result modified.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodecDecoder;

impl CodecDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl ImageDecode for CodecDecoder {
    fn decode(&self, data: &[u8], opts: DecodeOpts) -> Result<Decoded, CodecError> {
        let format =
            sniff_format(data).ok_or_else(|| CodecError("unrecognized image format".into()))?;

        let (mut image, orientation) = match format.to_codec() {
            Some(codec) => {
                let mut decoder =
                    ImageReader::with_format(Cursor::new(data), codec).into_decoder()?;
                let orientation = decoder.orientation()?;
                (DynamicImage::from_decoder(decoder)?, orientation)
            }
            // Raw: decode the embedded preview, oriented by the IFD0 tag.
            None => {
                let (preview, tag) = cr2::preview_jpeg(data)?;
                let image =
                    ImageReader::with_format(Cursor::new(preview), image::ImageFormat::Jpeg)
                        .decode()?;
                let orientation = tag
                    .and_then(|t| u8::try_from(t).ok())
                    .and_then(Orientation::from_exif)
                    .unwrap_or(Orientation::NoTransforms);
                (image, orientation)
            }
        };

        let mut modified = false;
        if orientation != Orientation::NoTransforms {
            image.apply_orientation(orientation);
            modified = true;
        }
        if image.width() > opts.max_width || image.height() > opts.max_height {
            image = image.resize(opts.max_width, opts.max_height, FilterType::Triangle);
            modified = true;
        }

        Ok(Decoded {
            image,
            format,
            modified,
        })
    }
}
