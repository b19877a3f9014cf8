//! Output encoding policy.
//!
//! The encoder is picked from the detected source format through a small
//! closed table ([`OutputEncoder::for_source`]). PNG stays PNG, everything
//! else (raw camera files included) becomes a JPEG at [`JPEG_QUALITY`].

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageFormat as CodecFormat};

use super::decode::CodecError;
use super::format::ImageFormat;

/// Fixed quality of every JPEG produced by the scaler.
pub const JPEG_QUALITY: u8 = 90;

/// Encoder strategy for scaled output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEncoder {
    Png,
    Jpeg { quality: u8 },
}

impl OutputEncoder {
    /// Choose the encoder for an image decoded from `source`.
    pub fn for_source(source: ImageFormat) -> Self {
        match source {
            ImageFormat::Png => OutputEncoder::Png,
            ImageFormat::Cr2
            | ImageFormat::Jpeg
            | ImageFormat::Gif
            | ImageFormat::Webp
            | ImageFormat::Tiff => OutputEncoder::Jpeg {
                quality: JPEG_QUALITY,
            },
        }
    }

    /// Format of the bytes this encoder produces.
    pub fn output_format(&self) -> ImageFormat {
        match self {
            OutputEncoder::Png => ImageFormat::Png,
            OutputEncoder::Jpeg { .. } => ImageFormat::Jpeg,
        }
    }

    pub fn encode(&self, image: &DynamicImage) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::new();
        match *self {
            OutputEncoder::Png => {
                image.write_to(&mut Cursor::new(&mut buf), CodecFormat::Png)?;
            }
            OutputEncoder::Jpeg { quality } => {
                let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
                // JPEG has no alpha and no 16-bit samples.
                match image.color() {
                    ColorType::L8 | ColorType::Rgb8 => image.write_with_encoder(encoder)?,
                    ColorType::L16 | ColorType::La8 | ColorType::La16 => {
                        DynamicImage::ImageLuma8(image.to_luma8()).write_with_encoder(encoder)?
                    }
                    _ => DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)?,
                }
            }
        }
        Ok(buf)
    }
}
