//! Image format names and byte sniffing.

use std::fmt;

/// Detected format of an image.
///
/// The string form (see [`ImageFormat::as_str`]) is the short lowercase name
/// used in logs and in the handler's `Content-Type` mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Tiff,
    /// Canon raw camera format. Never delivered as-is.
    Cr2,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Cr2 => "cr2",
        }
    }

    /// Whether this is a raw camera format whose bytes are not a standard
    /// deliverable image.
    pub fn is_raw(&self) -> bool {
        matches!(self, ImageFormat::Cr2)
    }

    /// MIME type used when serving an image of this format.
    ///
    /// Only JPEG and PNG are ever produced by the scaler, so anything that is
    /// not JPEG is served as PNG. An unmodified GIF, WebP or TIFF original is
    /// passed through byte for byte and therefore goes out mislabelled as
    /// `image/png`.
    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            _ => "image/png",
        }
    }

    pub(crate) fn to_codec(self) -> Option<image::ImageFormat> {
        match self {
            ImageFormat::Jpeg => Some(image::ImageFormat::Jpeg),
            ImageFormat::Png => Some(image::ImageFormat::Png),
            ImageFormat::Gif => Some(image::ImageFormat::Gif),
            ImageFormat::Webp => Some(image::ImageFormat::WebP),
            ImageFormat::Tiff => Some(image::ImageFormat::Tiff),
            ImageFormat::Cr2 => None,
        }
    }

    fn from_codec(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
            image::ImageFormat::Png => Some(ImageFormat::Png),
            image::ImageFormat::Gif => Some(ImageFormat::Gif),
            image::ImageFormat::WebP => Some(ImageFormat::Webp),
            image::ImageFormat::Tiff => Some(ImageFormat::Tiff),
            _ => None,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CR2 files are little-endian TIFF with "CR" and major version 2 at offset 8.
fn is_cr2(data: &[u8]) -> bool {
    data.len() >= 11 && data.starts_with(b"II*\0") && &data[8..11] == b"CR\x02"
}

/// Detect the image format from the leading bytes of `data`.
///
/// Returns `None` when the bytes are not a recognised image.
pub fn sniff_format(data: &[u8]) -> Option<ImageFormat> {
    if is_cr2(data) {
        return Some(ImageFormat::Cr2);
    }
    image::guess_format(data)
        .ok()
        .and_then(ImageFormat::from_codec)
}
