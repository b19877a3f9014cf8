use image::{DynamicImage, GenericImageView};

/// Region `(x, y, side)` of the centered square inside a `width × height` image.
///
/// The longer dimension is trimmed by `(long - short) / 2` at the leading
/// edge; any odd remainder comes off the trailing edge.
pub fn centered_square(width: u32, height: u32) -> (u32, u32, u32) {
    if width > height {
        ((width - height) / 2, 0, height)
    } else {
        (0, (height - width) / 2, width)
    }
}

/// Crop `image` to its centered square. Square inputs are returned unchanged.
pub fn square_crop(image: &DynamicImage) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width == height {
        return image.clone();
    }
    let (x, y, side) = centered_square(width, height);
    image.crop_imm(x, y, side, side)
}
