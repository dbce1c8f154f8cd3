// SPDX-License-Identifier: MPL-2.0
//! Geometric and colour transforms: crop, quarter-turn rotation and
//! whole-image filters.

use super::codec::{decode, encode_png};
use super::RasterError;
use crate::domain::media::EncodedImage;
use crate::domain::session::{CropRect, ImageFilter, Rotation};
use image_rs::{DynamicImage, Rgba, RgbaImage};

// ==========================================================================
// Crop & Rotate
// ==========================================================================

/// Crops `source` to a percentage rectangle.
///
/// The rectangle resolves against the natural pixel size of the image, so
/// the result has exactly the cropped pixel dimensions.
///
/// # Errors
///
/// Returns [`RasterError`] if the source cannot be decoded or the result
/// cannot be encoded.
pub fn crop(source: &EncodedImage, rect: &CropRect) -> Result<EncodedImage, RasterError> {
    let image = decode(source)?;
    let (x, y, width, height) = rect.to_pixels(image.width(), image.height());
    tracing::debug!(x, y, width, height, "cropping image");
    encode_png(&image.crop_imm(x, y, width, height))
}

/// Rotates `source` a quarter turn.
///
/// # Errors
///
/// Returns [`RasterError`] if the source cannot be decoded or the result
/// cannot be encoded.
pub fn rotate(source: &EncodedImage, rotation: Rotation) -> Result<EncodedImage, RasterError> {
    let image = decode(source)?;
    let rotated = match rotation {
        Rotation::Clockwise => image.rotate90(),
        Rotation::CounterClockwise => image.rotate270(),
    };
    encode_png(&rotated)
}

// ==========================================================================
// Filters
// ==========================================================================

/// Applies a colour filter to every pixel. Alpha is preserved.
///
/// # Errors
///
/// Returns [`RasterError`] if the source cannot be decoded or the result
/// cannot be encoded.
pub fn apply_filter(
    source: &EncodedImage,
    filter: ImageFilter,
) -> Result<EncodedImage, RasterError> {
    let mut pixels = decode(source)?.to_rgba8();
    filter_pixels(&mut pixels, filter);
    encode_png(&DynamicImage::ImageRgba8(pixels))
}

fn filter_pixels(pixels: &mut RgbaImage, filter: ImageFilter) {
    for pixel in pixels.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        let rgb = [r, g, b].map(|c| f32::from(c) / 255.0);
        let [r, g, b] = filter_rgb(rgb, filter).map(to_channel);
        *pixel = Rgba([r, g, b, a]);
    }
}

/// Filter passes use the CSS filter-effects colour matrices, clamping
/// between passes.
fn filter_rgb(rgb: [f32; 3], filter: ImageFilter) -> [f32; 3] {
    match filter {
        ImageFilter::Grayscale => grayscale(rgb, 1.0),
        ImageFilter::Sepia => sepia(rgb, 1.0),
        ImageFilter::Invert => rgb.map(|c| 1.0 - c),
        ImageFilter::Vintage => brightness(contrast(sepia(rgb, 0.6), 0.9), 0.9),
    }
}

fn grayscale(rgb: [f32; 3], amount: f32) -> [f32; 3] {
    let k = 1.0 - amount;
    apply_matrix(
        rgb,
        [
            [0.2126 + 0.7874 * k, 0.7152 - 0.7152 * k, 0.0722 - 0.0722 * k],
            [0.2126 - 0.2126 * k, 0.7152 + 0.2848 * k, 0.0722 - 0.0722 * k],
            [0.2126 - 0.2126 * k, 0.7152 - 0.7152 * k, 0.0722 + 0.9278 * k],
        ],
    )
}

fn sepia(rgb: [f32; 3], amount: f32) -> [f32; 3] {
    let k = 1.0 - amount;
    apply_matrix(
        rgb,
        [
            [0.393 + 0.607 * k, 0.769 - 0.769 * k, 0.189 - 0.189 * k],
            [0.349 - 0.349 * k, 0.686 + 0.314 * k, 0.168 - 0.168 * k],
            [0.272 - 0.272 * k, 0.534 - 0.534 * k, 0.131 + 0.869 * k],
        ],
    )
}

fn contrast(rgb: [f32; 3], amount: f32) -> [f32; 3] {
    rgb.map(|c| ((c - 0.5) * amount + 0.5).clamp(0.0, 1.0))
}

fn brightness(rgb: [f32; 3], amount: f32) -> [f32; 3] {
    rgb.map(|c| (c * amount).clamp(0.0, 1.0))
}

fn apply_matrix(rgb: [f32; 3], matrix: [[f32; 3]; 3]) -> [f32; 3] {
    matrix.map(|row| (row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2]).clamp(0.0, 1.0))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}
