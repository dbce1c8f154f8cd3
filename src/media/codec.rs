// SPDX-License-Identifier: MPL-2.0
//! Decoding, encoding and off-screen surfaces.
//!
//! Every raster operation follows the same shape: decode the encoded source,
//! draw into a surface owned by that operation alone, then encode the
//! surface back to PNG.

use super::RasterError;
use crate::domain::media::{EncodedImage, ImageKind};
use image_rs::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use std::io::Cursor;
use tiny_skia::{ColorU8, Pixmap};

/// Wraps raw encoded bytes after reading their format and dimensions.
///
/// # Errors
///
/// Returns [`RasterError::Decode`] when the bytes are not a supported raster
/// image.
pub fn probe(bytes: impl Into<Vec<u8>>) -> Result<EncodedImage, RasterError> {
    let bytes = bytes.into();
    let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .map_err(|err| RasterError::Decode(err.to_string()))?;
    let kind = reader
        .format()
        .and_then(kind_from_format)
        .ok_or_else(|| RasterError::Decode("unsupported image format".to_string()))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|err| RasterError::Decode(err.to_string()))?;
    if width == 0 || height == 0 {
        return Err(RasterError::Decode("image has no pixels".to_string()));
    }
    Ok(EncodedImage::new(bytes, kind, width, height))
}

/// Decodes an encoded image into pixels.
///
/// # Errors
///
/// Returns [`RasterError::Decode`] if decoding fails.
pub fn decode(image: &EncodedImage) -> Result<DynamicImage, RasterError> {
    image_rs::load_from_memory(image.bytes()).map_err(|err| RasterError::Decode(err.to_string()))
}

/// Encodes pixels as PNG.
///
/// # Errors
///
/// Returns [`RasterError::Encode`] if encoding fails.
pub fn encode_png(image: &DynamicImage) -> Result<EncodedImage, RasterError> {
    let (width, height) = (image.width(), image.height());
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|err| RasterError::Encode(err.to_string()))?;
    Ok(EncodedImage::new(buffer.into_inner(), ImageKind::Png, width, height))
}

/// Acquires an off-screen drawing surface.
///
/// # Errors
///
/// Returns [`RasterError::SurfaceUnavailable`] for zero or oversized
/// dimensions.
pub fn new_surface(width: u32, height: u32) -> Result<Pixmap, RasterError> {
    Pixmap::new(width, height).ok_or(RasterError::SurfaceUnavailable { width, height })
}

/// Decodes an encoded image straight into a premultiplied surface.
///
/// # Errors
///
/// Returns [`RasterError`] if decoding fails or no surface can be acquired.
pub fn decode_to_surface(image: &EncodedImage) -> Result<Pixmap, RasterError> {
    surface_from_rgba(&decode(image)?.to_rgba8())
}

/// Copies straight-alpha pixels into a new premultiplied surface.
///
/// # Errors
///
/// Returns [`RasterError::SurfaceUnavailable`] if no surface can be acquired.
pub fn surface_from_rgba(image: &RgbaImage) -> Result<Pixmap, RasterError> {
    let mut surface = new_surface(image.width(), image.height())?;
    for (dst, src) in surface.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(surface)
}

/// Encodes a surface as PNG.
///
/// # Errors
///
/// Returns [`RasterError::Encode`] if encoding fails.
pub fn encode_surface(surface: &Pixmap) -> Result<EncodedImage, RasterError> {
    let bytes = surface
        .encode_png()
        .map_err(|err| RasterError::Encode(err.to_string()))?;
    Ok(EncodedImage::new(
        bytes,
        ImageKind::Png,
        surface.width(),
        surface.height(),
    ))
}

fn kind_from_format(format: ImageFormat) -> Option<ImageKind> {
    match format {
        ImageFormat::Png => Some(ImageKind::Png),
        ImageFormat::Jpeg => Some(ImageKind::Jpeg),
        ImageFormat::WebP => Some(ImageKind::Webp),
        ImageFormat::Gif => Some(ImageKind::Gif),
        ImageFormat::Bmp => Some(ImageKind::Bmp),
        _ => None,
    }
}
