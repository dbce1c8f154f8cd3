// SPDX-License-Identifier: MPL-2.0
//! Compositing operations: letterbox padding, watermarking, text burn-in
//! and mask inversion.

use super::codec::{decode_to_surface, encode_surface, new_surface};
use super::text::{draw_text, TextAnchor, TextLayer};
use super::RasterError;
use crate::domain::media::EncodedImage;
use crate::domain::session::{AspectRatio, TextColor, TextOverlay};
use tiny_skia::{BlendMode, Color, FilterQuality, Pixmap, PixmapPaint, Transform};

/// Ratios closer than this are considered equal.
pub const ASPECT_TOLERANCE: f64 = 0.01;

/// Longest watermark side, relative to the image width.
const WATERMARK_MAX_FRACTION: f32 = 0.20;
/// Distance between the watermark and the bottom-right corner.
const WATERMARK_MARGIN_FRACTION: f32 = 0.02;
const WATERMARK_OPACITY: f32 = 0.8;

const BRAND_MIN_FONT_SIZE: f32 = 16.0;
const BRAND_INSET: f32 = 15.0;
const BRAND_OPACITY: f32 = 0.5;
const BRAND_SHADOW_BLUR: f32 = 5.0;
const BRAND_FONT: &str = "sans-serif";

const TEXT_SHADOW_OPACITY: f32 = 0.7;
const TEXT_MIN_SHADOW_BLUR: f32 = 2.0;

// ==========================================================================
// Aspect Padding
// ==========================================================================

/// Letterboxes `source` with black bars so it matches `target`.
///
/// Sources already within [`ASPECT_TOLERANCE`] of the target are returned
/// unchanged, which makes the operation idempotent. Relatively wider
/// sources get bars on top and bottom, relatively taller ones on the sides.
///
/// # Errors
///
/// Returns [`RasterError`] if decoding, surface allocation or encoding
/// fails.
pub fn pad_to_aspect(
    source: &EncodedImage,
    target: AspectRatio,
) -> Result<EncodedImage, RasterError> {
    let (width, height) = source.dimensions();
    let Some((canvas_width, canvas_height)) = padded_dimensions(width, height, target.ratio())
    else {
        return Ok(source.clone());
    };

    let mut canvas = new_surface(canvas_width, canvas_height)?;
    canvas.fill(Color::BLACK);

    let content = decode_to_surface(source)?;
    let x_offset = (canvas_width - width) / 2;
    let y_offset = (canvas_height - height) / 2;
    canvas.draw_pixmap(
        offset(x_offset),
        offset(y_offset),
        content.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );

    tracing::debug!(
        from = ?(width, height),
        to = ?(canvas_width, canvas_height),
        ratio = target.as_str(),
        "padded image to aspect ratio"
    );
    encode_surface(&canvas)
}

/// Canvas size containing a `width`x`height` image at `ratio`, or `None`
/// when no padding is needed.
fn padded_dimensions(width: u32, height: u32, ratio: f64) -> Option<(u32, u32)> {
    let source_ratio = f64::from(width) / f64::from(height);
    if (source_ratio - ratio).abs() < ASPECT_TOLERANCE {
        return None;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (fitted_width, fitted_height) = (
        (f64::from(height) * ratio).round() as u32,
        (f64::from(width) / ratio).round() as u32,
    );
    // A previous pad rounds to exactly one of these.
    if fitted_width == width || fitted_height == height {
        return None;
    }

    let dims = if source_ratio > ratio {
        (width, fitted_height.max(height))
    } else {
        (fitted_width.max(width), height)
    };
    (dims != (width, height)).then_some(dims)
}

#[allow(clippy::cast_possible_wrap)]
fn offset(value: u32) -> i32 {
    value.min(i32::MAX as u32) as i32
}

// ==========================================================================
// Watermark
// ==========================================================================

/// What gets stamped in the bottom-right corner.
#[derive(Debug, Clone, Copy)]
pub enum WatermarkSource<'a> {
    /// A user-supplied logo image.
    Image(&'a EncodedImage),
    /// A fallback brand label.
    Text(&'a str),
}

/// Stamps a watermark in the bottom-right corner of `source`.
///
/// Logo images are scaled down so that neither side exceeds a fifth of the
/// image width and drawn at 80% opacity with a 2% margin. The text label
/// is drawn at half opacity with a drop shadow.
///
/// # Errors
///
/// Returns [`RasterError`] if decoding, drawing or encoding fails.
pub fn watermark(
    source: &EncodedImage,
    mark: WatermarkSource<'_>,
) -> Result<EncodedImage, RasterError> {
    let mut surface = decode_to_surface(source)?;
    match mark {
        WatermarkSource::Image(logo) => stamp_logo(&mut surface, logo)?,
        WatermarkSource::Text(label) => stamp_label(&mut surface, label)?,
    }
    encode_surface(&surface)
}

fn stamp_logo(surface: &mut Pixmap, logo: &EncodedImage) -> Result<(), RasterError> {
    let logo = decode_to_surface(logo)?;
    let (width, height) = (surface.width() as f32, surface.height() as f32);
    let (logo_width, logo_height) = (logo.width() as f32, logo.height() as f32);

    let max_side = width * WATERMARK_MAX_FRACTION;
    let scale = (max_side / logo_width).min(max_side / logo_height).min(1.0);
    let x = width - logo_width * scale - width * WATERMARK_MARGIN_FRACTION;
    let y = height - logo_height * scale - height * WATERMARK_MARGIN_FRACTION;

    let paint = PixmapPaint {
        opacity: WATERMARK_OPACITY,
        blend_mode: BlendMode::SourceOver,
        quality: FilterQuality::Bicubic,
    };
    surface.draw_pixmap(
        0,
        0,
        logo.as_ref(),
        &paint,
        Transform::from_row(scale, 0.0, 0.0, scale, x, y),
        None,
    );
    Ok(())
}

fn stamp_label(surface: &mut Pixmap, label: &str) -> Result<(), RasterError> {
    if label.trim().is_empty() {
        return Ok(());
    }
    let (width, height) = (surface.width() as f32, surface.height() as f32);
    draw_text(
        surface,
        &TextLayer {
            text: label,
            font_family: BRAND_FONT,
            font_size: (width / 40.0).max(BRAND_MIN_FONT_SIZE),
            color: TextColor::WHITE,
            opacity: BRAND_OPACITY,
            anchor: TextAnchor::BottomRight,
            x: width - BRAND_INSET,
            y: height - BRAND_INSET,
            shadow_blur: BRAND_SHADOW_BLUR,
            shadow_opacity: TEXT_SHADOW_OPACITY,
        },
    )
}

// ==========================================================================
// Text Burn-in
// ==========================================================================

/// Burns `overlay` into `source`, centred on its relative position.
///
/// # Errors
///
/// Returns [`RasterError::InvalidParameter`] for blank text, or another
/// [`RasterError`] if decoding, layout or encoding fails.
pub fn burn_text(source: &EncodedImage, overlay: &TextOverlay) -> Result<EncodedImage, RasterError> {
    if overlay.text.trim().is_empty() {
        return Err(RasterError::InvalidParameter(
            "text overlay is empty".to_string(),
        ));
    }

    let mut surface = decode_to_surface(source)?;
    let font_size = overlay.size.pixels_for_width(surface.width());
    let (x, y) = (overlay.x.of(surface.width()), overlay.y.of(surface.height()));
    draw_text(
        &mut surface,
        &TextLayer {
            text: &overlay.text,
            font_family: &overlay.font,
            font_size,
            color: overlay.color,
            opacity: 1.0,
            anchor: TextAnchor::Center,
            x,
            y,
            shadow_blur: (font_size / 20.0).max(TEXT_MIN_SHADOW_BLUR),
            shadow_opacity: TEXT_SHADOW_OPACITY,
        },
    )?;
    encode_surface(&surface)
}

// ==========================================================================
// Mask Inversion
// ==========================================================================

/// Inverts a mask relative to the base image it belongs to.
///
/// The result has the base image's natural size. It is opaque white
/// wherever `mask` was transparent and transparent wherever it was opaque.
/// Without a mask the whole image becomes maskable.
///
/// # Errors
///
/// Returns [`RasterError`] if decoding, surface allocation or encoding
/// fails.
pub fn invert_mask(
    base: &EncodedImage,
    mask: Option<&EncodedImage>,
) -> Result<EncodedImage, RasterError> {
    let (width, height) = base.dimensions();
    let mut surface = new_surface(width, height)?;
    surface.fill(Color::WHITE);

    if let Some(mask) = mask {
        let stencil = decode_to_surface(mask)?;
        let scale_x = width as f32 / stencil.width() as f32;
        let scale_y = height as f32 / stencil.height() as f32;
        let same_size = stencil.width() == width && stencil.height() == height;
        let paint = PixmapPaint {
            opacity: 1.0,
            blend_mode: BlendMode::DestinationOut,
            quality: if same_size {
                FilterQuality::Nearest
            } else {
                FilterQuality::Bilinear
            },
        };
        surface.draw_pixmap(
            0,
            0,
            stencil.as_ref(),
            &paint,
            Transform::from_scale(scale_x, scale_y),
            None,
        );
    }

    encode_surface(&surface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::{Percent, TextSize};
    use crate::media::codec::test_images::{from_fn, pixels, solid};

    #[test]
    fn matching_ratio_is_returned_untouched() {
        let img = solid(160, 90, [1, 2, 3, 255]);
        let padded = pad_to_aspect(&img, AspectRatio::Widescreen).expect("pad");
        assert!(padded.same_buffer(&img));
    }

    #[test]
    fn taller_source_gets_side_bars() {
        let img = solid(400, 300, [200, 200, 200, 255]);
        let padded = pad_to_aspect(&img, AspectRatio::Widescreen).expect("pad");
        assert_eq!(padded.dimensions(), (533, 300));

        let px = pixels(&padded);
        assert_eq!(px.get_pixel(0, 150).0, [0, 0, 0, 255]);
        assert_eq!(px.get_pixel(532, 150).0, [0, 0, 0, 255]);
        assert_eq!(px.get_pixel(266, 150).0, [200, 200, 200, 255]);
    }

    #[test]
    fn wider_source_gets_top_and_bottom_bars() {
        let img = solid(400, 100, [10, 200, 10, 255]);
        let padded = pad_to_aspect(&img, AspectRatio::Square).expect("pad");
        assert_eq!(padded.dimensions(), (400, 400));

        let px = pixels(&padded);
        assert_eq!(px.get_pixel(200, 10).0, [0, 0, 0, 255]);
        assert_eq!(px.get_pixel(200, 149).0, [0, 0, 0, 255]);
        assert_eq!(px.get_pixel(200, 150).0, [10, 200, 10, 255]);
        assert_eq!(px.get_pixel(200, 249).0, [10, 200, 10, 255]);
        assert_eq!(px.get_pixel(200, 250).0, [0, 0, 0, 255]);
    }

    #[test]
    fn padding_twice_equals_padding_once() {
        for ratio in AspectRatio::ALL {
            let img = solid(123, 77, [50, 60, 70, 255]);
            let once = pad_to_aspect(&img, ratio).expect("pad");
            let twice = pad_to_aspect(&once, ratio).expect("pad");
            assert!(twice.same_buffer(&once), "{ratio} was not idempotent");
        }
    }

    #[test]
    fn padded_sizes_are_fixed_points_for_every_small_size() {
        for ratio in AspectRatio::ALL {
            for width in 1..=60 {
                for height in 1..=60 {
                    let Some((w, h)) = padded_dimensions(width, height, ratio.ratio()) else {
                        continue;
                    };
                    assert!(w >= width && h >= height);
                    assert_eq!(
                        padded_dimensions(w, h, ratio.ratio()),
                        None,
                        "{width}x{height} at {ratio} padded to {w}x{h}"
                    );
                }
            }
        }
    }

    #[test]
    fn narrow_portrait_sources_pad_once() {
        assert_eq!(padded_dimensions(1, 3, AspectRatio::Tall.ratio()), Some((2, 3)));
        assert_eq!(padded_dimensions(2, 3, AspectRatio::Tall.ratio()), None);
        assert_eq!(
            padded_dimensions(1, 10, AspectRatio::ClassicPortrait.ratio()),
            Some((8, 10))
        );
        assert_eq!(padded_dimensions(8, 10, AspectRatio::ClassicPortrait.ratio()), None);
    }

    #[test]
    fn tiny_images_that_round_to_themselves_stay_untouched() {
        let img = solid(18, 10, [1, 1, 1, 255]);
        let padded = pad_to_aspect(&img, AspectRatio::Widescreen).expect("pad");
        assert!(padded.same_buffer(&img));
    }

    #[test]
    fn logo_watermark_lands_in_bottom_right_corner() {
        let base = solid(1000, 500, [255, 255, 255, 255]);
        let logo = solid(400, 400, [255, 0, 0, 255]);
        let marked = watermark(&base, WatermarkSource::Image(&logo)).expect("watermark");
        assert_eq!(marked.dimensions(), (1000, 500));

        let px = pixels(&marked);
        // Logo scaled to 200x200 at (780, 290).
        let [r, g, b, a] = px.get_pixel(880, 390).0;
        assert_eq!(a, 255);
        assert!(r > 240, "red channel stays saturated, got {r}");
        assert!(g < 80 && b < 80, "80% red over white, got {g}/{b}");
        assert_eq!(px.get_pixel(10, 10).0, [255, 255, 255, 255]);
        assert_eq!(px.get_pixel(770, 390).0, [255, 255, 255, 255]);
    }

    #[test]
    fn small_logos_are_not_upscaled() {
        let base = solid(1000, 1000, [255, 255, 255, 255]);
        let logo = solid(10, 10, [0, 0, 255, 255]);
        let marked = watermark(&base, WatermarkSource::Image(&logo)).expect("watermark");
        let px = pixels(&marked);
        // Unscaled 10x10 logo at (970, 970).
        assert!(px.get_pixel(975, 975).0[0] < 100);
        assert_eq!(px.get_pixel(965, 975).0, [255, 255, 255, 255]);
    }

    #[test]
    fn text_watermark_keeps_dimensions() {
        let base = solid(320, 200, [30, 30, 30, 255]);
        let marked = watermark(&base, WatermarkSource::Text("AI Image Studio")).expect("watermark");
        assert_eq!(marked.dimensions(), (320, 200));

        let (before, after) = (pixels(&base), pixels(&marked));
        let changed = before.pixels().zip(after.pixels()).filter(|(a, b)| a != b).count();
        assert!(changed > 0, "brand text left the image untouched");
    }

    #[test]
    fn burn_text_rejects_blank_text() {
        let base = solid(10, 10, [0, 0, 0, 255]);
        let overlay = TextOverlay {
            text: "   ".into(),
            ..TextOverlay::default()
        };
        assert!(matches!(
            burn_text(&base, &overlay),
            Err(RasterError::InvalidParameter(_))
        ));
    }

    #[test]
    fn burn_text_keeps_dimensions() {
        let base = solid(240, 120, [0, 0, 0, 255]);
        let overlay = TextOverlay {
            text: "Hello".into(),
            size: TextSize::new(10.0),
            x: Percent::new(25.0),
            y: Percent::new(75.0),
            ..TextOverlay::default()
        };
        let burned = burn_text(&base, &overlay).expect("burn");
        assert_eq!(burned.dimensions(), (240, 120));

        let (before, after) = (pixels(&base), pixels(&burned));
        let changed = before.pixels().zip(after.pixels()).filter(|(a, b)| a != b).count();
        assert!(changed > 0, "text left the image untouched");
    }

    #[test]
    fn inverting_nothing_gives_a_fully_maskable_buffer() {
        let base = solid(8, 6, [0, 0, 0, 255]);
        let inverted = invert_mask(&base, None).expect("invert");
        assert_eq!(inverted.dimensions(), (8, 6));
        assert!(pixels(&inverted).pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn inverting_twice_restores_the_mask() {
        let base = solid(16, 16, [0, 0, 0, 255]);
        let mask = from_fn(16, 16, |x, y| {
            if (4..10).contains(&x) && (2..8).contains(&y) {
                [255, 255, 255, 255]
            } else {
                [0, 0, 0, 0]
            }
        });
        let once = invert_mask(&base, Some(&mask)).expect("invert");
        assert_eq!(pixels(&once).get_pixel(5, 5).0[3], 0);
        assert_eq!(pixels(&once).get_pixel(0, 0).0, [255, 255, 255, 255]);

        let twice = invert_mask(&base, Some(&once)).expect("invert");
        let (original, restored) = (pixels(&mask), pixels(&twice));
        for (a, b) in original.pixels().zip(restored.pixels()) {
            assert_eq!(a.0[3], b.0[3]);
        }
    }

    #[test]
    fn inverted_mask_follows_base_dimensions() {
        let base = solid(40, 20, [0, 0, 0, 255]);
        let mask = solid(20, 10, [255, 255, 255, 255]);
        let inverted = invert_mask(&base, Some(&mask)).expect("invert");
        assert_eq!(inverted.dimensions(), (40, 20));
        assert_eq!(pixels(&inverted).get_pixel(20, 10).0[3], 0);
    }
}
