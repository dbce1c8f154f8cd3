// SPDX-License-Identifier: MPL-2.0
//! Percentage-based crop rectangle.

use serde::{Deserialize, Serialize};

/// Crop rectangle constraints, in percent of the image dimensions.
pub mod crop_bounds {
    /// Smallest width or height a crop rectangle may shrink to.
    pub const MIN_EXTENT: f32 = 5.0;
    /// Far edge of either axis.
    pub const FULL: f32 = 100.0;
    /// Rectangle used for a fresh session.
    pub const DEFAULT_ORIGIN: f32 = 25.0;
    pub const DEFAULT_EXTENT: f32 = 50.0;
}

/// A crop region expressed in percent of the image's natural dimensions.
///
/// Every constructor and mutation goes through [`CropRect::clamped`], so a
/// value of this type always satisfies `x, y >= 0`, `width, height >= 5`,
/// `x + width <= 100` and `y + height <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCropRect", into = "RawCropRect")]
pub struct CropRect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl CropRect {
    /// Builds a rectangle from unconstrained values.
    #[must_use]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::clamped(x, y, width, height)
    }

    /// The whole image.
    #[must_use]
    pub fn full() -> Self {
        Self::clamped(0.0, 0.0, crop_bounds::FULL, crop_bounds::FULL)
    }

    /// Applies the crop constraints in a fixed order: extents are floored at
    /// the minimum, the origin is floored at zero (and kept far enough from
    /// the far edge to leave room for the minimum extent), then the extents
    /// are capped so the rectangle ends at the far edge at most.
    #[must_use]
    pub fn clamped(x: f32, y: f32, width: f32, height: f32) -> Self {
        let sanitize = |v: f32| if v.is_finite() { v } else { 0.0 };
        let (x, y, width, height) = (sanitize(x), sanitize(y), sanitize(width), sanitize(height));

        let width = width.max(crop_bounds::MIN_EXTENT);
        let height = height.max(crop_bounds::MIN_EXTENT);

        let max_origin = crop_bounds::FULL - crop_bounds::MIN_EXTENT;
        let x = x.max(0.0).min(max_origin);
        let y = y.max(0.0).min(max_origin);

        Self {
            x,
            y,
            width: width.min(crop_bounds::FULL - x),
            height: height.min(crop_bounds::FULL - y),
        }
    }

    #[must_use]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[must_use]
    pub fn y(&self) -> f32 {
        self.y
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Returns a copy translated by the given percentage deltas, re-clamped.
    #[must_use]
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self::clamped(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Resolves the rectangle against natural pixel dimensions.
    ///
    /// Returns `(x, y, width, height)` in pixels. The pixel rectangle always
    /// lies inside the image and is at least one pixel in each direction.
    #[must_use]
    pub fn to_pixels(&self, natural_width: u32, natural_height: u32) -> (u32, u32, u32, u32) {
        let resolve = |percent: f32, extent: u32| -> u32 {
            let px = (f64::from(extent) * f64::from(percent) / 100.0).floor();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let px = px.max(0.0) as u32;
            px.min(extent)
        };

        let px = resolve(self.x, natural_width).min(natural_width.saturating_sub(1));
        let py = resolve(self.y, natural_height).min(natural_height.saturating_sub(1));
        let pw = resolve(self.width, natural_width)
            .max(1)
            .min(natural_width.saturating_sub(px).max(1));
        let ph = resolve(self.height, natural_height)
            .max(1)
            .min(natural_height.saturating_sub(py).max(1));
        (px, py, pw, ph)
    }
}

impl Default for CropRect {
    fn default() -> Self {
        Self::clamped(
            crop_bounds::DEFAULT_ORIGIN,
            crop_bounds::DEFAULT_ORIGIN,
            crop_bounds::DEFAULT_EXTENT,
            crop_bounds::DEFAULT_EXTENT,
        )
    }
}

#[derive(Serialize, Deserialize)]
struct RawCropRect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl From<RawCropRect> for CropRect {
    fn from(raw: RawCropRect) -> Self {
        Self::clamped(raw.x, raw.y, raw.width, raw.height)
    }
}

impl From<CropRect> for RawCropRect {
    fn from(rect: CropRect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariants(rect: &CropRect) {
        assert!(rect.x() >= 0.0, "{rect:?}");
        assert!(rect.y() >= 0.0, "{rect:?}");
        assert!(rect.width() >= crop_bounds::MIN_EXTENT, "{rect:?}");
        assert!(rect.height() >= crop_bounds::MIN_EXTENT, "{rect:?}");
        assert!(rect.x() + rect.width() <= 100.0 + f32::EPSILON, "{rect:?}");
        assert!(rect.y() + rect.height() <= 100.0 + f32::EPSILON, "{rect:?}");
    }

    #[test]
    fn default_is_centered_half() {
        let rect = CropRect::default();
        assert_eq!(
            (rect.x(), rect.y(), rect.width(), rect.height()),
            (25.0, 25.0, 50.0, 50.0)
        );
    }

    #[test]
    fn tiny_extents_are_floored() {
        let rect = CropRect::new(10.0, 10.0, 1.0, -4.0);
        assert_eq!(rect.width(), 5.0);
        assert_eq!(rect.height(), 5.0);
    }

    #[test]
    fn negative_origin_is_floored_at_zero() {
        let rect = CropRect::new(-12.0, -1.0, 40.0, 40.0);
        assert_eq!((rect.x(), rect.y()), (0.0, 0.0));
    }

    #[test]
    fn extents_are_capped_at_far_edge() {
        let rect = CropRect::new(70.0, 60.0, 50.0, 80.0);
        assert_eq!(rect.width(), 30.0);
        assert_eq!(rect.height(), 40.0);
        assert_invariants(&rect);
    }

    #[test]
    fn origin_near_far_edge_keeps_minimum_extent() {
        let rect = CropRect::new(99.0, 98.0, 20.0, 20.0);
        assert_invariants(&rect);
        assert_eq!(rect.x(), 95.0);
    }

    #[test]
    fn non_finite_values_are_sanitized() {
        let rect = CropRect::new(f32::NAN, f32::INFINITY, f32::NAN, 30.0);
        assert_invariants(&rect);
    }

    #[test]
    fn translation_reclamps() {
        let rect = CropRect::default().translated(80.0, -80.0);
        assert_invariants(&rect);
        assert_eq!(rect.y(), 0.0);
    }

    #[test]
    fn pixels_use_natural_dimensions() {
        let rect = CropRect::new(25.0, 50.0, 50.0, 25.0);
        assert_eq!(rect.to_pixels(400, 200), (100, 100, 200, 50));
    }

    #[test]
    fn pixels_never_leave_image() {
        let rect = CropRect::new(95.0, 95.0, 5.0, 5.0);
        let (x, y, w, h) = rect.to_pixels(3, 3);
        assert!(x + w <= 3);
        assert!(y + h <= 3);
        assert!(w >= 1 && h >= 1);
    }

    #[test]
    fn deserialization_clamps() {
        let rect: CropRect = toml::from_str("x = -5.0\ny = 0.0\nwidth = 200.0\nheight = 1.0")
            .expect("deserialize crop rect");
        assert_invariants(&rect);
    }
}
