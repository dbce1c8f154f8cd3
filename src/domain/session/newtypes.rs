// SPDX-License-Identifier: MPL-2.0
//! Session newtypes.
//!
//! Type-safe wrappers for the numeric session parameters, guaranteeing they
//! always stay within the ranges the studio accepts.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// Batch Size
// =============================================================================

/// Batch size bounds (1 to 4 results per request).
pub mod batch_bounds {
    /// Minimum number of results per request.
    pub const MIN: u8 = 1;
    /// Maximum number of results per request.
    pub const MAX: u8 = 4;
    /// Default number of results per request.
    pub const DEFAULT: u8 = 1;
}

/// Number of sequential backend units requested by one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchSize(u8);

impl BatchSize {
    /// A batch of exactly one unit.
    pub const SINGLE: Self = Self(1);

    /// Creates a batch size, clamping to the valid range.
    #[must_use]
    pub fn new(value: u8) -> Self {
        Self(value.clamp(batch_bounds::MIN, batch_bounds::MAX))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Returns the batch size as a loop bound.
    #[must_use]
    pub fn as_usize(self) -> usize {
        usize::from(self.0)
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        Self(batch_bounds::DEFAULT)
    }
}

// =============================================================================
// Render Fidelity
// =============================================================================

/// Render fidelity bounds (0% to 100%).
pub mod fidelity_bounds {
    /// Minimum fidelity.
    pub const MIN: u8 = 0;
    /// Maximum fidelity.
    pub const MAX: u8 = 100;
    /// Default fidelity: preserve the input structure as much as possible.
    pub const DEFAULT: u8 = 100;
    /// Values at or above this threshold request a strict interpretation.
    pub const STRICT_FROM: u8 = 80;
    /// Values below this threshold request a creative interpretation.
    pub const CREATIVE_BELOW: u8 = 40;
}

/// How strictly the backend should preserve the structure of the input image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fidelity(u8);

/// Coarse interpretation band derived from a [`Fidelity`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FidelityBand {
    Strict,
    Balanced,
    Creative,
}

impl Fidelity {
    /// Creates a fidelity value, clamping to 0..=100.
    #[must_use]
    pub fn new(value: u8) -> Self {
        Self(value.clamp(fidelity_bounds::MIN, fidelity_bounds::MAX))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn band(self) -> FidelityBand {
        if self.0 >= fidelity_bounds::STRICT_FROM {
            FidelityBand::Strict
        } else if self.0 < fidelity_bounds::CREATIVE_BELOW {
            FidelityBand::Creative
        } else {
            FidelityBand::Balanced
        }
    }
}

impl Default for Fidelity {
    fn default() -> Self {
        Self(fidelity_bounds::DEFAULT)
    }
}

// =============================================================================
// Brush Size
// =============================================================================

/// Mask brush size bounds in surface pixels.
pub mod brush_bounds {
    /// Minimum brush diameter.
    pub const MIN: u16 = 5;
    /// Maximum brush diameter.
    pub const MAX: u16 = 100;
    /// Default brush diameter.
    pub const DEFAULT: u16 = 10;
}

/// Diameter of the mask brush, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BrushSize(u16);

impl BrushSize {
    #[must_use]
    pub fn new(value: u16) -> Self {
        Self(value.clamp(brush_bounds::MIN, brush_bounds::MAX))
    }

    #[must_use]
    pub fn value(self) -> u16 {
        self.0
    }

    /// Stroke width usable by the drawing surface.
    #[must_use]
    pub fn as_stroke_width(self) -> f32 {
        f32::from(self.0)
    }
}

impl Default for BrushSize {
    fn default() -> Self {
        Self(brush_bounds::DEFAULT)
    }
}

// =============================================================================
// Percent
// =============================================================================

/// A position along one image axis, expressed in percent (0..=100).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Percent(f32);

impl Percent {
    /// The middle of the axis.
    pub const CENTER: Self = Self(50.0);

    /// Creates a percentage, clamping to 0..=100. NaN maps to 0.
    #[must_use]
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 100.0))
    }

    #[must_use]
    pub fn value(self) -> f32 {
        self.0
    }

    /// Resolves the percentage against a pixel extent.
    #[must_use]
    pub fn of(self, extent: u32) -> f32 {
        extent as f32 * self.0 / 100.0
    }
}

// =============================================================================
// Text Size
// =============================================================================

/// Text overlay size bounds, as a percentage of the image width.
pub mod text_size_bounds {
    pub const MIN: f32 = 1.0;
    pub const MAX: f32 = 50.0;
    pub const DEFAULT: f32 = 8.0;
}

/// Font size of a text overlay relative to the image width.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TextSize(f32);

impl TextSize {
    #[must_use]
    pub fn new(percent: f32) -> Self {
        if percent.is_nan() {
            return Self::default();
        }
        Self(percent.clamp(text_size_bounds::MIN, text_size_bounds::MAX))
    }

    #[must_use]
    pub fn value(self) -> f32 {
        self.0
    }

    /// Resolves the font size in pixels for an image of the given width.
    #[must_use]
    pub fn pixels_for_width(self, width: u32) -> f32 {
        width as f32 * self.0 / 100.0
    }
}

impl Default for TextSize {
    fn default() -> Self {
        Self(text_size_bounds::DEFAULT)
    }
}

// =============================================================================
// Serde
// =============================================================================

// Persisted values go back through the clamping constructors so a
// hand-edited snapshot can never smuggle an out-of-range value in.
macro_rules! clamped_serde {
    ($ty:ty, $raw:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.0.serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                <$raw>::deserialize(deserializer).map(<$ty>::new)
            }
        }
    };
}

clamped_serde!(BatchSize, u8);
clamped_serde!(Fidelity, u8);
clamped_serde!(BrushSize, u16);
clamped_serde!(Percent, f32);
clamped_serde!(TextSize, f32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_size_clamps_to_valid_range() {
        assert_eq!(BatchSize::new(0).value(), batch_bounds::MIN);
        assert_eq!(BatchSize::new(9).value(), batch_bounds::MAX);
        assert_eq!(BatchSize::new(3).value(), 3);
        assert_eq!(BatchSize::default().value(), 1);
    }

    #[test]
    fn fidelity_bands_follow_thresholds() {
        assert_eq!(Fidelity::new(100).band(), FidelityBand::Strict);
        assert_eq!(Fidelity::new(80).band(), FidelityBand::Strict);
        assert_eq!(Fidelity::new(79).band(), FidelityBand::Balanced);
        assert_eq!(Fidelity::new(40).band(), FidelityBand::Balanced);
        assert_eq!(Fidelity::new(39).band(), FidelityBand::Creative);
        assert_eq!(Fidelity::new(0).band(), FidelityBand::Creative);
    }

    #[test]
    fn fidelity_clamps_above_hundred() {
        assert_eq!(Fidelity::new(250).value(), 100);
    }

    #[test]
    fn brush_size_clamps() {
        assert_eq!(BrushSize::new(1).value(), brush_bounds::MIN);
        assert_eq!(BrushSize::new(500).value(), brush_bounds::MAX);
    }

    #[test]
    fn percent_rejects_nan_and_clamps() {
        assert_eq!(Percent::new(f32::NAN).value(), 0.0);
        assert_eq!(Percent::new(-3.0).value(), 0.0);
        assert_eq!(Percent::new(140.0).value(), 100.0);
        assert!((Percent::new(25.0).of(200) - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn text_size_resolves_against_width() {
        let size = TextSize::default();
        assert!((size.pixels_for_width(1000) - 80.0).abs() < f32::EPSILON);
    }

    #[test]
    fn deserialization_clamps_out_of_range_values() {
        let json_like = toml::Value::Integer(12);
        let batch: BatchSize = json_like.try_into().expect("deserialize batch size");
        assert_eq!(batch.value(), batch_bounds::MAX);
    }
}
