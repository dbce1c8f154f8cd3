// SPDX-License-Identifier: MPL-2.0
//! Enumerated selectors of the creative session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The active creative workflow. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudioMode {
    #[default]
    Create,
    Edit,
    Render,
    Video,
}

impl StudioMode {
    /// Modes that operate on a base image carried over from the screen.
    #[must_use]
    pub fn carries_base_image(self) -> bool {
        matches!(self, Self::Edit | Self::Render | Self::Video)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Render => "render",
            Self::Video => "video",
        }
    }
}

impl FromStr for StudioMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "edit" => Ok(Self::Edit),
            "render" => Ok(Self::Render),
            "video" => Ok(Self::Video),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// Variant of the Create workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateFunction {
    #[default]
    Free,
    Sticker,
    Logo,
    Comic,
    Sketch,
    Pattern,
}

/// Variant of the Edit workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditFunction {
    #[default]
    AddRemove,
    Retouch,
    Style,
    Compose,
    TextOverlay,
    MaskEdit,
}

impl EditFunction {
    /// Edit functions that can request more than one variation at once.
    #[must_use]
    pub fn supports_batch(self) -> bool {
        matches!(self, Self::AddRemove | Self::Retouch | Self::Style)
    }
}

impl FromStr for EditFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "add_remove" => Ok(Self::AddRemove),
            "retouch" => Ok(Self::Retouch),
            "style" => Ok(Self::Style),
            "compose" => Ok(Self::Compose),
            "text_overlay" => Ok(Self::TextOverlay),
            "mask_edit" => Ok(Self::MaskEdit),
            other => Err(format!("unknown edit function: {other}")),
        }
    }
}

/// What kind of drawing the Render workflow starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderInputType {
    #[default]
    Sketch,
    BasicModel,
    FloorPlan,
}

/// Supported output aspect ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "9:16")]
    Tall,
    #[serde(rename = "4:3")]
    Classic,
    #[serde(rename = "3:4")]
    ClassicPortrait,
}

impl AspectRatio {
    pub const ALL: [Self; 5] = [
        Self::Square,
        Self::Widescreen,
        Self::Tall,
        Self::Classic,
        Self::ClassicPortrait,
    ];

    /// Returns the `W:H` form understood by the backend.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Widescreen => "16:9",
            Self::Tall => "9:16",
            Self::Classic => "4:3",
            Self::ClassicPortrait => "3:4",
        }
    }

    /// Width and height terms of the ratio.
    #[must_use]
    pub fn terms(self) -> (u32, u32) {
        match self {
            Self::Square => (1, 1),
            Self::Widescreen => (16, 9),
            Self::Tall => (9, 16),
            Self::Classic => (4, 3),
            Self::ClassicPortrait => (3, 4),
        }
    }

    /// Width divided by height.
    #[must_use]
    pub fn ratio(self) -> f64 {
        let (w, h) = self.terms();
        f64::from(w) / f64::from(h)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == s.trim())
            .ok_or_else(|| format!("unsupported aspect ratio: {s}"))
    }
}

/// Whole-image colour filters applied client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFilter {
    Grayscale,
    Sepia,
    Invert,
    /// Partial sepia with slightly reduced contrast and brightness.
    Vintage,
}

impl FromStr for ImageFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grayscale" | "greyscale" => Ok(Self::Grayscale),
            "sepia" => Ok(Self::Sepia),
            "invert" => Ok(Self::Invert),
            "vintage" => Ok(Self::Vintage),
            other => Err(format!("unknown filter: {other}")),
        }
    }
}

/// Quarter-turn direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

/// What a pointer stroke does on the mask surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskMode {
    Draw,
    Erase,
    #[default]
    #[serde(rename = "none")]
    Off,
}
