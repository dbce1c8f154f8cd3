// SPDX-License-Identifier: MPL-2.0
//! The session state record.

use super::crop::CropRect;
use super::newtypes::{BatchSize, BrushSize, Fidelity, Percent, TextSize};
use super::types::{
    AspectRatio, CreateFunction, EditFunction, MaskMode, RenderInputType, StudioMode,
};
use crate::domain::media::{EncodedImage, VideoHandle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Negative prompt of a fresh session.
pub const DEFAULT_NEGATIVE_PROMPT: &str = "cartoon, blurry, unrealistic, low quality, deformed";

/// Font family of a fresh text overlay.
pub const DEFAULT_TEXT_FONT: &str = "Arial";

// =============================================================================
// Text Overlay
// =============================================================================

/// An opaque sRGB colour parsed from `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl TextColor {
    pub const WHITE: Self = Self {
        r: 0xFF,
        g: 0xFF,
        b: 0xFF,
    };

    /// Formats the colour as `#RRGGBB`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Default for TextColor {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for TextColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for TextColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return Err(format!("invalid colour: {s}"));
        }
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(format!("invalid colour: {s}")),
        };
        let channel = |i: usize| {
            u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| format!("invalid colour: {s}"))
        };
        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

impl Serialize for TextColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TextColor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A pending text burn-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOverlay {
    pub text: String,
    pub color: TextColor,
    /// Font size relative to the image width.
    pub size: TextSize,
    pub font: String,
    /// Horizontal centre of the text.
    pub x: Percent,
    /// Vertical centre of the text.
    pub y: Percent,
}

impl Default for TextOverlay {
    fn default() -> Self {
        Self {
            text: String::new(),
            color: TextColor::WHITE,
            size: TextSize::default(),
            font: DEFAULT_TEXT_FONT.to_string(),
            x: Percent::CENTER,
            y: Percent::CENTER,
        }
    }
}

// =============================================================================
// Mask
// =============================================================================

/// Mask tool state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskState {
    /// Opaque regions mark where an edit may apply.
    pub image: Option<EncodedImage>,
    pub brush_size: BrushSize,
    pub mode: MaskMode,
}

// =============================================================================
// UI
// =============================================================================

/// Accordion sections of a fresh session and whether each starts expanded.
pub const DEFAULT_OPEN_SECTIONS: [(&str, bool); 13] = [
    ("create_style", true),
    ("create_settings", true),
    ("create_type", true),
    ("edit_function", true),
    ("edit_quick", false),
    ("edit_compose", true),
    ("render_base", true),
    ("render_settings", true),
    ("render_presets", true),
    ("render_controls", false),
    ("video_start", true),
    ("video_settings", false),
    ("edit_masking", true),
];

/// Presentational state. Never part of history equality nor persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub open_sections: BTreeMap<String, bool>,
    pub history_panel_open: bool,
    /// A backend mask suggestion is being computed.
    pub ai_masking: bool,
    pub show_comparator: bool,
    pub selected_index: usize,
    pub is_cropping: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            open_sections: DEFAULT_OPEN_SECTIONS
                .iter()
                .map(|(name, open)| ((*name).to_string(), *open))
                .collect(),
            history_panel_open: false,
            ai_masking: false,
            show_comparator: false,
            selected_index: 0,
            is_cropping: false,
        }
    }
}

// =============================================================================
// Session State
// =============================================================================

/// The single record governing a creative session.
///
/// Serialization covers the tracked fields only: the `ui` record and the
/// video handle are transient and come back as defaults when loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub mode: StudioMode,
    pub create_function: CreateFunction,
    pub edit_function: EditFunction,
    pub render_input_type: RenderInputType,
    pub prompt: String,
    pub negative_prompt: String,
    pub batch_size: BatchSize,
    pub aspect_ratio: AspectRatio,
    pub video_aspect_ratio: AspectRatio,
    pub video_include_audio: bool,
    pub render_fidelity: Fidelity,
    pub image1: Option<EncodedImage>,
    pub original_image1: Option<EncodedImage>,
    pub image2: Option<EncodedImage>,
    pub custom_watermark: Option<EncodedImage>,
    pub generated_images: Option<Vec<EncodedImage>>,
    #[serde(skip)]
    pub generated_video: Option<VideoHandle>,
    pub comparison_image: Option<EncodedImage>,
    pub add_watermark: bool,
    pub text_overlay: TextOverlay,
    pub mask: MaskState,
    pub is_masking_active: bool,
    pub crop: CropRect,
    #[serde(skip)]
    pub ui: UiState,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            mode: StudioMode::Create,
            create_function: CreateFunction::Free,
            edit_function: EditFunction::AddRemove,
            render_input_type: RenderInputType::Sketch,
            prompt: String::new(),
            negative_prompt: DEFAULT_NEGATIVE_PROMPT.to_string(),
            batch_size: BatchSize::default(),
            aspect_ratio: AspectRatio::Square,
            video_aspect_ratio: AspectRatio::Widescreen,
            video_include_audio: false,
            render_fidelity: Fidelity::default(),
            image1: None,
            original_image1: None,
            image2: None,
            custom_watermark: None,
            generated_images: None,
            generated_video: None,
            comparison_image: None,
            add_watermark: false,
            text_overlay: TextOverlay::default(),
            mask: MaskState::default(),
            is_masking_active: false,
            crop: CropRect::default(),
            ui: UiState::default(),
        }
    }
}

impl SessionState {
    /// Compares every field that matters to history, skipping `ui`.
    ///
    /// The exhaustive destructuring makes a newly added field a compile
    /// error here until it is classified.
    #[must_use]
    pub fn tracked_eq(&self, other: &Self) -> bool {
        let Self {
            mode,
            create_function,
            edit_function,
            render_input_type,
            prompt,
            negative_prompt,
            batch_size,
            aspect_ratio,
            video_aspect_ratio,
            video_include_audio,
            render_fidelity,
            image1,
            original_image1,
            image2,
            custom_watermark,
            generated_images,
            generated_video,
            comparison_image,
            add_watermark,
            text_overlay,
            mask,
            is_masking_active,
            crop,
            ui: _,
        } = self;

        *mode == other.mode
            && *create_function == other.create_function
            && *edit_function == other.edit_function
            && *render_input_type == other.render_input_type
            && *prompt == other.prompt
            && *negative_prompt == other.negative_prompt
            && *batch_size == other.batch_size
            && *aspect_ratio == other.aspect_ratio
            && *video_aspect_ratio == other.video_aspect_ratio
            && *video_include_audio == other.video_include_audio
            && *render_fidelity == other.render_fidelity
            && *image1 == other.image1
            && *original_image1 == other.original_image1
            && *image2 == other.image2
            && *custom_watermark == other.custom_watermark
            && *generated_images == other.generated_images
            && *generated_video == other.generated_video
            && *comparison_image == other.comparison_image
            && *add_watermark == other.add_watermark
            && *text_overlay == other.text_overlay
            && *mask == other.mask
            && *is_masking_active == other.is_masking_active
            && *crop == other.crop
    }

    /// The image currently on screen: the selected result, else `image1`.
    #[must_use]
    pub fn on_screen_image(&self) -> Option<&EncodedImage> {
        self.selected_generated().or(self.image1.as_ref())
    }

    /// The generated image at the selected index, if any.
    #[must_use]
    pub fn selected_generated(&self) -> Option<&EncodedImage> {
        self.generated_images
            .as_ref()
            .and_then(|images| images.get(self.ui.selected_index))
    }

    /// Keeps `ui.selected_index` inside the current batch.
    pub fn normalize_selection(&mut self) {
        let len = self.generated_images.as_ref().map_or(0, Vec::len);
        if self.ui.selected_index >= len {
            self.ui.selected_index = 0;
        }
    }

    /// Mask sent with a request: only while the mask tool is live.
    #[must_use]
    pub fn effective_mask(&self) -> Option<&EncodedImage> {
        if self.is_masking_active {
            self.mask.image.as_ref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::media::ImageKind;

    fn image(tag: u8) -> EncodedImage {
        EncodedImage::new(vec![tag; 4], ImageKind::Png, 1, 1)
    }

    #[test]
    fn fresh_state_defaults() {
        let state = SessionState::default();
        assert_eq!(state.mode, StudioMode::Create);
        assert_eq!(state.negative_prompt, DEFAULT_NEGATIVE_PROMPT);
        assert_eq!(state.aspect_ratio, AspectRatio::Square);
        assert_eq!(state.video_aspect_ratio, AspectRatio::Widescreen);
        assert_eq!(state.render_fidelity.value(), 100);
        assert_eq!(state.mask.mode, MaskMode::Off);
        assert_eq!(state.mask.brush_size.value(), 10);
        assert_eq!(state.text_overlay.size.value(), 8.0);
        assert_eq!(state.ui.open_sections.get("edit_quick"), Some(&false));
    }

    #[test]
    fn tracked_eq_ignores_ui() {
        let a = SessionState::default();
        let mut b = a.clone();
        b.ui.history_panel_open = true;
        b.ui.open_sections.insert("create_style".into(), false);
        b.ui.selected_index = 3;
        assert!(a.tracked_eq(&b));
    }

    #[test]
    fn tracked_eq_sees_prompt_and_images() {
        let a = SessionState::default();
        let mut b = a.clone();
        b.prompt = "a red fox".into();
        assert!(!a.tracked_eq(&b));

        let mut c = a.clone();
        c.image1 = Some(image(1));
        assert!(!a.tracked_eq(&c));
    }

    #[test]
    fn on_screen_image_prefers_selected_result() {
        let mut state = SessionState::default();
        state.image1 = Some(image(1));
        assert_eq!(state.on_screen_image(), Some(&image(1)));

        state.generated_images = Some(vec![image(2), image(3)]);
        state.ui.selected_index = 1;
        assert_eq!(state.on_screen_image(), Some(&image(3)));
    }

    #[test]
    fn normalize_selection_resets_out_of_range_index() {
        let mut state = SessionState::default();
        state.generated_images = Some(vec![image(1)]);
        state.ui.selected_index = 4;
        state.normalize_selection();
        assert_eq!(state.ui.selected_index, 0);
    }

    #[test]
    fn mask_only_counts_while_active() {
        let mut state = SessionState::default();
        state.mask.image = Some(image(9));
        assert!(state.effective_mask().is_none());
        state.is_masking_active = true;
        assert!(state.effective_mask().is_some());
    }

    #[test]
    fn text_color_parses_short_and_long_hex() {
        assert_eq!("#fff".parse::<TextColor>(), Ok(TextColor::WHITE));
        assert_eq!(
            "#1A2b3C".parse::<TextColor>(),
            Ok(TextColor {
                r: 0x1A,
                g: 0x2B,
                b: 0x3C
            })
        );
        assert!("#12345".parse::<TextColor>().is_err());
        assert!("zzzzzz".parse::<TextColor>().is_err());
    }

    #[test]
    fn serialization_skips_ui_and_merges_over_defaults() {
        let mut state = SessionState::default();
        state.prompt = "lighthouse".into();
        state.ui.history_panel_open = true;

        let mut buffer = Vec::new();
        ciborium::into_writer(&state, &mut buffer).expect("serialize");
        let restored: SessionState = ciborium::from_reader(buffer.as_slice()).expect("deserialize");

        assert_eq!(restored.prompt, "lighthouse");
        assert!(!restored.ui.history_panel_open);
        assert!(restored.tracked_eq(&state));
    }

    #[test]
    fn partial_snapshot_keeps_new_defaults() {
        let restored: SessionState =
            toml::from_str("prompt = \"old\"\nmode = \"edit\"").expect("deserialize");
        assert_eq!(restored.prompt, "old");
        assert_eq!(restored.mode, StudioMode::Edit);
        assert_eq!(restored.negative_prompt, DEFAULT_NEGATIVE_PROMPT);
    }
}
