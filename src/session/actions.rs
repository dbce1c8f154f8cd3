// SPDX-License-Identifier: MPL-2.0
//! Studio actions expressed as mutations of the session controller.
//!
//! Each action is a thin rule over [`SessionController::apply`]; whether
//! it lands in history is decided by the controller alone.

use super::controller::{Commit, SessionController};
use crate::domain::media::EncodedImage;
use crate::domain::session::{
    AspectRatio, BatchSize, BrushSize, CreateFunction, CropRect, EditFunction, Fidelity, MaskMode,
    RenderInputType, SessionState, StudioMode, TextOverlay,
};

impl SessionController {
    // =========================================================================
    // Plain setters
    // =========================================================================

    pub fn set_prompt(&mut self, prompt: impl Into<String>) -> Commit {
        let prompt = prompt.into();
        self.apply(|s| s.prompt = prompt)
    }

    pub fn set_negative_prompt(&mut self, negative: impl Into<String>) -> Commit {
        let negative = negative.into();
        self.apply(|s| s.negative_prompt = negative)
    }

    pub fn set_create_function(&mut self, function: CreateFunction) -> Commit {
        self.apply(|s| s.create_function = function)
    }

    pub fn set_render_input_type(&mut self, input: RenderInputType) -> Commit {
        self.apply(|s| s.render_input_type = input)
    }

    pub fn set_batch_size(&mut self, size: BatchSize) -> Commit {
        self.apply(|s| s.batch_size = size)
    }

    pub fn set_aspect_ratio(&mut self, ratio: AspectRatio) -> Commit {
        self.apply(|s| s.aspect_ratio = ratio)
    }

    pub fn set_video_aspect_ratio(&mut self, ratio: AspectRatio) -> Commit {
        self.apply(|s| s.video_aspect_ratio = ratio)
    }

    pub fn set_video_include_audio(&mut self, include: bool) -> Commit {
        self.apply(|s| s.video_include_audio = include)
    }

    pub fn set_render_fidelity(&mut self, fidelity: Fidelity) -> Commit {
        self.apply(|s| s.render_fidelity = fidelity)
    }

    pub fn set_add_watermark(&mut self, enabled: bool) -> Commit {
        self.apply(|s| s.add_watermark = enabled)
    }

    pub fn set_text_overlay(&mut self, overlay: TextOverlay) -> Commit {
        self.apply(|s| s.text_overlay = overlay)
    }

    pub fn set_image2(&mut self, image: Option<EncodedImage>) -> Commit {
        self.apply(|s| s.image2 = image)
    }

    pub fn set_custom_watermark(&mut self, image: Option<EncodedImage>) -> Commit {
        self.apply(|s| s.custom_watermark = image)
    }

    // =========================================================================
    // Base image and mode
    // =========================================================================

    /// Loads a new base image, or clears it.
    ///
    /// Clearing keeps the current results on screen.
    pub fn set_image1(&mut self, image: Option<EncodedImage>) -> Commit {
        self.apply(|s| match image {
            Some(image) => {
                s.original_image1 = Some(image.clone());
                s.generated_images = Some(vec![image.clone()]);
                s.image1 = Some(image);
                s.comparison_image = None;
                s.ui.show_comparator = false;
                s.ui.selected_index = 0;
            }
            None => {
                s.image1 = None;
                s.original_image1 = None;
                s.comparison_image = None;
            }
        })
    }

    /// Switches workflow, carrying the on-screen image over as the base.
    pub fn change_mode(&mut self, mode: StudioMode) -> Option<Commit> {
        if self.state().mode == mode {
            return None;
        }
        Some(self.apply(|s| {
            let on_screen = s.on_screen_image().cloned();
            s.mode = mode;
            s.generated_video = None;
            s.is_masking_active = false;
            s.image1 = if mode.carries_base_image() {
                on_screen.clone()
            } else {
                None
            };

            let compares = matches!(mode, StudioMode::Edit | StudioMode::Render);
            match on_screen {
                Some(on_screen) if compares => {
                    s.comparison_image = Some(s.original_image1.clone().unwrap_or(on_screen));
                    s.ui.show_comparator = true;
                }
                _ => s.ui.show_comparator = false,
            }
        }))
    }

    pub fn set_edit_function(&mut self, function: EditFunction) -> Commit {
        self.apply(|s| {
            s.edit_function = function;
            s.is_masking_active = false;
            s.ui.is_cropping = false;
            s.ui.show_comparator = false;
        })
    }

    // =========================================================================
    // Mask
    // =========================================================================

    /// Turns the mask tool on or off. Enabling needs a base image.
    pub fn set_masking_active(&mut self, active: bool) -> Option<Commit> {
        if active && self.state().image1.is_none() {
            return None;
        }
        Some(self.apply(|s| {
            s.is_masking_active = active;
            s.mask.mode = MaskMode::Off;
            if active {
                s.ui.show_comparator = false;
                s.ui.is_cropping = false;
            }
        }))
    }

    pub fn set_mask_mode(&mut self, mode: MaskMode) -> Commit {
        self.apply(|s| s.mask.mode = mode)
    }

    pub fn set_brush_size(&mut self, size: BrushSize) -> Commit {
        self.apply(|s| s.mask.brush_size = size)
    }

    /// Commits a finished stroke or an inverted mask.
    pub fn set_mask_image(&mut self, mask: EncodedImage) -> Commit {
        self.apply(|s| s.mask.image = Some(mask))
    }

    pub fn clear_mask(&mut self) -> Commit {
        self.apply(|s| s.mask.image = None)
    }

    // =========================================================================
    // Comparator, crop and selection
    // =========================================================================

    /// Shows or hides the before/after view. Needs a comparison image.
    pub fn toggle_comparator(&mut self) -> Option<Commit> {
        if self.state().comparison_image.is_none() {
            return None;
        }
        Some(self.apply(|s| {
            if s.is_masking_active {
                s.is_masking_active = false;
                s.mask.mode = MaskMode::Off;
                s.ui.show_comparator = true;
            } else {
                s.ui.show_comparator = !s.ui.show_comparator;
            }
        }))
    }

    /// Enters crop mode on the on-screen image.
    pub fn start_cropping(&mut self) -> Option<Commit> {
        self.state().on_screen_image()?;
        Some(self.apply(|s| {
            s.ui.is_cropping = true;
            s.ui.show_comparator = false;
            s.is_masking_active = false;
        }))
    }

    pub fn cancel_cropping(&mut self) -> Commit {
        self.apply(|s| s.ui.is_cropping = false)
    }

    /// Commits the rectangle from a finished crop drag.
    pub fn set_crop_rect(&mut self, rect: CropRect) -> Commit {
        self.apply(|s| s.crop = rect)
    }

    /// Selects a result of the current batch, clamped into range.
    pub fn select_image(&mut self, index: usize) -> Commit {
        self.apply(|s| {
            let len = s.generated_images.as_ref().map_or(0, Vec::len);
            s.ui.selected_index = index.min(len.saturating_sub(1));
        })
    }

    pub fn toggle_section(&mut self, section: &str) -> Commit {
        self.apply(|s| {
            let open = s.ui.open_sections.entry(section.to_string()).or_default();
            *open = !*open;
        })
    }

    pub fn set_history_panel_open(&mut self, open: bool) -> Commit {
        self.apply(|s| s.ui.history_panel_open = open)
    }

    pub fn set_ai_masking(&mut self, pending: bool) -> Commit {
        self.apply(|s| s.ui.ai_masking = pending)
    }

    // =========================================================================
    // Starting over from an image
    // =========================================================================

    /// Makes `image` the new starting point of the current session.
    pub fn use_as_base(&mut self, image: EncodedImage) -> Commit {
        self.apply(|s| {
            s.prompt.clear();
            s.image1 = Some(image.clone());
            s.original_image1 = Some(image.clone());
            s.image2 = None;
            s.generated_images = Some(vec![image]);
            s.comparison_image = None;
            s.generated_video = None;
            s.is_masking_active = false;
            s.ui.selected_index = 0;
            s.ui.show_comparator = false;
        })
    }

    /// Opens a gallery image in a fresh session with a new history.
    ///
    /// Accordion state survives; everything else starts from defaults.
    pub fn open_from_gallery(&mut self, image: EncodedImage, mode: StudioMode) {
        let mut fresh = SessionState::default();
        fresh.ui.open_sections = self.state().ui.open_sections.clone();
        fresh.mode = mode;
        fresh.image1 = Some(image.clone());
        fresh.original_image1 = Some(image.clone());
        fresh.generated_images = Some(vec![image]);
        self.reset_to(fresh);
    }
}
