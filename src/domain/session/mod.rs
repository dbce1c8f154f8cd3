// SPDX-License-Identifier: MPL-2.0
//! Session domain: the state record, its selectors, bounded values and the
//! rules that guard generation.

pub mod crop;
pub mod newtypes;
pub mod rules;
pub mod state;
pub mod types;

pub use crop::{crop_bounds, CropRect};
pub use newtypes::{BatchSize, BrushSize, Fidelity, FidelityBand, Percent, TextSize};
pub use rules::{check_generation, effective_batch_size, GenerationBlocker};
pub use state::{MaskState, SessionState, TextColor, TextOverlay, UiState};
pub use types::{
    AspectRatio, CreateFunction, EditFunction, ImageFilter, MaskMode, RenderInputType, Rotation,
    StudioMode,
};
