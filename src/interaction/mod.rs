// SPDX-License-Identifier: MPL-2.0
//! Pointer-driven editing surfaces.
//!
//! Both surfaces keep their in-progress gesture to themselves and hand a
//! finished value back on pointer-up. Callers then commit that value
//! through the session controller, so one gesture yields one history entry.

pub mod crop;
pub mod mask_surface;

pub use crop::{CropDrag, CropHandle, CropSurface};
pub use mask_surface::MaskSurface;
