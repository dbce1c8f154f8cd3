// SPDX-License-Identifier: MPL-2.0
//! Media value types shared by every layer.

pub mod encoded;
pub mod video;

pub use encoded::{EncodedImage, ImageKind};
pub use video::VideoHandle;
