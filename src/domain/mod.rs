// SPDX-License-Identifier: MPL-2.0
//! Domain layer - Core business types and rules.
//!
//! This module contains pure domain types, value objects, and business rules.
//! Apart from `serde` derives (for persistence) and `chrono` timestamps it
//! depends on `std` only, and it performs no I/O except removing the file
//! behind a released [`VideoHandle`](media::VideoHandle).
//!
//! # Modules
//!
//! - [`gallery`]: Saved images ([`GalleryImage`](gallery::GalleryImage)) and
//!   listing rules ([`GallerySort`](gallery::GallerySort))
//! - [`media`]: Encoded image buffers ([`EncodedImage`](media::EncodedImage))
//!   and video handles
//! - [`session`]: The session record ([`SessionState`](session::SessionState)),
//!   bounded values ([`BatchSize`](session::BatchSize),
//!   [`Fidelity`](session::Fidelity), [`CropRect`](session::CropRect)) and
//!   generation guards

pub mod gallery;
pub mod media;
pub mod session;
