// SPDX-License-Identifier: MPL-2.0
//! `image_studio` is the core of a generative image and video studio.
//!
//! It keeps one creative session with linear undo/redo history, runs
//! local raster edits (crop, filters, rotation, text, watermark, mask
//! inversion, aspect padding), drives batched generation requests against
//! a pluggable backend with cooperative cancellation, and keeps a gallery
//! of saved results.

#![doc(html_root_url = "https://docs.rs/image_studio/0.1.0")]

pub mod app;
pub mod application;
pub mod domain;
pub mod error;
pub mod gallery;
pub mod generation;
pub mod infrastructure;
pub mod interaction;
pub mod media;
pub mod session;
