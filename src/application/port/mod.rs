// SPDX-License-Identifier: MPL-2.0
//! Port definitions (traits) for dependency inversion.
//!
//! This module defines abstract interfaces that infrastructure adapters implement.
//! These traits use only domain types, ensuring the application layer remains
//! independent of concrete implementations.
//!
//! # Available Ports
//!
//! - [`backend`]: Image, video and prompt generation
//! - [`storage`]: Gallery records and the session snapshot slot
//! - [`credential`]: API credential storage
//!
//! # Design Notes
//!
//! - All traits use domain types only (no HTTP types, no file handles)
//! - Traits are `Send + Sync` so collaborators can be shared behind `Arc`
//! - Async methods go through `async_trait` so ports stay object-safe
//! - Methods return `Result` with structured error enums
//!
//! # Example
//!
//! ```ignore
//! use image_studio::application::port::{GenerationBackend, ImageRequest};
//!
//! async fn first_image(backend: &dyn GenerationBackend, request: &ImageRequest) {
//!     let images = backend.generate_image(request).await;
//! }
//! ```

pub mod backend;
pub mod credential;
pub mod storage;

// Re-export main types for convenience
pub use backend::{BackendError, GenerationBackend, ImageRequest, VideoRequest};
pub use credential::{CredentialError, CredentialStore};
pub use storage::{GalleryStore, SessionStore, StorageError};
