// SPDX-License-Identifier: MPL-2.0
//! Infrastructure layer adapters.
//!
//! This module contains concrete implementations of the port traits defined in
//! `application::port`.
//!
//! # Available Adapters
//!
//! - [`gemini`]: HTTP generation backend (implements [`GenerationBackend`])
//! - [`cbor_store`]: Session snapshot and gallery records on disk
//! - [`credential_file`]: API credential in a private file
//! - [`memory`]: In-memory stores and a scripted backend for tests and
//!   offline runs
//!
//! [`GenerationBackend`]: crate::application::port::GenerationBackend

pub mod cbor_store;
pub mod credential_file;
pub mod gemini;
pub mod memory;

// Re-export main types for convenience
pub use cbor_store::{FileGalleryStore, FileSessionStore};
pub use credential_file::FileCredentialStore;
pub use gemini::{GeminiBackend, GeminiModels};
pub use memory::{MemoryCredentialStore, MemoryGalleryStore, MemorySessionStore, StubBackend};
