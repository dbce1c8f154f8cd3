// SPDX-License-Identifier: MPL-2.0
//! Persistent storage port definitions.
//!
//! Two logical tables: the gallery (many records) and a single-slot session
//! snapshot. Both must hold binary image data and survive restarts.

use crate::domain::gallery::GalleryImage;
use crate::domain::session::SessionState;
use async_trait::async_trait;
use std::fmt;

// =============================================================================
// StorageError
// =============================================================================

/// Errors raised by storage adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    Io(String),

    /// A record could not be encoded or decoded.
    Serialization(String),

    /// The requested record does not exist.
    NotFound(String),
}

impl StorageError {
    /// Returns the localization key for this error.
    #[must_use]
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::Io(_) => "error-storage-io",
            Self::Serialization(_) => "error-storage-format",
            Self::NotFound(_) => "error-storage-not-found",
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "Storage I/O error: {msg}"),
            Self::Serialization(msg) => write!(f, "Storage format error: {msg}"),
            Self::NotFound(id) => write!(f, "Record not found: {id}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Ports
// =============================================================================

/// Gallery record store.
#[async_trait]
pub trait GalleryStore: Send + Sync {
    /// Returns every stored record, in no particular order.
    async fn list(&self) -> Result<Vec<GalleryImage>, StorageError>;

    /// Inserts or replaces a record keyed by its id.
    async fn put(&self, image: &GalleryImage) -> Result<(), StorageError>;

    /// Removes a record. Removing a missing id is not an error.
    async fn delete(&self, id: &str) -> Result<(), StorageError>;

    /// Removes every record.
    async fn clear(&self) -> Result<(), StorageError>;
}

/// Single-slot session snapshot store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Reads the saved snapshot, if any.
    async fn load(&self) -> Result<Option<SessionState>, StorageError>;

    /// Overwrites the snapshot.
    async fn save(&self, state: &SessionState) -> Result<(), StorageError>;

    /// Deletes the snapshot.
    async fn clear(&self) -> Result<(), StorageError>;
}
