// SPDX-License-Identifier: MPL-2.0
//! Credential storage port definition.

use std::fmt;

/// Errors raised by credential stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// The backing medium could not be read or written.
    Io(String),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "Credential storage error: {msg}"),
        }
    }
}

impl std::error::Error for CredentialError {}

impl From<std::io::Error> for CredentialError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Durable storage for the backend API credential.
pub trait CredentialStore: Send + Sync {
    /// Returns the stored credential, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the store cannot be read.
    fn get(&self) -> Result<Option<String>, CredentialError>;

    /// Stores a new credential, replacing the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the store cannot be written.
    fn set(&self, credential: &str) -> Result<(), CredentialError>;

    /// Forgets the stored credential.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the store cannot be written.
    fn clear(&self) -> Result<(), CredentialError>;

    /// Called when the backend rejected the stored credential, so the
    /// surface owning this store can ask the user for a new one.
    fn mark_rejected(&self) {}
}
