// SPDX-License-Identifier: MPL-2.0
use crate::application::port::{BackendError, CredentialError, StorageError};
use crate::generation::GenerationError;
use crate::media::RasterError;
use std::fmt;

/// Crate-level error returned by the `app` layer and the CLI.
#[derive(Debug, Clone)]
pub enum Error {
    Io(String),
    Config(String),
    Storage(StorageError),
    Credential(CredentialError),
    Backend(BackendError),
    Raster(RasterError),
}

impl Error {
    /// Returns the localization key for this error.
    #[must_use]
    pub fn message_key(&self) -> &'static str {
        match self {
            Error::Io(_) => "error-io",
            Error::Config(_) => "error-config",
            Error::Storage(err) => err.message_key(),
            Error::Credential(_) => "error-credential",
            Error::Backend(err) => err.message_key(),
            Error::Raster(err) => err.message_key(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O Error: {e}"),
            Error::Config(e) => write!(f, "Config Error: {e}"),
            Error::Storage(e) => write!(f, "Storage Error: {e}"),
            Error::Credential(e) => write!(f, "{e}"),
            Error::Backend(e) => write!(f, "{e}"),
            Error::Raster(e) => write!(f, "Image Error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Storage(e) => Some(e),
            Error::Credential(e) => Some(e),
            Error::Backend(e) => Some(e),
            Error::Raster(e) => Some(e),
            Error::Io(_) | Error::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::Storage(err)
    }
}

impl From<CredentialError> for Error {
    fn from(err: CredentialError) -> Self {
        Error::Credential(err)
    }
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        Error::Backend(err)
    }
}

impl From<RasterError> for Error {
    fn from(err: RasterError) -> Self {
        Error::Raster(err)
    }
}

impl From<GenerationError> for Error {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Backend(err) => Error::Backend(err),
            GenerationError::Raster(err) => Error::Raster(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
