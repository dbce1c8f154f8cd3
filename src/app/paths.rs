// SPDX-License-Identifier: MPL-2.0
//! Resolution of the data and config directories.
//!
//! Each directory is resolved in this order:
//! 1. Explicit override (CLI flag or test path)
//! 2. Environment variable (`IMAGE_STUDIO_DATA_DIR`, `IMAGE_STUDIO_CONFIG_DIR`)
//! 3. Platform directory from `dirs` with [`APP_NAME`] appended
//!
//! The data directory holds the session snapshot and the gallery. The
//! config directory holds `settings.toml` and the API credential.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Application name used for directory naming.
pub const APP_NAME: &str = "ImageStudio";

/// Environment variable to override the data directory.
pub const ENV_DATA_DIR: &str = "IMAGE_STUDIO_DATA_DIR";

/// Environment variable to override the config directory.
pub const ENV_CONFIG_DIR: &str = "IMAGE_STUDIO_CONFIG_DIR";

/// Which application directory to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirKind {
    Data,
    Config,
}

impl DirKind {
    #[must_use]
    pub fn env_var(self) -> &'static str {
        match self {
            Self::Data => ENV_DATA_DIR,
            Self::Config => ENV_CONFIG_DIR,
        }
    }

    fn platform_base(self) -> Option<PathBuf> {
        match self {
            Self::Data => dirs::data_dir(),
            Self::Config => dirs::config_dir(),
        }
    }
}

/// Resolves one directory, or `None` when the platform has no such
/// location and nothing overrides it.
#[must_use]
pub fn resolve(kind: DirKind, override_path: Option<PathBuf>) -> Option<PathBuf> {
    if override_path.is_some() {
        return override_path;
    }
    let from_env = std::env::var_os(kind.env_var()).filter(|value| !value.is_empty());
    if let Some(value) = from_env {
        return Some(PathBuf::from(value));
    }
    kind.platform_base().map(|base| base.join(APP_NAME))
}

/// Both application directories, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioDirs {
    pub data: PathBuf,
    pub config: PathBuf,
}

impl StudioDirs {
    /// Resolves both directories, applying the given overrides first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a directory cannot be determined.
    pub fn resolve(data: Option<PathBuf>, config: Option<PathBuf>) -> Result<Self> {
        let data = resolve(DirKind::Data, data)
            .ok_or_else(|| Error::Config("cannot determine the data directory".into()))?;
        let config = resolve(DirKind::Config, config)
            .ok_or_else(|| Error::Config("cannot determine the config directory".into()))?;
        Ok(Self { data, config })
    }

    /// Uses a single directory for both data and config.
    #[must_use]
    pub fn single(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            data: dir.clone(),
            config: dir,
        }
    }
}
