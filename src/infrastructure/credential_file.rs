// SPDX-License-Identifier: MPL-2.0
//! API credential kept in a private plain-text file.

use crate::application::port::{CredentialError, CredentialStore};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Credential file name within the config directory.
pub const CREDENTIAL_FILE: &str = "credential";

/// Credential stored in `<config dir>/credential`, readable by the owner
/// only on Unix.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    rejected: AtomicBool,
}

impl FileCredentialStore {
    #[must_use]
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            path: config_dir.as_ref().join(CREDENTIAL_FILE),
            rejected: AtomicBool::new(false),
        }
    }

    /// Whether the backend rejected the credential since it was last set.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.rejected.load(Ordering::Relaxed)
    }

    fn open_private(path: &Path) -> std::io::Result<fs::File> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        options.open(path)
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Option<String>, CredentialError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let credential = content.trim();
                Ok((!credential.is_empty()).then(|| credential.to_string()))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, credential: &str) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = Self::open_private(&self.path)?;
        file.write_all(credential.trim().as_bytes())?;
        self.rejected.store(false, Ordering::Relaxed);
        tracing::debug!("credential stored");
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    fn mark_rejected(&self) {
        self.rejected.store(true, Ordering::Relaxed);
        tracing::warn!("stored credential was rejected by the backend");
    }
}
