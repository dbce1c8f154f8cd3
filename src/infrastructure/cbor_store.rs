// SPDX-License-Identifier: MPL-2.0
//! CBOR-on-disk implementations of the storage ports.
//!
//! The session snapshot is a single `session.cbor` file in the data
//! directory. Gallery records live one per file under `gallery/`, named
//! after their id. Encoding and file access run on the blocking pool.

use crate::application::port::{GalleryStore, SessionStore, StorageError};
use crate::domain::gallery::GalleryImage;
use crate::domain::session::SessionState;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Session snapshot file name within the data directory.
pub const SESSION_FILE: &str = "session.cbor";

/// Gallery directory name within the data directory.
pub const GALLERY_DIR: &str = "gallery";

const RECORD_EXTENSION: &str = "cbor";

fn read_cbor<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    ciborium::from_reader(BufReader::new(file))
        .map(Some)
        .map_err(|err| StorageError::Serialization(format!("{}: {err}", path.display())))
}

fn write_cbor<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path)?;
    ciborium::into_writer(value, BufWriter::new(file))
        .map_err(|err| StorageError::Serialization(err.to_string()))
}

fn remove_if_present(path: &Path) -> Result<(), StorageError> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
        _ => Ok(()),
    }
}

async fn blocking<T, F>(job: F) -> Result<T, StorageError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|err| StorageError::Io(err.to_string()))?
}

// =============================================================================
// Session snapshot
// =============================================================================

/// Single-slot session snapshot in `session.cbor`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Stores the snapshot in `data_dir`.
    #[must_use]
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(SESSION_FILE),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<SessionState>, StorageError> {
        let path = self.path.clone();
        blocking(move || read_cbor(&path)).await
    }

    async fn save(&self, state: &SessionState) -> Result<(), StorageError> {
        let path = self.path.clone();
        let state = state.clone();
        blocking(move || write_cbor(&path, &state)).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let path = self.path.clone();
        blocking(move || remove_if_present(&path)).await
    }
}

// =============================================================================
// Gallery
// =============================================================================

/// One CBOR file per gallery record.
#[derive(Debug, Clone)]
pub struct FileGalleryStore {
    dir: PathBuf,
}

impl FileGalleryStore {
    /// Stores records under `data_dir/gallery`.
    #[must_use]
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: data_dir.as_ref().join(GALLERY_DIR),
        }
    }

    fn record_path(dir: &Path, id: &str) -> Result<PathBuf, StorageError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(dir.join(format!("{id}.{RECORD_EXTENSION}")))
    }

    fn record_files(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == RECORD_EXTENSION) {
                files.push(path);
            }
        }
        Ok(files)
    }
}

#[async_trait]
impl GalleryStore for FileGalleryStore {
    async fn list(&self) -> Result<Vec<GalleryImage>, StorageError> {
        let dir = self.dir.clone();
        blocking(move || {
            let mut items = Vec::new();
            for path in Self::record_files(&dir)? {
                match read_cbor::<GalleryImage>(&path) {
                    Ok(Some(item)) => items.push(item),
                    Ok(None) => {}
                    Err(err) => tracing::warn!(%err, "skipping unreadable gallery record"),
                }
            }
            Ok(items)
        })
        .await
    }

    async fn put(&self, image: &GalleryImage) -> Result<(), StorageError> {
        let path = Self::record_path(&self.dir, &image.id)?;
        let image = image.clone();
        blocking(move || write_cbor(&path, &image)).await
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let path = Self::record_path(&self.dir, id)?;
        blocking(move || remove_if_present(&path)).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let dir = self.dir.clone();
        blocking(move || {
            for path in Self::record_files(&dir)? {
                remove_if_present(&path)?;
            }
            Ok(())
        })
        .await
    }
}
