// SPDX-License-Identifier: MPL-2.0
//! Generated video resource handles.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_VIDEO_ID: AtomicU64 = AtomicU64::new(1);

/// Shared handle to a generated video stored on disk.
///
/// The file is an OS-level resource owned by whoever holds the handle. It is
/// removed exactly once: either by an explicit [`VideoHandle::release`] when
/// the handle is superseded, or when the last clone is dropped. Clones kept
/// in history snapshots observe the release through [`VideoHandle::path`]
/// returning `None`.
#[derive(Clone)]
pub struct VideoHandle {
    inner: Arc<VideoResource>,
}

struct VideoResource {
    id: u64,
    path: PathBuf,
    mime_type: String,
    released: AtomicBool,
}

impl VideoHandle {
    /// Takes ownership of the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(VideoResource {
                id: NEXT_VIDEO_ID.fetch_add(1, Ordering::Relaxed),
                path: path.into(),
                mime_type: mime_type.into(),
                released: AtomicBool::new(false),
            }),
        }
    }

    /// Process-unique identifier of the underlying resource.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Location of the video file, or `None` once released.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        if self.is_released() {
            None
        } else {
            Some(&self.inner.path)
        }
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.inner.mime_type
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }

    /// Releases the resource.
    ///
    /// Returns `true` for the call that actually released it; every later
    /// call (from any clone) is a no-op returning `false`.
    pub fn release(&self) -> bool {
        self.inner.release()
    }
}

impl VideoResource {
    fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "failed to remove video file");
            }
        }
        tracing::debug!(id = self.id, "video handle released");
        true
    }
}

impl Drop for VideoResource {
    fn drop(&mut self) {
        self.release();
    }
}

impl PartialEq for VideoHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for VideoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoHandle")
            .field("id", &self.inner.id)
            .field("path", &self.inner.path)
            .field("released", &self.is_released())
            .finish()
    }
}
