// SPDX-License-Identifier: MPL-2.0
//! Application root wiring the session, generation and gallery services.
//!
//! [`Studio`] owns one of each collaborator and is what a front end (the
//! CLI here) talks to. Policy that spans services lives here: restoring
//! the snapshot on start, clearing it on reset, routing edit failures to
//! the status board, and the final save on shutdown.

pub mod config;
pub mod paths;

pub use config::Config;
pub use paths::StudioDirs;

use crate::application::port::{CredentialStore, GalleryStore, GenerationBackend, SessionStore};
use crate::domain::gallery::GallerySort;
use crate::domain::session::{SessionState, StudioMode};
use crate::error::{Error, Result};
use crate::gallery::GalleryService;
use crate::generation::{GenerationOutcome, Orchestrator, StatusBoard};
use crate::infrastructure::{
    FileCredentialStore, FileGalleryStore, FileSessionStore, GeminiBackend, MemoryCredentialStore,
    MemoryGalleryStore, MemorySessionStore, StubBackend,
};
use crate::media;
use crate::session::{self, Commit, EditKind, SessionController, SharedSession};
use image_rs::{DynamicImage, Rgba, RgbaImage};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Warning key returned when the saved session cannot be read.
pub const SESSION_LOAD_WARNING_KEY: &str = "notification-session-parse-error";

const PLACEHOLDER_SIZE: u32 = 256;

/// Backend and stores a [`Studio`] is built from.
#[derive(Clone)]
pub struct Collaborators {
    pub backend: Arc<dyn GenerationBackend>,
    pub session_store: Arc<dyn SessionStore>,
    pub gallery_store: Arc<dyn GalleryStore>,
    pub credentials: Arc<dyn CredentialStore>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

impl Collaborators {
    /// File-backed stores and the HTTP backend.
    #[must_use]
    pub fn on_disk(dirs: &StudioDirs, config: &Config) -> Self {
        let credentials: Arc<dyn CredentialStore> =
            Arc::new(FileCredentialStore::new(&dirs.config));
        Self {
            backend: Arc::new(GeminiBackend::new(
                credentials.clone(),
                config.generation.models(),
            )),
            session_store: Arc::new(FileSessionStore::new(&dirs.data)),
            gallery_store: Arc::new(FileGalleryStore::new(&dirs.data)),
            credentials,
        }
    }

    /// File-backed stores with a backend that answers every request with
    /// a flat placeholder image, for trying the studio without a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the placeholder cannot be encoded.
    pub fn offline(dirs: &StudioDirs) -> Result<Self> {
        let placeholder = RgbaImage::from_pixel(
            PLACEHOLDER_SIZE,
            PLACEHOLDER_SIZE,
            Rgba([96, 96, 112, 255]),
        );
        let image = media::codec::encode_png(&DynamicImage::ImageRgba8(placeholder))?;
        Ok(Self {
            backend: Arc::new(StubBackend::returning(vec![image])),
            session_store: Arc::new(FileSessionStore::new(&dirs.data)),
            gallery_store: Arc::new(FileGalleryStore::new(&dirs.data)),
            credentials: Arc::new(MemoryCredentialStore::default()),
        })
    }

    /// In-memory stores around `backend`.
    #[must_use]
    pub fn in_memory(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            session_store: Arc::new(MemorySessionStore::default()),
            gallery_store: Arc::new(MemoryGalleryStore::default()),
            credentials: Arc::new(MemoryCredentialStore::default()),
        }
    }
}

/// Running studio: one session, its history, generation and gallery.
pub struct Studio {
    config: Config,
    session: SharedSession,
    status: StatusBoard,
    orchestrator: Orchestrator,
    gallery: GalleryService,
    session_store: Arc<dyn SessionStore>,
    credentials: Arc<dyn CredentialStore>,
    autosave: JoinHandle<()>,
}

impl fmt::Debug for Studio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Studio")
            .field("config", &self.config)
            .field("status", &self.status.snapshot())
            .finish_non_exhaustive()
    }
}

impl Studio {
    /// Restores the saved session (or starts fresh) and starts autosave.
    ///
    /// Returns the studio and an optional warning key when the saved
    /// session could not be read. Must be called inside a tokio runtime.
    pub async fn open(config: Config, parts: Collaborators) -> (Self, Option<String>) {
        let (saved, warning) = match parts.session_store.load().await {
            Ok(saved) => (saved, None),
            Err(err) => {
                tracing::warn!(%err, "saved session unreadable, starting fresh");
                (None, Some(SESSION_LOAD_WARNING_KEY.to_string()))
            }
        };
        if saved.is_some() {
            tracing::info!("session restored");
        }
        let initial = saved.unwrap_or_else(|| SessionState {
            batch_size: config.generation.batch_size(),
            ..SessionState::default()
        });

        let controller = SessionController::new(initial);
        let autosave = session::spawn_autosave(
            parts.session_store.clone(),
            controller.subscribe(),
            config.session.autosave_debounce(),
        );
        let session = session::shared(controller);
        let status = StatusBoard::new();
        let orchestrator = Orchestrator::new(
            session.clone(),
            parts.backend,
            parts.credentials.clone(),
            status.clone(),
            config.generation_settings(),
        );
        let gallery = GalleryService::new(parts.gallery_store, config.gallery.undo_window());

        let studio = Self {
            config,
            session,
            status,
            orchestrator,
            gallery,
            session_store: parts.session_store,
            credentials: parts.credentials,
            autosave,
        };
        (studio, warning)
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    #[must_use]
    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    #[must_use]
    pub fn gallery(&self) -> &GalleryService {
        &self.gallery
    }

    /// Copy of the live session state.
    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state().clone()
    }

    /// Runs `action` against the session controller.
    pub async fn update<R>(&self, action: impl FnOnce(&mut SessionController) -> R) -> R {
        action(&mut *self.session.lock().await)
    }

    pub async fn undo(&self) -> bool {
        self.session.lock().await.undo()
    }

    pub async fn redo(&self) -> bool {
        self.session.lock().await.redo()
    }

    // =========================================================================
    // Generation
    // =========================================================================

    pub async fn generate(&self) -> GenerationOutcome {
        self.orchestrator.generate().await
    }

    /// Cancels the running generation, if any.
    pub fn stop(&self) {
        self.orchestrator.stop();
    }

    /// # Errors
    ///
    /// Returns the backend error, which is also shown on the status board.
    pub async fn enhance_prompt(&self) -> Result<bool> {
        Ok(self.orchestrator.enhance_prompt().await?)
    }

    /// # Errors
    ///
    /// Returns the backend error, which is also shown on the status board.
    pub async fn translate_prompt(&self) -> Result<bool> {
        Ok(self.orchestrator.translate_prompt().await?)
    }

    // =========================================================================
    // Local edits
    // =========================================================================

    /// Applies a local edit to the on-screen image. A failure leaves the
    /// session untouched and is reported on the status board.
    pub async fn apply_edit(&self, kind: EditKind) -> Option<Commit> {
        match session::apply_edit(&self.session, kind).await {
            Ok(commit) => commit,
            Err(err) => {
                self.status.report_error(err.message_key(), err.to_string());
                None
            }
        }
    }

    /// Inverts the mask. Failures are reported like [`Self::apply_edit`].
    pub async fn invert_mask(&self) -> Option<Commit> {
        match session::invert_mask(&self.session).await {
            Ok(commit) => commit,
            Err(err) => {
                self.status.report_error(err.message_key(), err.to_string());
                None
            }
        }
    }

    // =========================================================================
    // Gallery
    // =========================================================================

    /// Saves the generated and comparison images to the gallery.
    ///
    /// # Errors
    ///
    /// Returns the storage error, which is also shown on the status board.
    pub async fn save_to_gallery(&self) -> Result<usize> {
        let state = self.state().await;
        match self.gallery.save_current(&state).await {
            Ok(saved) => {
                tracing::info!(count = saved.len(), "saved to gallery");
                Ok(saved.len())
            }
            Err(err) => {
                self.status.report_error(err.message_key(), err.to_string());
                Err(err.into())
            }
        }
    }

    /// Starts over from the gallery image `id` in `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the gallery cannot be read or has no
    /// such image.
    pub async fn open_from_gallery(&self, id: &str, mode: StudioMode) -> Result<()> {
        let item = self
            .gallery
            .list(GallerySort::Newest)
            .await?
            .into_iter()
            .find(|item| item.id == id)
            .ok_or_else(|| {
                Error::Storage(crate::application::port::StorageError::NotFound(id.into()))
            })?;
        self.session
            .lock()
            .await
            .open_from_gallery(item.image, mode);
        Ok(())
    }

    // =========================================================================
    // Credential and lifecycle
    // =========================================================================

    #[must_use]
    pub fn has_credential(&self) -> bool {
        matches!(self.credentials.get(), Ok(Some(_)))
    }

    /// Stores a new API key and lifts the credential prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be stored.
    pub fn set_credential(&self, credential: &str) -> Result<()> {
        self.credentials.set(credential)?;
        self.status.require_credential(false);
        Ok(())
    }

    /// Returns to a fresh session and empties the snapshot slot.
    pub async fn reset(&self) {
        self.session.lock().await.reset();
        if let Err(err) = self.session_store.clear().await {
            tracing::warn!(%err, "failed to clear the saved session");
        }
        tracing::info!("session reset");
    }

    /// Stops autosave and writes the final snapshot.
    ///
    /// # Errors
    ///
    /// Returns the storage error of the final write.
    pub async fn shutdown(self) -> Result<()> {
        self.orchestrator.stop();
        self.autosave.abort();
        let state = self.state().await;
        self.session_store.save(&state).await?;
        tracing::debug!("final session snapshot written");
        Ok(())
    }
}
