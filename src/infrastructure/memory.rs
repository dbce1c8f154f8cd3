// SPDX-License-Identifier: MPL-2.0
//! In-memory collaborators for tests and offline runs.
//!
//! The stub backend answers every image unit with a scripted batch and
//! records what it was asked, so callers can check ordering and payloads.

use crate::application::cancellation::CancellationToken;
use crate::application::port::{
    BackendError, CredentialError, CredentialStore, GalleryStore, GenerationBackend, ImageRequest,
    SessionStore, StorageError, VideoRequest,
};
use crate::domain::gallery::GalleryImage;
use crate::domain::media::{EncodedImage, VideoHandle};
use crate::domain::session::SessionState;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Name under which the in-memory store keeps the API credential.
pub const CREDENTIAL_KEY: &str = "google-ai-studio-api-key";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Stores
// =============================================================================

/// Session slot held in memory.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<SessionState>>,
    saves: AtomicUsize,
}

impl MemorySessionStore {
    /// Starts with `state` already saved.
    #[must_use]
    pub fn with_saved(state: SessionState) -> Self {
        Self {
            slot: Mutex::new(Some(state)),
            saves: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn saved(&self) -> Option<SessionState> {
        lock(&self.slot).clone()
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<SessionState>, StorageError> {
        Ok(self.saved())
    }

    async fn save(&self, state: &SessionState) -> Result<(), StorageError> {
        *lock(&self.slot) = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        lock(&self.slot).take();
        Ok(())
    }
}

/// Gallery records held in memory, keyed by id.
#[derive(Debug, Default)]
pub struct MemoryGalleryStore {
    items: Mutex<BTreeMap<String, GalleryImage>>,
}

#[async_trait]
impl GalleryStore for MemoryGalleryStore {
    async fn list(&self) -> Result<Vec<GalleryImage>, StorageError> {
        Ok(lock(&self.items).values().cloned().collect())
    }

    async fn put(&self, image: &GalleryImage) -> Result<(), StorageError> {
        lock(&self.items).insert(image.id.clone(), image.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        lock(&self.items).remove(id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        lock(&self.items).clear();
        Ok(())
    }
}

/// Credential held in memory.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: Mutex<BTreeMap<&'static str, String>>,
    rejected: AtomicBool,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn with_value(credential: &str) -> Self {
        let store = Self::default();
        lock(&store.values).insert(CREDENTIAL_KEY, credential.to_string());
        store
    }

    #[must_use]
    pub fn was_rejected(&self) -> bool {
        self.rejected.load(Ordering::SeqCst)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<String>, CredentialError> {
        Ok(lock(&self.values).get(CREDENTIAL_KEY).cloned())
    }

    fn set(&self, credential: &str) -> Result<(), CredentialError> {
        lock(&self.values).insert(CREDENTIAL_KEY, credential.to_string());
        self.rejected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        lock(&self.values).remove(CREDENTIAL_KEY);
        Ok(())
    }

    fn mark_rejected(&self) {
        self.rejected.store(true, Ordering::SeqCst);
    }
}

// =============================================================================
// Stub backend
// =============================================================================

/// Scripted generation backend.
#[derive(Debug)]
pub struct StubBackend {
    answer: Result<Vec<EncodedImage>, BackendError>,
    delay: Duration,
    image_requests: Mutex<Vec<ImageRequest>>,
    video_calls: AtomicUsize,
    text_calls: AtomicUsize,
}

impl StubBackend {
    /// Answers every image unit with `images`.
    #[must_use]
    pub fn returning(images: Vec<EncodedImage>) -> Self {
        Self::with_answer(Ok(images))
    }

    /// Fails every call with `error`.
    #[must_use]
    pub fn failing(error: BackendError) -> Self {
        Self::with_answer(Err(error))
    }

    fn with_answer(answer: Result<Vec<EncodedImage>, BackendError>) -> Self {
        Self {
            answer,
            delay: Duration::ZERO,
            image_requests: Mutex::new(Vec::new()),
            video_calls: AtomicUsize::new(0),
            text_calls: AtomicUsize::new(0),
        }
    }

    /// Makes every call take `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Unit indices of the image calls received, in order.
    #[must_use]
    pub fn image_units(&self) -> Vec<usize> {
        lock(&self.image_requests).iter().map(|r| r.unit).collect()
    }

    #[must_use]
    pub fn last_image_request(&self) -> Option<ImageRequest> {
        lock(&self.image_requests).last().cloned()
    }

    #[must_use]
    pub fn video_calls(&self) -> usize {
        self.video_calls.load(Ordering::SeqCst)
    }

    /// Number of enhance and translate calls.
    #[must_use]
    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    fn text_answer(&self, prefix: &str, prompt: &str) -> Result<String, BackendError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Ok(_) => Ok(format!("{prefix}: {prompt}")),
            Err(err) => Err(err.clone()),
        }
    }
}

#[async_trait]
impl GenerationBackend for StubBackend {
    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> Result<Vec<EncodedImage>, BackendError> {
        lock(&self.image_requests).push(request.clone());
        self.pause().await;
        self.answer.clone()
    }

    async fn generate_video(
        &self,
        request: &VideoRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<VideoHandle>, BackendError> {
        let call = self.video_calls.fetch_add(1, Ordering::SeqCst);
        if let Err(err) = &self.answer {
            return Err(err.clone());
        }
        self.pause().await;
        if cancel.is_cancelled() {
            return Ok(None);
        }
        let path = std::env::temp_dir().join(format!(
            "image-studio-stub-{}-{call}.mp4",
            std::process::id()
        ));
        tracing::debug!(aspect = request.aspect_ratio.as_str(), "stub video ready");
        Ok(Some(VideoHandle::new(path, "video/mp4")))
    }

    async fn enhance_prompt(&self, prompt: &str) -> Result<String, BackendError> {
        self.pause().await;
        self.text_answer("enhanced", prompt)
    }

    async fn translate_prompt(&self, prompt: &str) -> Result<String, BackendError> {
        self.pause().await;
        self.text_answer("translated", prompt)
    }
}
