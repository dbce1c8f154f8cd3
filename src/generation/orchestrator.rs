// SPDX-License-Identifier: MPL-2.0
//! Runs one generation at a time against the backend and commits its
//! outcome to the session.
//!
//! A run moves from idle to requesting and ends succeeded, cancelled or
//! failed. The in-flight flag and progress are reset on every exit path.
//! Cancellation is cooperative: the token is sampled after each await, and
//! a request already on the wire is left to finish and then ignored.

use super::status::StatusBoard;
use crate::application::cancellation::CancellationToken;
use crate::application::port::{
    BackendError, CredentialStore, GenerationBackend, ImageRequest, VideoRequest,
};
use crate::application::prompt;
use crate::domain::media::{EncodedImage, VideoHandle};
use crate::domain::session::{
    check_generation, effective_batch_size, EditFunction, GenerationBlocker, SessionState,
    StudioMode,
};
use crate::media::{self, run_blocking, RasterError, WatermarkSource};
use crate::session::SharedSession;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Default interval between video operation polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default label stamped when no custom watermark is set.
pub const DEFAULT_BRAND_TEXT: &str = "AI Image Studio";

// =============================================================================
// Errors and outcomes
// =============================================================================

/// Why a generation run failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    Backend(BackendError),
    /// Padding or watermarking of the images failed locally.
    Raster(RasterError),
}

impl GenerationError {
    #[must_use]
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::Backend(err) => err.message_key(),
            Self::Raster(err) => err.message_key(),
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(err) => write!(f, "{err}"),
            Self::Raster(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            Self::Raster(err) => Some(err),
        }
    }
}

impl From<BackendError> for GenerationError {
    fn from(err: BackendError) -> Self {
        Self::Backend(err)
    }
}

impl From<RasterError> for GenerationError {
    fn from(err: RasterError) -> Self {
        Self::Raster(err)
    }
}

/// How a call to [`Orchestrator::generate`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Results were committed to the session.
    Succeeded,
    /// The user stopped the run. Nothing was committed.
    Cancelled,
    /// The run failed and the failed attempt was rolled back.
    Failed(GenerationError),
    /// The run never started.
    Blocked(GenerationBlocker),
}

/// Tunables of the orchestrator.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub video_poll_interval: Duration,
    pub brand_text: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            video_poll_interval: DEFAULT_POLL_INTERVAL,
            brand_text: DEFAULT_BRAND_TEXT.to_string(),
        }
    }
}

/// Results of an image run, ready to commit.
struct ImageBatch {
    images: Vec<EncodedImage>,
    comparison: Option<EncodedImage>,
}

#[derive(Debug, Clone, Copy)]
enum PromptRewrite {
    Enhance,
    Translate,
}

impl PromptRewrite {
    fn label(self) -> &'static str {
        match self {
            Self::Enhance => "enhance",
            Self::Translate => "translate",
        }
    }
}

/// Clears the in-flight flag however the run ends.
struct FlightGuard<'a>(&'a StatusBoard);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Drives generation requests with injected collaborators.
pub struct Orchestrator {
    session: SharedSession,
    backend: Arc<dyn GenerationBackend>,
    credentials: Arc<dyn CredentialStore>,
    status: StatusBoard,
    cancel: Mutex<CancellationToken>,
    settings: GenerationSettings,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("status", &self.status.snapshot())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        session: SharedSession,
        backend: Arc<dyn GenerationBackend>,
        credentials: Arc<dyn CredentialStore>,
        status: StatusBoard,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            session,
            backend,
            credentials,
            status,
            cancel: Mutex::new(CancellationToken::new()),
            settings,
        }
    }

    #[must_use]
    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    /// Requests cancellation of the running generation.
    pub fn stop(&self) {
        if !self.status.is_in_flight() {
            return;
        }
        self.token().cancel();
        self.status.notify_cancelled();
        tracing::info!("generation cancelled by user");
    }

    fn token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Raises the in-flight flag and installs a fresh token under one lock,
    /// so a `stop()` that sees the flag always cancels this run's token.
    fn begin(&self, total: usize) -> Option<CancellationToken> {
        let mut slot = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.status.try_begin(total) {
            return None;
        }
        let token = CancellationToken::new();
        *slot = token.clone();
        Some(token)
    }

    /// Runs a generation from the current session state.
    pub async fn generate(&self) -> GenerationOutcome {
        let snapshot = self.session.lock().await.state().clone();
        if let Err(blocker) = check_generation(&snapshot, self.status.is_in_flight()) {
            tracing::debug!(reason = blocker.message_key(), "generation blocked");
            return GenerationOutcome::Blocked(blocker);
        }

        let is_video = snapshot.mode == StudioMode::Video;
        let total = if is_video {
            1
        } else {
            effective_batch_size(&snapshot).as_usize()
        };
        let Some(token) = self.begin(total) else {
            return GenerationOutcome::Blocked(GenerationBlocker::InFlight);
        };
        let _flight = FlightGuard(&self.status);
        tracing::info!(mode = snapshot.mode.as_str(), total, "generation started");

        let outcome = if is_video {
            match self.run_video(&snapshot, &token).await {
                Ok(Some(video)) => {
                    self.commit_video(video).await;
                    Ok(true)
                }
                Ok(None) => Ok(false),
                Err(err) => Err(err),
            }
        } else {
            match self.run_images(&snapshot, total, &token).await {
                Ok(Some(batch)) => {
                    self.commit_images(&snapshot, batch).await;
                    Ok(true)
                }
                Ok(None) => Ok(false),
                Err(err) => Err(err),
            }
        };

        match outcome {
            Ok(true) => {
                tracing::info!(mode = snapshot.mode.as_str(), "generation succeeded");
                GenerationOutcome::Succeeded
            }
            Ok(false) => {
                tracing::info!(mode = snapshot.mode.as_str(), "generation cancelled");
                GenerationOutcome::Cancelled
            }
            Err(err) => {
                self.fail(is_video, &err).await;
                GenerationOutcome::Failed(err)
            }
        }
    }

    // =========================================================================
    // Image runs
    // =========================================================================

    async fn run_images(
        &self,
        snapshot: &SessionState,
        total: usize,
        token: &CancellationToken,
    ) -> Result<Option<ImageBatch>, GenerationError> {
        let compose = snapshot.mode == StudioMode::Edit
            && snapshot.edit_function == EditFunction::Compose;

        let mut base = snapshot.image1.clone();
        if snapshot.mode == StudioMode::Render {
            if let Some(source) = base.take() {
                let ratio = snapshot.aspect_ratio;
                base = Some(run_blocking(move || media::pad_to_aspect(&source, ratio)).await?);
                if token.is_cancelled() {
                    return Ok(None);
                }
            }
        }

        let comparison = match snapshot.mode {
            StudioMode::Edit | StudioMode::Render if !compose => base.clone(),
            _ => None,
        };

        let mut request = ImageRequest {
            mode: snapshot.mode,
            instruction: prompt::instruction_for(snapshot),
            prompt: snapshot.prompt.clone(),
            negative_prompt: snapshot.negative_prompt.clone(),
            image1: base,
            image2: if compose { snapshot.image2.clone() } else { None },
            mask: snapshot.effective_mask().cloned(),
            aspect_ratio: snapshot.aspect_ratio,
            fidelity: snapshot.render_fidelity,
            unit: 0,
            batch_size: effective_batch_size(snapshot),
        };

        let mut images = Vec::with_capacity(total);
        for unit in 0..total {
            if token.is_cancelled() {
                return Ok(None);
            }
            request.unit = unit;
            let produced = self.backend.generate_image(&request).await;
            if token.is_cancelled() {
                tracing::debug!(unit, "discarding result of a cancelled unit");
                return Ok(None);
            }
            images.extend(produced?);
            self.status.set_progress(unit + 1, total);
        }
        if images.is_empty() {
            return Err(BackendError::NoResult.into());
        }

        if snapshot.add_watermark {
            images = self.watermark_all(snapshot, images).await?;
            if token.is_cancelled() {
                return Ok(None);
            }
        }

        Ok(Some(ImageBatch { images, comparison }))
    }

    async fn watermark_all(
        &self,
        snapshot: &SessionState,
        images: Vec<EncodedImage>,
    ) -> Result<Vec<EncodedImage>, RasterError> {
        let logo = snapshot.custom_watermark.clone();
        let brand = self.settings.brand_text.clone();
        run_blocking(move || {
            let mark = match &logo {
                Some(logo) => WatermarkSource::Image(logo),
                None => WatermarkSource::Text(&brand),
            };
            images
                .iter()
                .map(|image| media::watermark(image, mark))
                .collect()
        })
        .await
    }

    async fn commit_images(&self, snapshot: &SessionState, batch: ImageBatch) {
        let ImageBatch { images, comparison } = batch;
        let chains = matches!(snapshot.mode, StudioMode::Edit | StudioMode::Render);
        let compose = snapshot.mode == StudioMode::Edit
            && snapshot.edit_function == EditFunction::Compose;

        self.session.lock().await.apply(|s| {
            s.generated_video = None;
            s.mask.image = None;
            s.ui.show_comparator = comparison.is_some();
            s.comparison_image = comparison;
            s.ui.selected_index = 0;
            if chains {
                let first = images[0].clone();
                if compose {
                    s.original_image1 = Some(first.clone());
                    s.image2 = None;
                }
                s.image1 = Some(first);
            }
            s.generated_images = Some(images);
        });
    }

    // =========================================================================
    // Video runs
    // =========================================================================

    async fn run_video(
        &self,
        snapshot: &SessionState,
        token: &CancellationToken,
    ) -> Result<Option<VideoHandle>, GenerationError> {
        let request = VideoRequest {
            prompt: snapshot.prompt.clone(),
            negative_prompt: snapshot.negative_prompt.clone(),
            image: snapshot.image1.clone(),
            aspect_ratio: snapshot.video_aspect_ratio,
            include_audio: snapshot.video_include_audio,
            poll_interval: self.settings.video_poll_interval,
        };

        let video = self.backend.generate_video(&request, token).await?;
        if token.is_cancelled() {
            if let Some(video) = video {
                video.release();
            }
            return Ok(None);
        }
        match video {
            Some(video) => {
                self.status.set_progress(1, 1);
                Ok(Some(video))
            }
            None => Ok(None),
        }
    }

    async fn commit_video(&self, video: VideoHandle) {
        self.session.lock().await.apply(|s| {
            s.generated_video = Some(video);
            s.comparison_image = None;
            s.mask.image = None;
            s.ui.show_comparator = false;
        });
    }

    // =========================================================================
    // Failure
    // =========================================================================

    async fn fail(&self, is_video: bool, err: &GenerationError) {
        tracing::warn!(key = err.message_key(), %err, "generation failed");

        if let GenerationError::Backend(backend) = err {
            if backend.requires_credential() {
                self.credentials.mark_rejected();
                self.status.require_credential(true);
            }
        }

        self.session.lock().await.apply(|s| {
            s.comparison_image = None;
            if is_video {
                s.generated_video = None;
            } else {
                s.generated_images = None;
            }
        });
        self.status.report_error(err.message_key(), err.to_string());
    }

    // =========================================================================
    // Prompt helpers
    // =========================================================================

    /// Rewrites the prompt with more detail.
    ///
    /// A blank prompt is left alone without calling the backend. Returns
    /// whether the prompt changed.
    ///
    /// # Errors
    ///
    /// Returns the backend error after reporting it on the status board.
    pub async fn enhance_prompt(&self) -> Result<bool, BackendError> {
        self.rewrite_prompt(PromptRewrite::Enhance).await
    }

    /// Translates the prompt between the two supported languages.
    ///
    /// # Errors
    ///
    /// Returns the backend error after reporting it on the status board.
    pub async fn translate_prompt(&self) -> Result<bool, BackendError> {
        self.rewrite_prompt(PromptRewrite::Translate).await
    }

    async fn rewrite_prompt(&self, rewrite: PromptRewrite) -> Result<bool, BackendError> {
        let action = rewrite.label();
        let current = self.session.lock().await.state().prompt.clone();
        if current.trim().is_empty() {
            return Ok(false);
        }

        let rewritten = match rewrite {
            PromptRewrite::Enhance => self.backend.enhance_prompt(&current).await,
            PromptRewrite::Translate => self.backend.translate_prompt(&current).await,
        };

        match rewritten {
            Ok(text) => {
                self.session.lock().await.set_prompt(text);
                tracing::debug!(action, "prompt rewritten");
                Ok(true)
            }
            Err(err) => {
                tracing::warn!(action, key = err.message_key(), %err, "prompt rewrite failed");
                if err.requires_credential() {
                    self.credentials.mark_rejected();
                    self.status.require_credential(true);
                }
                self.status.report_error(err.message_key(), err.to_string());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::{AspectRatio, BatchSize};
    use crate::generation::status::{Progress, StatusMessage};
    use crate::infrastructure::memory::{MemoryCredentialStore, StubBackend};
    use crate::media::codec::test_images::solid;
    use crate::session::{shared, SessionController};

    fn orchestrator(backend: Arc<StubBackend>, state: SessionState) -> Orchestrator {
        Orchestrator::new(
            shared(SessionController::new(state)),
            backend,
            Arc::new(MemoryCredentialStore::default()),
            StatusBoard::new(),
            GenerationSettings::default(),
        )
    }

    fn create_state(prompt: &str) -> SessionState {
        SessionState {
            prompt: prompt.to_string(),
            ..SessionState::default()
        }
    }

    #[tokio::test]
    async fn simple_create_commits_one_history_entry() {
        let backend = Arc::new(StubBackend::returning(vec![solid(8, 8, [1, 2, 3, 255])]));
        let orchestrator = orchestrator(backend.clone(), SessionState::default());
        orchestrator.session.lock().await.set_prompt("a red fox");
        let before = orchestrator.session.lock().await.history_len();

        assert_eq!(orchestrator.generate().await, GenerationOutcome::Succeeded);

        let session = orchestrator.session.lock().await;
        assert_eq!(session.state().generated_images.as_ref().map(Vec::len), Some(1));
        assert_eq!(session.history_len(), before + 1);
        assert_eq!(session.history_index(), before);
        assert!(!orchestrator.status.is_in_flight());
        assert_eq!(orchestrator.status.snapshot().progress, Progress::default());
    }

    #[tokio::test]
    async fn batch_units_run_sequentially() {
        let backend = Arc::new(StubBackend::returning(vec![solid(4, 4, [0, 0, 0, 255])]));
        let mut state = create_state("tiles");
        state.batch_size = BatchSize::new(3);
        let orchestrator = orchestrator(backend.clone(), state);

        orchestrator.generate().await;
        assert_eq!(backend.image_units(), vec![0, 1, 2]);
        let session = orchestrator.session.lock().await;
        assert_eq!(session.state().generated_images.as_ref().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn blocked_run_changes_nothing() {
        let backend = Arc::new(StubBackend::returning(vec![solid(4, 4, [0, 0, 0, 255])]));
        let orchestrator = orchestrator(backend.clone(), SessionState::default());
        assert_eq!(
            orchestrator.generate().await,
            GenerationOutcome::Blocked(GenerationBlocker::MissingPrompt)
        );
        assert!(backend.image_units().is_empty());
        assert_eq!(orchestrator.session.lock().await.history_len(), 1);
    }

    #[tokio::test]
    async fn render_pads_the_base_and_compares_against_it() {
        let backend = Arc::new(StubBackend::returning(vec![solid(16, 9, [9, 9, 9, 255])]));
        let mut state = create_state("modern villa");
        state.mode = StudioMode::Render;
        state.aspect_ratio = AspectRatio::Widescreen;
        state.image1 = Some(solid(400, 300, [200, 200, 200, 255]));
        let orchestrator = orchestrator(backend.clone(), state);

        assert_eq!(orchestrator.generate().await, GenerationOutcome::Succeeded);
        let sent = backend.last_image_request().expect("request sent");
        assert_eq!(sent.image1.map(|i| i.dimensions()), Some((533, 300)));

        let session = orchestrator.session.lock().await;
        let comparison = session.state().comparison_image.clone().expect("comparison");
        assert_eq!(comparison.dimensions(), (533, 300));
        assert!(session.state().ui.show_comparator);
    }

    #[tokio::test]
    async fn auth_failure_rolls_back_and_asks_for_a_credential() {
        let backend = Arc::new(StubBackend::failing(BackendError::Auth));
        let credentials = Arc::new(MemoryCredentialStore::with_value("bad-key"));
        let mut state = create_state("fox");
        state.generated_images = Some(vec![solid(2, 2, [0, 0, 0, 255])]);
        state.comparison_image = Some(solid(2, 2, [1, 1, 1, 255]));
        let orchestrator = Orchestrator::new(
            shared(SessionController::new(state)),
            backend,
            credentials.clone(),
            StatusBoard::new(),
            GenerationSettings::default(),
        );

        let outcome = orchestrator.generate().await;
        assert_eq!(
            outcome,
            GenerationOutcome::Failed(GenerationError::Backend(BackendError::Auth))
        );

        let status = orchestrator.status.snapshot();
        assert!(status.credential_required);
        assert!(!status.in_flight);
        assert_eq!(
            status.message,
            Some(StatusMessage::error(
                "error-backend-auth",
                BackendError::Auth.to_string()
            ))
        );
        assert!(credentials.was_rejected());

        let session = orchestrator.session.lock().await;
        assert!(session.state().generated_images.is_none());
        assert!(session.state().comparison_image.is_none());
    }

    #[tokio::test]
    async fn empty_backend_answer_is_a_failure() {
        let backend = Arc::new(StubBackend::returning(Vec::new()));
        let orchestrator = orchestrator(backend, create_state("nothing"));
        assert_eq!(
            orchestrator.generate().await,
            GenerationOutcome::Failed(GenerationError::Backend(BackendError::NoResult))
        );
    }

    #[tokio::test]
    async fn watermark_uses_the_custom_logo() {
        let backend = Arc::new(StubBackend::returning(vec![solid(100, 100, [0, 0, 0, 255])]));
        let mut state = create_state("stamped");
        state.add_watermark = true;
        state.custom_watermark = Some(solid(10, 10, [255, 255, 255, 255]));
        let orchestrator = orchestrator(backend, state);

        orchestrator.generate().await;
        let session = orchestrator.session.lock().await;
        let result = session.state().on_screen_image().expect("result").clone();
        let px = crate::media::codec::test_images::pixels(&result);
        assert!(px.get_pixel(92, 92).0[0] > 150);
        assert_eq!(px.get_pixel(10, 10).0, [0, 0, 0, 255]);
    }

    #[tokio::test]
    async fn video_success_replaces_the_previous_video() {
        let old = VideoHandle::new("/nonexistent/old.mp4", "video/mp4");
        let backend = Arc::new(StubBackend::returning(Vec::new()));
        let mut state = create_state("waves");
        state.mode = StudioMode::Video;
        state.generated_video = Some(old.clone());
        let orchestrator = orchestrator(backend.clone(), state);

        assert_eq!(orchestrator.generate().await, GenerationOutcome::Succeeded);
        assert!(old.is_released());
        let session = orchestrator.session.lock().await;
        let video = session.state().generated_video.clone().expect("video");
        assert!(!video.is_released());
        assert_eq!(backend.video_calls(), 1);
    }

    #[tokio::test]
    async fn blank_prompt_is_not_enhanced() {
        let backend = Arc::new(StubBackend::returning(Vec::new()));
        let orchestrator = orchestrator(backend.clone(), SessionState::default());
        orchestrator.session.lock().await.set_prompt("   ");
        assert_eq!(orchestrator.enhance_prompt().await, Ok(false));
        assert_eq!(backend.text_calls(), 0);
    }

    #[tokio::test]
    async fn enhanced_prompt_replaces_the_prompt() {
        let backend = Arc::new(StubBackend::returning(Vec::new()));
        let orchestrator = orchestrator(backend.clone(), create_state("cat"));
        assert_eq!(orchestrator.enhance_prompt().await, Ok(true));
        assert_eq!(
            orchestrator.session.lock().await.state().prompt,
            "enhanced: cat"
        );
        assert_eq!(orchestrator.translate_prompt().await, Ok(true));
        assert_eq!(
            orchestrator.session.lock().await.state().prompt,
            "translated: enhanced: cat"
        );
    }

    #[test]
    fn stop_reaches_the_token_of_the_running_generation() {
        let backend = Arc::new(StubBackend::returning(Vec::new()));
        let orchestrator = orchestrator(backend, SessionState::default());

        let running = orchestrator.begin(2).expect("idle orchestrator starts");
        assert!(orchestrator.begin(1).is_none());
        orchestrator.stop();

        assert!(running.is_cancelled());
        assert_eq!(
            orchestrator.status.snapshot().message,
            Some(StatusMessage::Cancelled)
        );
    }

    #[test]
    fn stop_without_a_run_does_nothing() {
        let backend = Arc::new(StubBackend::returning(Vec::new()));
        let orchestrator = orchestrator(backend, SessionState::default());
        orchestrator.stop();
        assert_eq!(orchestrator.status.snapshot().message, None);
    }
}
