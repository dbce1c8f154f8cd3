// SPDX-License-Identifier: MPL-2.0
//! Generative backend port definition.
//!
//! This module defines the [`GenerationBackend`] trait through which the
//! studio requests images, videos and prompt rewrites.
//!
//! # Design Notes
//!
//! - One [`GenerationBackend::generate_image`] call produces one batch unit;
//!   the orchestrator loops over units so progress stays monotonic
//! - Adapters classify provider failures into [`BackendError`] once, at the
//!   boundary; business logic never inspects raw messages
//! - Video generation is long-running and must sample the cancellation
//!   token between polls

use crate::application::cancellation::CancellationToken;
use crate::domain::media::{EncodedImage, VideoHandle};
use crate::domain::session::{AspectRatio, BatchSize, Fidelity, StudioMode};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

// =============================================================================
// BackendError
// =============================================================================

/// Classified failures of the generative backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The credential is missing or was rejected.
    Auth,

    /// The request or its result was blocked by content safety rules.
    Safety(String),

    /// Rate limit or quota exhausted.
    Quota,

    /// An input image could not be decoded by the provider.
    InvalidImage(String),

    /// The call succeeded but returned no usable media.
    NoResult,

    /// Transport failure before a response was received.
    Network(String),

    /// Anything else, with the provider's message.
    Generic(String),
}

impl BackendError {
    /// Classifies a raw provider message.
    ///
    /// Adapters call this once on error bodies they cannot map structurally.
    #[must_use]
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();

        if message.contains("API key not valid") || message.contains("API_KEY_INVALID") {
            return Self::Auth;
        }
        if message.contains("SAFETY") || lower.contains("blocked due to") {
            return Self::Safety(message.to_string());
        }
        if message.contains("RESOURCE_EXHAUSTED") || lower.contains("quota") {
            return Self::Quota;
        }
        if lower.contains("invalid argument") || lower.contains("image decoding failed") {
            return Self::InvalidImage(message.to_string());
        }
        Self::Generic(message.to_string())
    }

    /// Returns the localization key for this error.
    #[must_use]
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::Auth => "error-backend-auth",
            Self::Safety(_) => "error-backend-safety",
            Self::Quota => "error-backend-quota",
            Self::InvalidImage(_) => "error-backend-invalid-image",
            Self::NoResult => "error-backend-no-result",
            Self::Network(_) => "error-backend-network",
            Self::Generic(_) => "error-backend-generic",
        }
    }

    /// True when the user must provide a new credential.
    #[must_use]
    pub fn requires_credential(&self) -> bool {
        matches!(self, Self::Auth)
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth => write!(f, "The API key is missing or invalid"),
            Self::Safety(_) => write!(f, "The request was blocked by safety filters"),
            Self::Quota => write!(f, "Quota exceeded, try again later"),
            Self::InvalidImage(msg) => write!(f, "The provided image could not be processed: {msg}"),
            Self::NoResult => write!(f, "The backend did not return any media"),
            Self::Network(msg) => write!(f, "Network error: {msg}"),
            Self::Generic(msg) => write!(f, "Generation failed: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

// =============================================================================
// Requests
// =============================================================================

/// One unit of an image generation batch.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub mode: StudioMode,
    /// Mode- and function-specific instruction prepended by the adapter.
    pub instruction: String,
    pub prompt: String,
    pub negative_prompt: String,
    pub image1: Option<EncodedImage>,
    pub image2: Option<EncodedImage>,
    pub mask: Option<EncodedImage>,
    pub aspect_ratio: AspectRatio,
    pub fidelity: Fidelity,
    /// Zero-based unit index within the batch.
    pub unit: usize,
    pub batch_size: BatchSize,
}

/// A video generation request.
#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub image: Option<EncodedImage>,
    pub aspect_ratio: AspectRatio,
    pub include_audio: bool,
    /// Delay between completion polls.
    pub poll_interval: Duration,
}

// =============================================================================
// GenerationBackend Trait
// =============================================================================

/// Port for the generative backend.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generates the images of one batch unit.
    ///
    /// # Errors
    ///
    /// Returns a classified [`BackendError`].
    async fn generate_image(&self, request: &ImageRequest) -> Result<Vec<EncodedImage>, BackendError>;

    /// Generates a video, polling until it completes.
    ///
    /// Returns `Ok(None)` when `cancel` fired between polls. Any handle
    /// returned is owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns a classified [`BackendError`].
    async fn generate_video(
        &self,
        request: &VideoRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<VideoHandle>, BackendError>;

    /// Rewrites a prompt into a richer one in the same language.
    ///
    /// # Errors
    ///
    /// Returns a classified [`BackendError`].
    async fn enhance_prompt(&self, prompt: &str) -> Result<String, BackendError>;

    /// Translates a prompt between English and the user's language.
    ///
    /// # Errors
    ///
    /// Returns a classified [`BackendError`].
    async fn translate_prompt(&self, prompt: &str) -> Result<String, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_auth_messages() {
        assert_eq!(
            BackendError::from_message("400: API key not valid. Please pass a valid API key."),
            BackendError::Auth
        );
        assert_eq!(
            BackendError::from_message("reason: API_KEY_INVALID"),
            BackendError::Auth
        );
    }

    #[test]
    fn classifies_safety_messages() {
        assert!(matches!(
            BackendError::from_message("finishReason: SAFETY"),
            BackendError::Safety(_)
        ));
        assert!(matches!(
            BackendError::from_message("Response was blocked due to OTHER"),
            BackendError::Safety(_)
        ));
    }

    #[test]
    fn classifies_quota_and_invalid_image() {
        assert_eq!(
            BackendError::from_message("429 RESOURCE_EXHAUSTED"),
            BackendError::Quota
        );
        assert_eq!(
            BackendError::from_message("You exceeded your current quota"),
            BackendError::Quota
        );
        assert!(matches!(
            BackendError::from_message("Invalid argument: image decoding failed"),
            BackendError::InvalidImage(_)
        ));
    }

    #[test]
    fn unknown_messages_are_generic() {
        assert_eq!(
            BackendError::from_message("internal"),
            BackendError::Generic("internal".into())
        );
    }

    #[test]
    fn only_auth_requires_credential() {
        assert!(BackendError::Auth.requires_credential());
        assert!(!BackendError::Quota.requires_credential());
    }
}
