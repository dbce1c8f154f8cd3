// SPDX-License-Identifier: MPL-2.0
//! Generation guards derived from the session state.

use super::newtypes::BatchSize;
use super::state::SessionState;
use super::types::{EditFunction, StudioMode};

/// Why a generation request cannot start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationBlocker {
    /// Another generation is already running.
    InFlight,
    /// A backend mask suggestion is being computed.
    MaskSuggestionPending,
    MissingPrompt,
    MissingBaseImage,
    MissingSecondImage,
    /// Video mode needs at least a prompt or a start image.
    MissingPromptOrImage,
}

impl GenerationBlocker {
    /// Localization key describing the blocker.
    #[must_use]
    pub fn message_key(self) -> &'static str {
        match self {
            Self::InFlight => "generation-blocked-in-flight",
            Self::MaskSuggestionPending => "generation-blocked-masking",
            Self::MissingPrompt => "generation-blocked-prompt",
            Self::MissingBaseImage => "generation-blocked-base-image",
            Self::MissingSecondImage => "generation-blocked-second-image",
            Self::MissingPromptOrImage => "generation-blocked-prompt-or-image",
        }
    }
}

/// Checks whether a generation may start from `state`.
///
/// # Errors
///
/// Returns the first [`GenerationBlocker`] found.
pub fn check_generation(state: &SessionState, in_flight: bool) -> Result<(), GenerationBlocker> {
    if in_flight {
        return Err(GenerationBlocker::InFlight);
    }
    if state.ui.ai_masking {
        return Err(GenerationBlocker::MaskSuggestionPending);
    }

    let has_prompt = !state.prompt.trim().is_empty();
    let has_base = state.image1.is_some();

    match state.mode {
        StudioMode::Create => require(has_prompt, GenerationBlocker::MissingPrompt),
        StudioMode::Edit => {
            require(has_prompt, GenerationBlocker::MissingPrompt)?;
            require(has_base, GenerationBlocker::MissingBaseImage)?;
            if state.edit_function == EditFunction::Compose {
                require(state.image2.is_some(), GenerationBlocker::MissingSecondImage)?;
            }
            Ok(())
        }
        StudioMode::Render => {
            require(has_base, GenerationBlocker::MissingBaseImage)?;
            require(has_prompt, GenerationBlocker::MissingPrompt)
        }
        StudioMode::Video => require(
            has_prompt || has_base,
            GenerationBlocker::MissingPromptOrImage,
        ),
    }
}

fn require(condition: bool, blocker: GenerationBlocker) -> Result<(), GenerationBlocker> {
    if condition {
        Ok(())
    } else {
        Err(blocker)
    }
}

/// Number of backend units a generation from `state` will run.
#[must_use]
pub fn effective_batch_size(state: &SessionState) -> BatchSize {
    let batches = match state.mode {
        StudioMode::Create | StudioMode::Render => true,
        StudioMode::Edit => state.edit_function.supports_batch(),
        StudioMode::Video => false,
    };
    if batches {
        state.batch_size
    } else {
        BatchSize::SINGLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::media::{EncodedImage, ImageKind};

    fn image() -> EncodedImage {
        EncodedImage::new(vec![1, 2, 3], ImageKind::Png, 1, 1)
    }

    fn state(mode: StudioMode, prompt: &str) -> SessionState {
        SessionState {
            mode,
            prompt: prompt.to_string(),
            ..SessionState::default()
        }
    }

    #[test]
    fn create_requires_prompt() {
        assert_eq!(
            check_generation(&state(StudioMode::Create, "  "), false),
            Err(GenerationBlocker::MissingPrompt)
        );
        assert_eq!(check_generation(&state(StudioMode::Create, "fox"), false), Ok(()));
    }

    #[test]
    fn in_flight_blocks_everything() {
        assert_eq!(
            check_generation(&state(StudioMode::Create, "fox"), true),
            Err(GenerationBlocker::InFlight)
        );
    }

    #[test]
    fn pending_mask_suggestion_blocks() {
        let mut s = state(StudioMode::Create, "fox");
        s.ui.ai_masking = true;
        assert_eq!(
            check_generation(&s, false),
            Err(GenerationBlocker::MaskSuggestionPending)
        );
    }

    #[test]
    fn compose_requires_two_images() {
        let mut s = state(StudioMode::Edit, "merge");
        s.edit_function = EditFunction::Compose;
        s.image1 = Some(image());
        assert_eq!(
            check_generation(&s, false),
            Err(GenerationBlocker::MissingSecondImage)
        );
        s.image2 = Some(image());
        assert_eq!(check_generation(&s, false), Ok(()));
    }

    #[test]
    fn edit_requires_base_image() {
        let s = state(StudioMode::Edit, "oil painting");
        assert_eq!(
            check_generation(&s, false),
            Err(GenerationBlocker::MissingBaseImage)
        );
    }

    #[test]
    fn render_requires_image_and_prompt() {
        let mut s = state(StudioMode::Render, "");
        s.image1 = Some(image());
        assert_eq!(check_generation(&s, false), Err(GenerationBlocker::MissingPrompt));
    }

    #[test]
    fn video_accepts_image_or_prompt() {
        assert_eq!(
            check_generation(&state(StudioMode::Video, ""), false),
            Err(GenerationBlocker::MissingPromptOrImage)
        );
        assert_eq!(check_generation(&state(StudioMode::Video, "waves"), false), Ok(()));
        let mut s = state(StudioMode::Video, "");
        s.image1 = Some(image());
        assert_eq!(check_generation(&s, false), Ok(()));
    }

    #[test]
    fn batch_applies_only_to_batching_workflows() {
        let mut s = state(StudioMode::Create, "fox");
        s.batch_size = BatchSize::new(3);
        assert_eq!(effective_batch_size(&s).value(), 3);

        s.mode = StudioMode::Edit;
        s.edit_function = EditFunction::Compose;
        assert_eq!(effective_batch_size(&s).value(), 1);

        s.edit_function = EditFunction::Retouch;
        assert_eq!(effective_batch_size(&s).value(), 3);

        s.mode = StudioMode::Video;
        assert_eq!(effective_batch_size(&s).value(), 1);
    }
}
