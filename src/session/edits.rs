// SPDX-License-Identifier: MPL-2.0
//! Client-side edits of the on-screen image.
//!
//! An edit snapshots its source under the session lock, renders on the
//! blocking pool without holding the lock, then commits only if the same
//! buffer is still on screen. A failed render leaves the session as it was.

use super::controller::{Commit, SessionController};
use super::SharedSession;
use crate::domain::media::EncodedImage;
use crate::domain::session::{EditFunction, ImageFilter, Rotation, SessionState};
use crate::media::{self, run_blocking, RasterError};

/// A raster edit applied to the on-screen image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Burn the pending text overlay in.
    Text,
    /// Cut the session's crop rectangle out.
    Crop,
    Filter(ImageFilter),
    Rotate(Rotation),
}

impl EditKind {
    fn label(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Crop => "crop",
            Self::Filter(_) => "filter",
            Self::Rotate(_) => "rotate",
        }
    }
}

impl SessionController {
    /// Commits the result of an edit rendered from `source`.
    ///
    /// Returns `None` without touching the session when `source` is no
    /// longer the on-screen image.
    pub fn commit_edit(
        &mut self,
        source: &EncodedImage,
        result: EncodedImage,
        kind: EditKind,
    ) -> Option<Commit> {
        let still_shown = self
            .state()
            .on_screen_image()
            .is_some_and(|current| current.same_buffer(source));
        if !still_shown {
            tracing::debug!(edit = kind.label(), "discarding edit of a superseded image");
            return None;
        }

        let source = source.clone();
        Some(self.apply(|s| {
            match kind {
                EditKind::Text => {
                    s.comparison_image = Some(source);
                    s.text_overlay.text.clear();
                    s.edit_function = EditFunction::AddRemove;
                }
                EditKind::Crop => {
                    s.comparison_image = Some(source);
                    s.image1 = Some(result.clone());
                    s.ui.is_cropping = false;
                }
                EditKind::Filter(_) | EditKind::Rotate(_) => {
                    if s.comparison_image.is_none() {
                        s.comparison_image = Some(source);
                    }
                }
            }
            replace_on_screen(s, result);
            s.ui.show_comparator = true;
        }))
    }
}

/// Puts `result` in the selected result slot, or starts a batch with it.
fn replace_on_screen(state: &mut SessionState, result: EncodedImage) {
    let index = state.ui.selected_index;
    match state.generated_images.as_mut() {
        Some(images) if index < images.len() => images[index] = result,
        _ => {
            state.generated_images = Some(vec![result]);
            state.ui.selected_index = 0;
        }
    }
}

/// Renders `kind` from the on-screen image and commits it.
///
/// Returns `Ok(None)` when there is nothing to edit (no image, or blank
/// overlay text) or when the image changed while rendering.
///
/// # Errors
///
/// Returns the [`RasterError`] of the render. The session is untouched.
pub async fn apply_edit(
    session: &SharedSession,
    kind: EditKind,
) -> Result<Option<Commit>, RasterError> {
    let (source, overlay, rect) = {
        let guard = session.lock().await;
        let state = guard.state();
        let Some(source) = state.on_screen_image().cloned() else {
            return Ok(None);
        };
        if kind == EditKind::Text && state.text_overlay.text.trim().is_empty() {
            return Ok(None);
        }
        (source, state.text_overlay.clone(), state.crop)
    };

    let input = source.clone();
    let result = run_blocking(move || match kind {
        EditKind::Text => media::burn_text(&input, &overlay),
        EditKind::Crop => media::crop(&input, &rect),
        EditKind::Filter(filter) => media::apply_filter(&input, filter),
        EditKind::Rotate(rotation) => media::rotate(&input, rotation),
    })
    .await
    .inspect_err(|err| tracing::warn!(edit = kind.label(), %err, "edit failed"))?;

    Ok(session.lock().await.commit_edit(&source, result, kind))
}

/// Inverts the mask against the on-screen image and commits it.
///
/// The new mask takes the image's natural size. Returns `Ok(None)` when
/// there is no image or when image or mask changed while rendering.
///
/// # Errors
///
/// Returns the [`RasterError`] of the render.
pub async fn invert_mask(session: &SharedSession) -> Result<Option<Commit>, RasterError> {
    let (base, mask) = {
        let guard = session.lock().await;
        let state = guard.state();
        let Some(base) = state.on_screen_image().cloned() else {
            return Ok(None);
        };
        (base, state.mask.image.clone())
    };

    let (input, stencil) = (base.clone(), mask.clone());
    let inverted = run_blocking(move || media::invert_mask(&input, stencil.as_ref()))
        .await
        .inspect_err(|err| tracing::warn!(%err, "mask inversion failed"))?;

    let mut guard = session.lock().await;
    let unchanged = guard
        .state()
        .on_screen_image()
        .is_some_and(|current| current.same_buffer(&base))
        && guard.state().mask.image == mask;
    if !unchanged {
        return Ok(None);
    }
    Ok(Some(guard.set_mask_image(inverted)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::CropRect;
    use crate::media::codec::test_images::{pixels, solid};
    use crate::session::shared;

    fn session_with_result(image: EncodedImage) -> SharedSession {
        let mut controller = SessionController::new(SessionState::default());
        controller.apply(|s| s.generated_images = Some(vec![image]));
        shared(controller)
    }

    #[tokio::test]
    async fn crop_replaces_the_slot_and_is_undoable() {
        let original = solid(100, 80, [10, 20, 30, 255]);
        let session = session_with_result(original.clone());
        {
            let mut guard = session.lock().await;
            guard.set_crop_rect(CropRect::new(0.0, 0.0, 50.0, 50.0));
            guard.start_cropping();
        }
        let before = session.lock().await.history_len();

        let commit = apply_edit(&session, EditKind::Crop).await.expect("crop");
        assert_eq!(commit, Some(Commit::Recorded));

        let mut guard = session.lock().await;
        assert_eq!(guard.history_len(), before + 1);
        let cropped = guard.state().generated_images.clone().expect("results");
        assert_eq!(cropped[0].dimensions(), (50, 40));
        assert_eq!(guard.state().image1.as_ref().map(EncodedImage::dimensions), Some((50, 40)));
        assert_eq!(guard.state().comparison_image, Some(original.clone()));
        assert!(guard.state().ui.show_comparator);
        assert!(!guard.state().ui.is_cropping);

        guard.undo();
        assert_eq!(guard.state().generated_images, Some(vec![original]));
        guard.redo();
        assert_eq!(guard.state().generated_images, Some(cropped));
    }

    #[tokio::test]
    async fn filter_keeps_an_existing_comparison() {
        let before = solid(8, 8, [1, 1, 1, 255]);
        let session = session_with_result(solid(8, 8, [200, 0, 0, 255]));
        session
            .lock()
            .await
            .apply(|s| s.comparison_image = Some(before.clone()));

        apply_edit(&session, EditKind::Filter(ImageFilter::Grayscale))
            .await
            .expect("filter");
        let guard = session.lock().await;
        assert_eq!(guard.state().comparison_image, Some(before));
        let shown = guard.state().on_screen_image().expect("on screen");
        let px = pixels(shown).get_pixel(0, 0).0;
        assert_eq!(px[0], px[1]);
    }

    #[tokio::test]
    async fn rotation_swaps_dimensions_of_the_selected_result() {
        let session = session_with_result(solid(6, 2, [0, 0, 0, 255]));
        apply_edit(&session, EditKind::Rotate(Rotation::Clockwise))
            .await
            .expect("rotate");
        let guard = session.lock().await;
        assert_eq!(
            guard.state().on_screen_image().map(EncodedImage::dimensions),
            Some((2, 6))
        );
    }

    #[tokio::test]
    async fn text_needs_text_and_resets_the_tool() {
        let session = session_with_result(solid(64, 64, [0, 0, 0, 255]));
        assert_eq!(apply_edit(&session, EditKind::Text).await, Ok(None));

        session.lock().await.apply(|s| {
            s.text_overlay.text = "Hi".into();
            s.edit_function = EditFunction::TextOverlay;
        });
        let commit = apply_edit(&session, EditKind::Text).await.expect("text");
        assert!(commit.is_some());

        let guard = session.lock().await;
        assert!(guard.state().text_overlay.text.is_empty());
        assert_eq!(guard.state().edit_function, EditFunction::AddRemove);
    }

    #[tokio::test]
    async fn failed_edit_leaves_the_session_alone() {
        let broken = EncodedImage::new(vec![1, 2, 3], crate::domain::media::ImageKind::Png, 3, 3);
        let session = session_with_result(broken.clone());
        let err = apply_edit(&session, EditKind::Filter(ImageFilter::Invert)).await;
        assert!(matches!(err, Err(RasterError::Decode(_))));

        let guard = session.lock().await;
        assert_eq!(guard.history_len(), 2);
        assert_eq!(guard.state().generated_images, Some(vec![broken]));
        assert!(guard.state().comparison_image.is_none());
    }

    #[test]
    fn stale_results_are_dropped() {
        let first = solid(4, 4, [0, 0, 0, 255]);
        let mut controller = SessionController::new(SessionState::default());
        controller.apply(|s| s.generated_images = Some(vec![first.clone()]));
        controller.apply(|s| s.generated_images = Some(vec![solid(4, 4, [9, 9, 9, 255])]));

        let result = solid(4, 4, [255, 255, 255, 255]);
        assert_eq!(controller.commit_edit(&first, result, EditKind::Crop), None);
        assert_eq!(controller.history_len(), 3);
    }

    #[tokio::test]
    async fn inverted_mask_follows_the_base_size() {
        let session = session_with_result(solid(30, 20, [0, 0, 0, 255]));
        invert_mask(&session).await.expect("invert");

        let guard = session.lock().await;
        let mask = guard.state().mask.image.clone().expect("mask");
        assert_eq!(mask.dimensions(), (30, 20));
        assert!(pixels(&mask).pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }
}
