// SPDX-License-Identifier: MPL-2.0
//! Owner of the live session state and its undo history.
//!
//! Every change goes through [`SessionController::apply`] (or
//! [`SessionController::replace`]). The controller compares the candidate
//! with the entry under the history cursor on tracked fields only and
//! records it when they differ. Presentational changes update the live
//! state without touching history.
//!
//! Undo, redo and jumps raise a restoring flag before committing the
//! history entry, so the commit path leaves the stack alone for them.

use super::history::History;
use crate::domain::session::SessionState;
use tokio::sync::watch;

/// What a commit did to history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// A new history entry was appended.
    Recorded,
    /// Only the live state changed.
    LiveOnly,
    /// A history entry was restored.
    Restored,
}

/// Single source of truth for the creative session.
#[derive(Debug)]
pub struct SessionController {
    live: SessionState,
    history: History<SessionState>,
    restoring: bool,
    changes: watch::Sender<SessionState>,
}

impl SessionController {
    /// Starts a session from `initial`, which becomes the only history
    /// entry.
    #[must_use]
    pub fn new(initial: SessionState) -> Self {
        let mut initial = initial;
        settle(&mut initial);
        let (changes, _) = watch::channel(initial.clone());
        Self {
            history: History::new(initial.clone()),
            live: initial,
            restoring: false,
            changes,
        }
    }

    /// Starts from a saved snapshot, or from defaults when there is none.
    ///
    /// Snapshots deserialize over [`SessionState::default`], so fields
    /// added after the snapshot was written keep their defaults.
    #[must_use]
    pub fn restore(saved: Option<SessionState>) -> Self {
        Self::new(saved.unwrap_or_default())
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.live
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn history_index(&self) -> usize {
        self.history.index()
    }

    #[must_use]
    pub fn history(&self) -> &[SessionState] {
        self.history.entries()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Receives every live state from now on. Used by autosave.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.changes.subscribe()
    }

    // =========================================================================
    // Mutation entrypoint
    // =========================================================================

    /// Applies `update` to a copy of the latest live state and commits it.
    pub fn apply(&mut self, update: impl FnOnce(&mut SessionState)) -> Commit {
        let mut candidate = self.live.clone();
        update(&mut candidate);
        self.commit(candidate)
    }

    /// Commits a full replacement state.
    pub fn replace(&mut self, candidate: SessionState) -> Commit {
        self.commit(candidate)
    }

    fn commit(&mut self, mut candidate: SessionState) -> Commit {
        settle(&mut candidate);

        if std::mem::take(&mut self.restoring) {
            self.set_live(candidate);
            return Commit::Restored;
        }

        if let Some(previous) = &self.live.generated_video {
            if candidate.generated_video.as_ref() != Some(previous) {
                previous.release();
            }
        }

        if candidate.tracked_eq(self.history.current()) {
            self.set_live(candidate);
            return Commit::LiveOnly;
        }

        self.history.record(candidate.clone());
        tracing::debug!(
            index = self.history.index(),
            len = self.history.len(),
            "recorded history entry"
        );
        self.set_live(candidate);
        Commit::Recorded
    }

    fn set_live(&mut self, state: SessionState) {
        self.live = state;
        self.changes.send_replace(self.live.clone());
    }

    // =========================================================================
    // History navigation
    // =========================================================================

    /// Steps back one entry. No-op at the start.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.undo().cloned() else {
            return false;
        };
        self.restore_entry(entry);
        true
    }

    /// Steps forward one entry. No-op at the end.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.history.redo().cloned() else {
            return false;
        };
        self.restore_entry(entry);
        true
    }

    /// Moves to any valid history index.
    pub fn jump_to(&mut self, index: usize) -> bool {
        let Some(entry) = self.history.jump(index).cloned() else {
            return false;
        };
        self.restore_entry(entry);
        true
    }

    fn restore_entry(&mut self, mut entry: SessionState) {
        // Panels and selection follow the user, not the snapshot.
        entry.ui = self.live.ui.clone();
        self.restoring = true;
        self.commit(entry);
        tracing::debug!(index = self.history.index(), "restored history entry");
    }

    // =========================================================================
    // Reset
    // =========================================================================

    /// Starts over from a fresh default state with a single-entry history.
    ///
    /// Clearing the saved snapshot is up to the caller.
    pub fn reset(&mut self) {
        self.reset_to(SessionState::default());
    }

    /// Replaces live state and history with `state` alone.
    pub fn reset_to(&mut self, mut state: SessionState) {
        if let Some(video) = &self.live.generated_video {
            if state.generated_video.as_ref() != Some(video) {
                video.release();
            }
        }
        settle(&mut state);
        self.history.reset(state.clone());
        self.restoring = false;
        self.set_live(state);
        tracing::debug!("session reset");
    }
}

/// Restores the cross-field invariants every committed state satisfies.
fn settle(state: &mut SessionState) {
    state.normalize_selection();

    if state.image1.is_none() {
        state.is_masking_active = false;
    }
    if state.comparison_image.is_none() {
        state.ui.show_comparator = false;
    }
    if state.ui.show_comparator {
        state.ui.is_cropping = false;
        state.is_masking_active = false;
    }
    if state.on_screen_image().is_none() {
        state.ui.is_cropping = false;
    }
    if !state.is_masking_active {
        state.mask.mode = crate::domain::session::MaskMode::Off;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::media::{EncodedImage, ImageKind, VideoHandle};
    use crate::domain::session::{MaskMode, StudioMode};

    fn image(tag: u8) -> EncodedImage {
        EncodedImage::new(vec![tag; 8], ImageKind::Png, 2, 2)
    }

    #[test]
    fn tracked_change_is_recorded() {
        let mut session = SessionController::new(SessionState::default());
        assert_eq!(session.apply(|s| s.prompt = "fox".into()), Commit::Recorded);
        assert_eq!(session.history_len(), 2);
        assert_eq!(session.history_index(), 1);
        assert_eq!(session.state().prompt, "fox");
    }

    #[test]
    fn ui_only_change_keeps_history_but_updates_live_state() {
        let mut session = SessionController::new(SessionState::default());
        for _ in 0..5 {
            let commit = session.apply(|s| {
                let open = s.ui.open_sections.entry("edit_quick".into()).or_default();
                *open = !*open;
            });
            assert_eq!(commit, Commit::LiveOnly);
        }
        assert_eq!(session.history_len(), 1);
        assert_eq!(session.history_index(), 0);
        assert_eq!(session.state().ui.open_sections.get("edit_quick"), Some(&true));
    }

    #[test]
    fn identical_tracked_state_is_not_recorded_twice() {
        let mut session = SessionController::new(SessionState::default());
        session.apply(|s| s.prompt = "a".into());
        assert_eq!(session.apply(|s| s.prompt = "a".into()), Commit::LiveOnly);
        assert_eq!(session.history_len(), 2);
    }

    #[test]
    fn undo_and_redo_restore_entries_without_touching_the_stack() {
        let mut session = SessionController::new(SessionState::default());
        session.apply(|s| s.prompt = "one".into());
        session.apply(|s| s.prompt = "two".into());

        assert!(session.undo());
        assert_eq!(session.state().prompt, "one");
        assert_eq!(session.history_len(), 3);

        assert!(session.redo());
        assert_eq!(session.state().prompt, "two");
        assert!(!session.redo());

        assert!(session.jump_to(0));
        assert_eq!(session.state().prompt, "");
        assert!(!session.undo());
        assert!(!session.jump_to(3));
    }

    #[test]
    fn commit_after_undo_discards_future() {
        let mut session = SessionController::new(SessionState::default());
        session.apply(|s| s.prompt = "one".into());
        session.apply(|s| s.prompt = "two".into());
        session.undo();
        session.apply(|s| s.prompt = "three".into());

        assert!(!session.redo());
        let prompts: Vec<_> = session.history().iter().map(|s| s.prompt.clone()).collect();
        assert_eq!(prompts, ["", "one", "three"]);
    }

    #[test]
    fn restoring_keeps_live_ui() {
        let mut session = SessionController::new(SessionState::default());
        session.apply(|s| s.prompt = "x".into());
        session.apply(|s| s.ui.history_panel_open = true);
        session.undo();
        assert!(session.state().ui.history_panel_open);
    }

    #[test]
    fn reset_leaves_a_single_default_entry() {
        let mut session = SessionController::new(SessionState::default());
        session.apply(|s| s.mode = StudioMode::Edit);
        session.reset();
        assert_eq!(session.history_len(), 1);
        assert_eq!(session.history_index(), 0);
        assert_eq!(session.state().mode, StudioMode::Create);
    }

    #[test]
    fn superseded_video_is_released_once() {
        let mut session = SessionController::new(SessionState::default());
        let video = VideoHandle::new("/nonexistent/clip.mp4", "video/mp4");
        session.apply(|s| s.generated_video = Some(video.clone()));
        assert!(!video.is_released());

        session.apply(|s| s.generated_video = None);
        assert!(video.is_released());
        assert!(!video.release());
    }

    #[test]
    fn undo_to_a_superseded_video_restores_an_expired_handle() {
        let mut session = SessionController::new(SessionState::default());
        let first = VideoHandle::new("/nonexistent/first.mp4", "video/mp4");
        let second = VideoHandle::new("/nonexistent/second.mp4", "video/mp4");
        session.apply(|s| s.generated_video = Some(first.clone()));
        session.apply(|s| s.generated_video = Some(second.clone()));
        assert!(first.is_released());

        assert!(session.undo());
        let restored = session.state().generated_video.clone().expect("handle restored");
        assert_eq!(restored.id(), first.id());
        assert!(restored.is_released());
        assert_eq!(restored.path(), None);
        assert!(!second.is_released());
    }

    #[test]
    fn reset_releases_the_live_video() {
        let mut session = SessionController::new(SessionState::default());
        let video = VideoHandle::new("/nonexistent/clip.mp4", "video/mp4");
        session.apply(|s| s.generated_video = Some(video.clone()));
        session.reset();
        assert!(video.is_released());
    }

    #[test]
    fn committed_states_keep_mask_and_comparator_consistent() {
        let mut session = SessionController::new(SessionState::default());
        session.apply(|s| {
            s.image1 = Some(image(1));
            s.is_masking_active = true;
            s.mask.mode = MaskMode::Draw;
        });
        assert_eq!(session.state().mask.mode, MaskMode::Draw);

        session.apply(|s| {
            s.comparison_image = Some(image(2));
            s.ui.show_comparator = true;
        });
        assert!(!session.state().is_masking_active);
        assert_eq!(session.state().mask.mode, MaskMode::Off);
    }

    #[test]
    fn selection_is_clamped_into_the_batch() {
        let mut session = SessionController::new(SessionState::default());
        session.apply(|s| {
            s.generated_images = Some(vec![image(1), image(2)]);
            s.ui.selected_index = 1;
        });
        session.apply(|s| s.generated_images = Some(vec![image(3)]));
        assert_eq!(session.state().ui.selected_index, 0);
    }

    #[tokio::test]
    async fn subscribers_see_live_changes() {
        let mut session = SessionController::new(SessionState::default());
        let mut rx = session.subscribe();
        session.apply(|s| s.prompt = "watched".into());
        rx.changed().await.expect("sender alive");
        assert_eq!(rx.borrow_and_update().prompt, "watched");
    }
}
