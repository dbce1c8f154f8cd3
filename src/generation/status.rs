// SPDX-License-Identifier: MPL-2.0
//! Observable generation status: in-flight flag, progress and the single
//! user-visible message slot.

use tokio::sync::watch;

/// Batch progress. `current` counts finished units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

/// The one message the studio shows at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    /// Something failed. `key` is the localization key.
    Error { key: &'static str, message: String },
    /// The user stopped a generation. Informational only.
    Cancelled,
}

impl StatusMessage {
    #[must_use]
    pub fn error(key: &'static str, message: impl Into<String>) -> Self {
        Self::Error {
            key,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Snapshot of everything the status board tracks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StudioStatus {
    pub in_flight: bool,
    pub progress: Progress,
    pub message: Option<StatusMessage>,
    /// The credential prompt should be shown.
    pub credential_required: bool,
}

/// Shared, watchable generation status.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    tx: watch::Sender<StudioStatus>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(StudioStatus::default());
        Self { tx }
    }

    #[must_use]
    pub fn snapshot(&self) -> StudioStatus {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StudioStatus> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.tx.borrow().in_flight
    }

    /// Marks a generation as started, unless one already is.
    ///
    /// Clears the message slot and sets progress to `0/total`. Returns
    /// `false` when another generation holds the flag.
    pub fn try_begin(&self, total: usize) -> bool {
        self.tx.send_if_modified(|status| {
            if status.in_flight {
                return false;
            }
            status.in_flight = true;
            status.progress = Progress { current: 0, total };
            status.message = None;
            true
        })
    }

    pub fn set_progress(&self, current: usize, total: usize) {
        self.tx
            .send_modify(|status| status.progress = Progress { current, total });
    }

    /// Clears the in-flight flag and progress. Runs on every exit path.
    pub fn finish(&self) {
        self.tx.send_modify(|status| {
            status.in_flight = false;
            status.progress = Progress::default();
        });
    }

    pub fn report(&self, message: StatusMessage) {
        self.tx.send_modify(|status| status.message = Some(message));
    }

    pub fn report_error(&self, key: &'static str, message: impl Into<String>) {
        self.report(StatusMessage::error(key, message));
    }

    /// Shows the cancellation notice and drops progress to zero at once.
    pub fn notify_cancelled(&self) {
        self.tx.send_modify(|status| {
            status.message = Some(StatusMessage::Cancelled);
            status.progress = Progress::default();
        });
    }

    pub fn dismiss(&self) {
        self.tx.send_modify(|status| status.message = None);
    }

    pub fn require_credential(&self, required: bool) {
        self.tx
            .send_modify(|status| status.credential_required = required);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_generation_can_begin() {
        let board = StatusBoard::new();
        assert!(board.try_begin(3));
        assert!(!board.try_begin(1));
        assert_eq!(board.snapshot().progress, Progress { current: 0, total: 3 });

        board.finish();
        assert!(!board.is_in_flight());
        assert_eq!(board.snapshot().progress, Progress::default());
        assert!(board.try_begin(1));
    }

    #[test]
    fn beginning_clears_the_previous_message() {
        let board = StatusBoard::new();
        board.report_error("error-backend-quota", "Quota exceeded");
        assert!(board.snapshot().message.is_some_and(|m| m.is_error()));
        board.try_begin(1);
        assert_eq!(board.snapshot().message, None);
    }

    #[test]
    fn cancellation_notice_is_not_an_error() {
        let board = StatusBoard::new();
        board.try_begin(4);
        board.set_progress(2, 4);
        board.notify_cancelled();

        let status = board.snapshot();
        assert_eq!(status.message, Some(StatusMessage::Cancelled));
        assert!(!StatusMessage::Cancelled.is_error());
        assert_eq!(status.progress, Progress::default());
        assert!(status.in_flight);
    }

    #[tokio::test]
    async fn watchers_see_progress() {
        let board = StatusBoard::new();
        let mut rx = board.subscribe();
        board.try_begin(2);
        board.set_progress(1, 2);
        rx.changed().await.expect("board alive");
        assert_eq!(rx.borrow().progress.current, 1);
    }
}
