// SPDX-License-Identifier: MPL-2.0
//! Debounced background persistence of the live session.

use crate::application::port::SessionStore;
use crate::domain::session::SessionState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Spawns the autosave loop.
///
/// The task writes the latest state once `debounce` has passed without a
/// newer change. When the controller (the sender) goes away, any pending
/// change is written before the task ends. Write failures are logged and
/// the loop keeps going.
pub fn spawn_autosave(
    store: Arc<dyn SessionStore>,
    mut changes: watch::Receiver<SessionState>,
    debounce: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let closed = loop {
                match tokio::time::timeout(debounce, changes.changed()).await {
                    Ok(Ok(())) => continue,
                    Ok(Err(_)) => break true,
                    Err(_) => break false,
                }
            };

            let snapshot = changes.borrow_and_update().clone();
            save(store.as_ref(), &snapshot).await;

            if closed {
                break;
            }
        }
        tracing::debug!("autosave stopped");
    })
}

async fn save(store: &dyn SessionStore, state: &SessionState) {
    match store.save(state).await {
        Ok(()) => tracing::debug!("session autosaved"),
        Err(err) => tracing::warn!(%err, "failed to autosave session"),
    }
}
