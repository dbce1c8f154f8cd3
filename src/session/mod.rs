// SPDX-License-Identifier: MPL-2.0
//! Session ownership: the history stack, the controller that funnels every
//! mutation, studio actions built on it and the autosave task.

pub mod actions;
pub mod autosave;
pub mod controller;
pub mod edits;
pub mod history;

pub use autosave::spawn_autosave;
pub use controller::{Commit, SessionController};
pub use edits::{apply_edit, invert_mask, EditKind};
pub use history::History;

use std::sync::Arc;
use tokio::sync::Mutex;

/// Controller shared between the facade, the orchestrator and edit tasks.
///
/// Locks are held only across synchronous mutations, never across a
/// backend call or a raster job.
pub type SharedSession = Arc<Mutex<SessionController>>;

/// Wraps a controller for sharing.
#[must_use]
pub fn shared(controller: SessionController) -> SharedSession {
    Arc::new(Mutex::new(controller))
}
