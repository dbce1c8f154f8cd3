// SPDX-License-Identifier: MPL-2.0
//! Default values and bounds for configuration settings.
//!
//! # Categories
//!
//! - **Generation**: Batch size and video polling
//! - **Session**: Autosave debounce
//! - **Gallery**: Deletion undo window

// ==========================================================================
// Generation Defaults
// ==========================================================================

/// Default number of images requested per generation.
pub const DEFAULT_BATCH_SIZE: u8 = 1;

/// Default delay between video completion polls (in seconds).
pub const DEFAULT_VIDEO_POLL_INTERVAL_SECS: u64 = 10;

/// Minimum video poll interval (in seconds).
pub const MIN_VIDEO_POLL_INTERVAL_SECS: u64 = 1;

/// Maximum video poll interval (in seconds).
pub const MAX_VIDEO_POLL_INTERVAL_SECS: u64 = 120;

// ==========================================================================
// Session Defaults
// ==========================================================================

/// Default quiet period before the session snapshot is written (in ms).
pub const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 500;

/// Maximum autosave debounce (in ms).
pub const MAX_AUTOSAVE_DEBOUNCE_MS: u64 = 10_000;

// ==========================================================================
// Gallery Defaults
// ==========================================================================

/// Default time during which a gallery deletion can be undone (in ms).
pub const DEFAULT_UNDO_WINDOW_MS: u64 = 7000;

/// Maximum gallery undo window (in ms).
pub const MAX_UNDO_WINDOW_MS: u64 = 60_000;
