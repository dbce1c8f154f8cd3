// SPDX-License-Identifier: MPL-2.0
//! Loading and saving user settings in `settings.toml`.
//!
//! # Configuration Sections
//!
//! - `[generation]` - Batch size, video polling, backend endpoint and models
//! - `[session]` - Autosave debounce
//! - `[watermark]` - Brand text stamped on generated images
//! - `[gallery]` - Deletion undo window
//!
//! Every field is optional. Missing fields take their default, out of
//! range values are clamped by the accessors, and a file that cannot be
//! parsed at all yields the defaults plus a warning key.
//!
//! # Examples
//!
//! ```no_run
//! use image_studio::app::config;
//!
//! let (mut config, _warning) = config::load_with_override(None);
//! config.generation.default_batch_size = Some(4);
//! config::save_with_override(&config, None).expect("Failed to save config");
//! ```

pub mod defaults;

pub use defaults::*;

use crate::app::paths::{self, DirKind};
use crate::domain::session::BatchSize;
use crate::error::{Error, Result};
use crate::generation::{GenerationSettings, DEFAULT_BRAND_TEXT};
use crate::infrastructure::GeminiModels;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "settings.toml";

/// Warning key returned when `settings.toml` cannot be read.
pub const LOAD_WARNING_KEY: &str = "notification-config-load-error";

// =============================================================================
// Section Structs
// =============================================================================

/// Generation and backend settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Batch size of a fresh session (1 to 4).
    #[serde(default = "default_batch_size", skip_serializing_if = "Option::is_none")]
    pub default_batch_size: Option<u8>,

    /// Delay between video completion polls, in seconds.
    #[serde(
        default = "default_video_poll_interval_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub video_poll_interval_secs: Option<u64>,

    /// Base URL of the generation API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_model: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_batch_size: default_batch_size(),
            video_poll_interval_secs: default_video_poll_interval_secs(),
            endpoint: None,
            image_model: None,
            video_model: None,
            text_model: None,
        }
    }
}

impl GenerationConfig {
    #[must_use]
    pub fn batch_size(&self) -> BatchSize {
        BatchSize::new(self.default_batch_size.unwrap_or(DEFAULT_BATCH_SIZE))
    }

    #[must_use]
    pub fn video_poll_interval(&self) -> Duration {
        let secs = self
            .video_poll_interval_secs
            .unwrap_or(DEFAULT_VIDEO_POLL_INTERVAL_SECS)
            .clamp(MIN_VIDEO_POLL_INTERVAL_SECS, MAX_VIDEO_POLL_INTERVAL_SECS);
        Duration::from_secs(secs)
    }

    /// Endpoint and model names, falling back to the built-in defaults
    /// for anything left blank.
    #[must_use]
    pub fn models(&self) -> GeminiModels {
        let pick = |value: &Option<String>, fallback: String| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map_or(fallback, str::to_string)
        };
        let defaults = GeminiModels::default();
        GeminiModels {
            endpoint: pick(&self.endpoint, defaults.endpoint),
            image: pick(&self.image_model, defaults.image),
            video: pick(&self.video_model, defaults.video),
            text: pick(&self.text_model, defaults.text),
        }
    }
}

/// Session persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    /// Quiet period before the session snapshot is written, in ms.
    #[serde(
        default = "default_autosave_debounce_ms",
        skip_serializing_if = "Option::is_none"
    )]
    pub autosave_debounce_ms: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_debounce_ms: default_autosave_debounce_ms(),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn autosave_debounce(&self) -> Duration {
        let ms = self
            .autosave_debounce_ms
            .unwrap_or(DEFAULT_AUTOSAVE_DEBOUNCE_MS)
            .min(MAX_AUTOSAVE_DEBOUNCE_MS);
        Duration::from_millis(ms)
    }
}

/// Watermark settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatermarkConfig {
    #[serde(default = "default_brand_text", skip_serializing_if = "Option::is_none")]
    pub brand_text: Option<String>,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            brand_text: default_brand_text(),
        }
    }
}

/// Gallery settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GalleryConfig {
    /// Time during which deletions can be undone, in ms.
    #[serde(default = "default_undo_window_ms", skip_serializing_if = "Option::is_none")]
    pub undo_window_ms: Option<u64>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            undo_window_ms: default_undo_window_ms(),
        }
    }
}

impl GalleryConfig {
    #[must_use]
    pub fn undo_window(&self) -> Duration {
        let ms = self
            .undo_window_ms
            .unwrap_or(DEFAULT_UNDO_WINDOW_MS)
            .min(MAX_UNDO_WINDOW_MS);
        Duration::from_millis(ms)
    }
}

// =============================================================================
// Main Config Struct (Sectioned)
// =============================================================================

/// Application configuration with logical sections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub watermark: WatermarkConfig,

    #[serde(default)]
    pub gallery: GalleryConfig,
}

impl Config {
    /// Settings handed to the generation orchestrator.
    #[must_use]
    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            video_poll_interval: self.generation.video_poll_interval(),
            brand_text: self
                .watermark
                .brand_text
                .clone()
                .unwrap_or_else(|| DEFAULT_BRAND_TEXT.to_string()),
        }
    }
}

// =============================================================================
// Default Value Functions
// =============================================================================

fn default_batch_size() -> Option<u8> {
    Some(DEFAULT_BATCH_SIZE)
}

fn default_video_poll_interval_secs() -> Option<u64> {
    Some(DEFAULT_VIDEO_POLL_INTERVAL_SECS)
}

fn default_autosave_debounce_ms() -> Option<u64> {
    Some(DEFAULT_AUTOSAVE_DEBOUNCE_MS)
}

fn default_brand_text() -> Option<String> {
    Some(DEFAULT_BRAND_TEXT.to_string())
}

fn default_undo_window_ms() -> Option<u64> {
    Some(DEFAULT_UNDO_WINDOW_MS)
}

// =============================================================================
// Load and Save
// =============================================================================

fn config_path_with_override(base_dir: Option<PathBuf>) -> Option<PathBuf> {
    paths::resolve(DirKind::Config, base_dir).map(|dir| dir.join(CONFIG_FILE))
}

/// Loads the configuration from `base_dir` or the resolved config directory.
///
/// Returns the config and an optional warning key. A missing file is not
/// a warning; an unreadable one is.
#[must_use]
pub fn load_with_override(base_dir: Option<PathBuf>) -> (Config, Option<String>) {
    let Some(path) = config_path_with_override(base_dir) else {
        return (Config::default(), None);
    };
    if !path.exists() {
        return (Config::default(), None);
    }
    match load_from_path(&path) {
        Ok(config) => (config, None),
        Err(err) => {
            tracing::warn!(%err, path = %path.display(), "falling back to default settings");
            (Config::default(), Some(LOAD_WARNING_KEY.to_string()))
        }
    }
}

/// Loads configuration from a specific file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Saves the configuration to `base_dir` or the resolved config directory.
///
/// # Errors
///
/// Returns an error if no config directory can be determined or writing fails.
pub fn save_with_override(config: &Config, base_dir: Option<PathBuf>) -> Result<()> {
    let path = config_path_with_override(base_dir)
        .ok_or_else(|| Error::Config("cannot determine the config directory".into()))?;
    save_to_path(config, &path)
}

/// Saves configuration to a specific file, creating parent directories.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
