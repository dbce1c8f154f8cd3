// SPDX-License-Identifier: MPL-2.0
//! Generation lifecycle: status board and orchestrator.

pub mod orchestrator;
pub mod status;

pub use orchestrator::{
    GenerationError, GenerationOutcome, GenerationSettings, Orchestrator, DEFAULT_BRAND_TEXT,
    DEFAULT_POLL_INTERVAL,
};
pub use status::{Progress, StatusBoard, StatusMessage, StudioStatus};
