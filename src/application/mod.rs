// SPDX-License-Identifier: MPL-2.0
//! Application layer - Use cases and orchestration seams.
//!
//! - [`port`]: Trait definitions (interfaces) for dependency inversion
//! - [`cancellation`]: Cooperative cancellation token for async runs
//! - [`prompt`]: Instruction text sent to the backend per workflow
//!
//! # Dependency Rule
//!
//! - Application layer depends on domain layer (uses domain types)
//! - Infrastructure layer implements application layer ports
//! - Session and generation services use application layer ports

pub mod cancellation;
pub mod port;
pub mod prompt;
