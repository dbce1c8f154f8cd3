// SPDX-License-Identifier: MPL-2.0
//! Local raster operations on encoded images.
//!
//! Every operation takes encoded sources plus parameters and returns a new
//! encoded PNG. Surfaces are created, drawn and dropped inside a single
//! call and never shared between operations.
//!
//! The functions here are synchronous and CPU bound. Async callers go
//! through [`run_blocking`] so decoding never stalls the runtime.

pub mod codec;
pub mod compose;
pub mod image_transform;
mod text;

pub use codec::probe;
pub use compose::{burn_text, invert_mask, pad_to_aspect, watermark, WatermarkSource};
pub use image_transform::{apply_filter, crop, rotate};

use std::fmt;

/// Errors raised by raster operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    /// An off-screen surface of this size could not be allocated.
    SurfaceUnavailable { width: u32, height: u32 },

    /// A source image could not be decoded.
    Decode(String),

    /// The result could not be encoded.
    Encode(String),

    /// An operation parameter was rejected.
    InvalidParameter(String),

    /// The blocking worker running the operation failed.
    Task(String),
}

impl RasterError {
    /// Returns the localization key for this error.
    #[must_use]
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::SurfaceUnavailable { .. } => "error-raster-surface",
            Self::Decode(_) => "error-raster-decode",
            Self::Encode(_) => "error-raster-encode",
            Self::InvalidParameter(_) => "error-raster-parameter",
            Self::Task(_) => "error-raster-task",
        }
    }
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SurfaceUnavailable { width, height } => {
                write!(f, "Cannot allocate a {width}x{height} drawing surface")
            }
            Self::Decode(msg) => write!(f, "Image decode error: {msg}"),
            Self::Encode(msg) => write!(f, "Image encode error: {msg}"),
            Self::InvalidParameter(msg) => write!(f, "Invalid raster parameter: {msg}"),
            Self::Task(msg) => write!(f, "Raster worker failed: {msg}"),
        }
    }
}

impl std::error::Error for RasterError {}

/// Runs a raster job on the blocking thread pool.
///
/// # Errors
///
/// Returns the job's own error, or [`RasterError::Task`] if the worker
/// panicked or was cancelled.
pub async fn run_blocking<T, F>(job: F) -> Result<T, RasterError>
where
    F: FnOnce() -> Result<T, RasterError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|err| RasterError::Task(err.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_blocking_forwards_job_result() {
        assert_eq!(run_blocking(|| Ok(41 + 1)).await, Ok(42));
        let err = run_blocking::<(), _>(|| Err(RasterError::Decode("x".into()))).await;
        assert_eq!(err, Err(RasterError::Decode("x".into())));
    }

    #[test]
    fn surface_error_names_dimensions() {
        let err = RasterError::SurfaceUnavailable {
            width: 3,
            height: 4,
        };
        assert!(err.to_string().contains("3x4"));
        assert_eq!(err.message_key(), "error-raster-surface");
    }
}
