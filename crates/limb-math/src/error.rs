//! Error types for the spatial algebra layer.

use crate::frame::FrameId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("frame mismatch: expected frame {expected:?}, got {got:?}")]
    FrameMismatch { expected: FrameId, got: FrameId },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl SpatialError {
    /// Frame equality check for fallible entry points.
    #[inline]
    pub fn check_frames(expected: FrameId, got: FrameId) -> Result<(), SpatialError> {
        if expected == got {
            Ok(())
        } else {
            Err(SpatialError::FrameMismatch { expected, got })
        }
    }
}
