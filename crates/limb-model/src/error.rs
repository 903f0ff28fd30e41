//! Error types for mechanism and state operations.

use limb_math::SpatialError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("topology error: {0}")]
    Topology(String),

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("stale state: the mechanism was modified after this state was built")]
    StaleState,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Spatial(#[from] SpatialError),
}

pub type Result<T> = std::result::Result<T, ModelError>;
