//! Error type for the dynamics algorithms.

use limb_math::SpatialError;
use limb_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DynamicsError {
    #[error("mass matrix factorization failed: {0}")]
    SingularMassMatrix(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Spatial(#[from] SpatialError),
}
