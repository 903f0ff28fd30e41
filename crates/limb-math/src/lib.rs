//! Spatial algebra and math primitives for the limb rigid-body dynamics stack.
//!
//! Everything is generic over a [`Scalar`] type so the same kinematics and
//! dynamics code evaluates under `f64`, `f32`, and forward-mode dual numbers
//! ([`Dual`]) for automatic differentiation.
//!
//! Spatial quantities carry coordinate-frame tags ([`FrameId`]) that are
//! checked on every composition; see the [`frame_check!`] macro for the cost
//! model.

pub mod dual;
pub mod error;
pub mod force;
pub mod frame;
pub mod inertia;
pub mod linalg;
pub mod linear;
pub mod motion;
pub mod quat;
pub mod scalar;
pub mod transform;

pub use dual::Dual;
pub use error::SpatialError;
pub use force::{Momentum, MomentumMatrix, Wrench, WrenchSubspace};
pub use frame::FrameId;
pub use inertia::SpatialInertia;
pub use linalg::{
    cholesky_in_place, cholesky_solve_in_place, ldlt_in_place, ldlt_solve_in_place, DMat, DVec,
};
pub use linear::{Mat3, Vec3};
pub use motion::{GeometricJacobian, SpatialAcceleration, Twist};
pub use quat::Quat;
pub use scalar::Scalar;
pub use transform::{Placement, Transform};

/// Cross-product matrix: `skew(v) * w == v × w`.
#[inline]
pub fn skew<T: Scalar>(v: &Vec3<T>) -> Mat3<T> {
    Mat3::new(
        T::ZERO,
        -v.z,
        v.y,
        v.z,
        T::ZERO,
        -v.x,
        -v.y,
        v.x,
        T::ZERO,
    )
}

/// Standard gravity (m/s^2).
pub const GRAVITY: f64 = 9.81;
