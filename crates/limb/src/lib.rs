//! limb — articulated rigid-body dynamics.
//!
//! This is the umbrella crate re-exporting the stack:
//! - [`limb_math`]: scalar-generic spatial algebra, dual numbers
//! - [`limb_model`]: mechanism topology, `MechanismState`, cache registries
//! - [`limb_dynamics`]: RNEA, CRBA, Jacobians, forward dynamics, energy
//! - [`limb_contact`]: soft contact force models
//!
//! A typical session: build a [`Mechanism`] with [`Mechanism::attach`],
//! grab a [`MechanismState`] (directly or through a [`StateCache`] keyed by
//! scalar type), set `q` and `v`, and query kinematics or run
//! [`dynamics`] into a [`DynamicsResult`].

pub use limb_contact::{
    self, ContactModel, ContactPoint, HalfSpace, HuntCrossley, ViscoelasticCoulomb,
};
pub use limb_dynamics::{
    self, dynamics, dynamics_bias, geometric_jacobian, geometric_jacobian_in_frame,
    gravitational_potential_energy, inverse_dynamics, inverse_dynamics_into, kinetic_energy,
    mass_matrix, mass_matrix_into, momentum, momentum_in_frame, momentum_matrix, point_jacobian,
    DynamicsError, PointJacobian,
};
pub use limb_math::{
    self, Dual, DMat, DVec, FrameId, GeometricJacobian, Mat3, Momentum, MomentumMatrix, Placement,
    Quat, Scalar, SpatialAcceleration, SpatialError, SpatialInertia, Transform, Twist, Vec3,
    Wrench, GRAVITY,
};
pub use limb_model::{
    self, BodyId, Bounds, CacheKind, DynamicsResult, DynamicsResultCache, Joint, JointId,
    JointKind, MassProperties, Mechanism, MechanismState, ModelError, RigidBody, SegmentedVec,
    SegmentedVecCache, StateCache,
};
