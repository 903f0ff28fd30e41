//! Mechanism topology and state for the limb rigid-body dynamics stack.
//!
//! `Mechanism` is the static description: rigid bodies, a spanning tree of
//! joints, optional loop closures, frames, gravity. `MechanismState` holds
//! generalized coordinates and the lazily evaluated kinematic caches, one
//! instance per scalar type via the registries in [`cache`].

pub mod body;
pub mod cache;
pub mod error;
pub mod joint;
pub mod mechanism;
pub mod result;
pub mod seg;
pub mod state;

pub use body::{BodyId, MassProperties, RigidBody};
pub use cache::{DynamicsResultCache, SegmentedVecCache, StateCache};
pub use error::ModelError;
pub use joint::{Bounds, Joint, JointId, JointKind};
pub use mechanism::{LoopJoint, Mechanism};
pub use result::DynamicsResult;
pub use seg::SegmentedVec;
pub use state::{CacheKind, MechanismState, StateContactPoint};
