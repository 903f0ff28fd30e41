//! Pre-allocated dynamics outputs and workspace.

use crate::error::ModelError;
use crate::mechanism::Mechanism;
use crate::seg::SegmentedVec;
use limb_math::{
    DMat, DVec, Scalar, SpatialAcceleration, Wrench, WrenchSubspace,
};

/// Everything `dynamics!` writes or scratches in, allocated once per
/// (mechanism, scalar type). Reusing a result across calls keeps the hot
/// path allocation-free.
pub struct DynamicsResult<T: Scalar> {
    mechanism_id: u64,
    generation: u64,

    /// Joint accelerations.
    pub vdot: SegmentedVec<T>,
    /// Total wrench transmitted across each body's inboard joint, world
    /// frame, indexed by body.
    pub joint_wrenches: Vec<Wrench<T>>,
    /// Accumulated contact wrench per body, world frame.
    pub contact_wrenches: Vec<Wrench<T>>,
    /// Rate of the contact (additional) state, same layout as the state's
    /// `s` buffer.
    pub contact_state_rate: Vec<T>,
    /// Loop-closure constraint multipliers.
    pub multipliers: DVec<T>,

    // Workspace.
    pub mass_matrix: DMat<T>,
    pub dynamics_bias: DVec<T>,
    pub rhs: DVec<T>,
    pub factor: DMat<T>,
    pub factor_diag: DVec<T>,
    pub accelerations: Vec<SpatialAcceleration<T>>,
    pub net_wrenches: Vec<Wrench<T>>,
    pub external_scratch: Vec<Wrench<T>>,
    pub constraint_jacobian: DMat<T>,
    pub constraint_rhs: DVec<T>,
    /// Per-loop-joint constraint wrench bases in `frame_after` (templates).
    pub loop_subspaces: Vec<WrenchSubspace<T>>,
    /// The same bases re-expressed in world, refreshed per call.
    pub loop_subspaces_world: Vec<WrenchSubspace<T>>,
    pub kkt: DMat<T>,
    pub kkt_diag: DVec<T>,
    pub minv_jt: DMat<T>,
    pub lambda_rhs: DVec<T>,
    pub tau_scratch: DVec<T>,
    /// Velocity-shaped segmented scratch (bias torques, wrench projection).
    pub seg_scratch: SegmentedVec<T>,
    /// Always-zero acceleration input for bias evaluations.
    pub zero_vdot: SegmentedVec<T>,
}

impl<T: Scalar> DynamicsResult<T> {
    pub fn new(mechanism: &Mechanism) -> Self {
        let nb = mechanism.num_bodies();
        let nv = mechanism.num_velocities();
        let world = mechanism.world_frame();
        let num_constraints: usize = mechanism
            .non_tree_joints()
            .iter()
            .map(|lj| 6 - lj.joint.nv())
            .sum();

        let loop_subspaces: Vec<WrenchSubspace<T>> = mechanism
            .non_tree_joints()
            .iter()
            .map(|lj| {
                lj.joint
                    .kind
                    .cast::<T>()
                    .constraint_wrench_subspace(lj.joint.frame_after)
            })
            .collect();
        let loop_subspaces_world = loop_subspaces.clone();

        Self {
            mechanism_id: mechanism.id(),
            generation: mechanism.generation(),
            vdot: SegmentedVec::from_widths(mechanism.tree_joints().iter().map(|j| j.nv())),
            joint_wrenches: vec![Wrench::zero(world, world, world); nb],
            contact_wrenches: vec![Wrench::zero(world, world, world); nb],
            contact_state_rate: vec![
                T::ZERO;
                mechanism
                    .bodies()
                    .iter()
                    .flat_map(|b| b.contact_points.iter())
                    .map(|p| p.model.state_dim())
                    .sum()
            ],
            multipliers: DVec::zeros(num_constraints),
            mass_matrix: DMat::zeros(nv, nv),
            dynamics_bias: DVec::zeros(nv),
            rhs: DVec::zeros(nv),
            factor: DMat::zeros(nv, nv),
            factor_diag: DVec::zeros(nv),
            accelerations: vec![SpatialAcceleration::zero(world, world, world); nb],
            net_wrenches: vec![Wrench::zero(world, world, world); nb],
            external_scratch: vec![Wrench::zero(world, world, world); nb],
            constraint_jacobian: DMat::zeros(num_constraints, nv),
            constraint_rhs: DVec::zeros(num_constraints),
            loop_subspaces,
            loop_subspaces_world,
            kkt: DMat::zeros(num_constraints, num_constraints),
            kkt_diag: DVec::zeros(num_constraints),
            minv_jt: DMat::zeros(nv, num_constraints),
            lambda_rhs: DVec::zeros(num_constraints),
            tau_scratch: DVec::zeros(nv),
            seg_scratch: SegmentedVec::from_widths(
                mechanism.tree_joints().iter().map(|j| j.nv()),
            ),
            zero_vdot: SegmentedVec::from_widths(mechanism.tree_joints().iter().map(|j| j.nv())),
        }
    }

    /// Fail with `StaleState` when this result was sized for a different
    /// mechanism or topology generation.
    pub fn check_compatible(&self, mechanism: &Mechanism) -> Result<(), ModelError> {
        if self.mechanism_id != mechanism.id() || self.generation != mechanism.generation() {
            Err(ModelError::StaleState)
        } else {
            Ok(())
        }
    }

    #[inline]
    pub fn num_constraints(&self) -> usize {
        self.multipliers.len()
    }
}
