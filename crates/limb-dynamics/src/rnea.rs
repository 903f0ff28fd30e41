//! Recursive Newton-Euler: inverse dynamics and the dynamics bias.
//!
//! Given (q, v, vdot), compute the joint torques tau. Gravity enters as a
//! fictitious root acceleration; external wrenches subtract from each
//! body's momentum balance. Working in world frame means the backward pass
//! needs no per-edge transforms, just sums and subspace projections.

use crate::error::DynamicsError;
use limb_math::{
    Scalar, SpatialAcceleration, SpatialError, Vec3, Wrench,
};
use limb_model::{JointId, Mechanism, MechanismState, SegmentedVec};

/// Inverse dynamics, writing torques into `tau`.
///
/// `accelerations` and `net_wrenches` are per-body scratch (length
/// `num_bodies`); on return `net_wrenches[b]` holds the total wrench
/// transmitted to body `b`'s subtree through its inboard joint, in world
/// frame.
#[allow(clippy::too_many_arguments)]
pub fn inverse_dynamics_into<T: Scalar>(
    tau: &mut SegmentedVec<T>,
    mechanism: &Mechanism,
    state: &mut MechanismState<T>,
    vdot: &SegmentedVec<T>,
    external_wrenches: Option<&[Wrench<T>]>,
    accelerations: &mut [SpatialAcceleration<T>],
    net_wrenches: &mut [Wrench<T>],
) -> Result<(), DynamicsError> {
    state.check_compatible(mechanism)?;
    let nb = state.num_bodies();
    let nv = state.num_velocities();
    check_len(tau.len(), nv)?;
    check_len(vdot.len(), nv)?;
    check_len(accelerations.len(), nb)?;
    check_len(net_wrenches.len(), nb)?;
    if let Some(ext) = external_wrenches {
        check_len(ext.len(), nb)?;
        for w in ext {
            SpatialError::check_frames(state.world_frame(), w.frame)?;
        }
    }

    state.ensure_bias_accelerations();
    state.ensure_inertias_in_world();
    let world = state.world_frame();
    let twists = state.twists();
    let biases = state.bias_accelerations();
    let subspaces = state.motion_subspaces();
    let inertias = state.inertias_in_world();

    // ── Forward pass: accelerations, gravity injected at the root ──
    accelerations[0] = SpatialAcceleration::new(world, world, world, Vec3::zero(), -state.gravity());
    for j in 0..state.num_joints() {
        let succ = j + 1;
        let pred = state.predecessor_index(j);
        let joint_acc = subspaces[j].twist(vdot.segment(JointId(j)));
        accelerations[succ] = SpatialAcceleration::new(
            state.body_frame(succ),
            world,
            world,
            accelerations[pred].angular + (biases[succ].angular - biases[pred].angular)
                + joint_acc.angular,
            accelerations[pred].linear + (biases[succ].linear - biases[pred].linear)
                + joint_acc.linear,
        );
    }

    // ── Momentum balance per body ──
    for b in 0..nb {
        let momentum = inertias[b].apply(&twists[b]);
        let gyroscopic = twists[b].cross_force(&momentum);
        let (rate_ang, rate_lin) =
            inertias[b].apply_vec(&accelerations[b].angular, &accelerations[b].linear);
        let mut angular = rate_ang + gyroscopic.angular;
        let mut linear = rate_lin + gyroscopic.linear;
        if let Some(ext) = external_wrenches {
            angular -= ext[b].angular;
            linear -= ext[b].linear;
        }
        net_wrenches[b] = Wrench::new(state.body_frame(b), world, world, angular, linear);
    }

    // ── Backward pass: subtree wrenches, projected onto the subspaces ──
    for j in (0..state.num_joints()).rev() {
        let succ = j + 1;
        let pred = state.predecessor_index(j);
        subspaces[j].joint_torque(&net_wrenches[succ], tau.segment_mut(JointId(j)));
        net_wrenches[pred] = Wrench::new(
            state.body_frame(pred),
            world,
            world,
            net_wrenches[pred].angular + net_wrenches[succ].angular,
            net_wrenches[pred].linear + net_wrenches[succ].linear,
        );
    }
    Ok(())
}

/// Allocating flavor of [`inverse_dynamics_into`].
pub fn inverse_dynamics<T: Scalar>(
    mechanism: &Mechanism,
    state: &mut MechanismState<T>,
    vdot: &SegmentedVec<T>,
    external_wrenches: Option<&[Wrench<T>]>,
) -> Result<SegmentedVec<T>, DynamicsError> {
    let world = state.world_frame();
    let nb = state.num_bodies();
    let mut tau =
        SegmentedVec::from_widths(state.velocity().ranges().iter().map(|r| r.len()));
    let mut accelerations = vec![SpatialAcceleration::zero(world, world, world); nb];
    let mut net_wrenches = vec![Wrench::zero(world, world, world); nb];
    inverse_dynamics_into(
        &mut tau,
        mechanism,
        state,
        vdot,
        external_wrenches,
        &mut accelerations,
        &mut net_wrenches,
    )?;
    Ok(tau)
}

/// The dynamics bias `c(q, v)`: torques balancing gravity, gyroscopic, and
/// external effects at zero joint acceleration.
pub fn dynamics_bias_into<T: Scalar>(
    c: &mut SegmentedVec<T>,
    mechanism: &Mechanism,
    state: &mut MechanismState<T>,
    external_wrenches: Option<&[Wrench<T>]>,
    zero_vdot: &SegmentedVec<T>,
    accelerations: &mut [SpatialAcceleration<T>],
    net_wrenches: &mut [Wrench<T>],
) -> Result<(), DynamicsError> {
    inverse_dynamics_into(
        c,
        mechanism,
        state,
        zero_vdot,
        external_wrenches,
        accelerations,
        net_wrenches,
    )
}

/// Allocating flavor of [`dynamics_bias_into`].
pub fn dynamics_bias<T: Scalar>(
    mechanism: &Mechanism,
    state: &mut MechanismState<T>,
    external_wrenches: Option<&[Wrench<T>]>,
) -> Result<SegmentedVec<T>, DynamicsError> {
    let zero_vdot =
        SegmentedVec::from_widths(state.velocity().ranges().iter().map(|r| r.len()));
    inverse_dynamics(mechanism, state, &zero_vdot, external_wrenches)
}

pub(crate) fn check_len(got: usize, expected: usize) -> Result<(), DynamicsError> {
    if got == expected {
        Ok(())
    } else {
        Err(limb_model::ModelError::DimensionMismatch { expected, got }.into())
    }
}
