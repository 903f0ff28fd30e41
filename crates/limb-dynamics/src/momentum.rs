//! System momentum and the momentum matrix.

use crate::error::DynamicsError;
use crate::rnea::check_len;
use limb_math::{FrameId, Momentum, MomentumMatrix, Scalar, Vec3};
use limb_model::{Mechanism, MechanismState};

/// Total momentum of the mechanism about the world origin, world frame.
pub fn momentum<T: Scalar>(
    mechanism: &Mechanism,
    state: &mut MechanismState<T>,
) -> Result<Momentum<T>, DynamicsError> {
    state.check_compatible(mechanism)?;
    state.ensure_twists();
    state.ensure_inertias_in_world();
    let world = state.world_frame();
    let twists = state.twists();
    let inertias = state.inertias_in_world();

    let mut angular = Vec3::zero();
    let mut linear = Vec3::zero();
    for b in 0..state.num_bodies() {
        let (k, l) = inertias[b].apply_vec(&twists[b].angular, &twists[b].linear);
        angular += k;
        linear += l;
    }
    Ok(Momentum::new(world, world, world, angular, linear))
}

/// Total momentum re-expressed in `frame`.
pub fn momentum_in_frame<T: Scalar>(
    mechanism: &Mechanism,
    state: &mut MechanismState<T>,
    frame: FrameId,
) -> Result<Momentum<T>, DynamicsError> {
    let h = momentum(mechanism, state)?;
    let world_to_frame = state.relative_transform(mechanism, state.world_frame(), frame)?;
    Ok(h.try_transform(&world_to_frame)?)
}

/// The momentum matrix `A(q)`: `h = A v`. Column `k` is the composite
/// inertia of the corresponding joint's subtree applied to its motion
/// subspace column.
pub fn momentum_matrix_into<T: Scalar>(
    out: &mut MomentumMatrix<T>,
    mechanism: &Mechanism,
    state: &mut MechanismState<T>,
) -> Result<(), DynamicsError> {
    state.check_compatible(mechanism)?;
    check_len(out.num_cols(), state.num_velocities())?;
    state.ensure_crb_inertias();
    state.ensure_motion_subspaces();
    out.frame = state.world_frame();
    let crb = state.crb_inertias();
    let subspaces = state.motion_subspaces();
    let ranges = state.velocity().ranges();

    for j in 0..state.num_joints() {
        let body_j = j + 1;
        for c in 0..subspaces[j].num_cols() {
            let (k, l) =
                crb[body_j].apply_vec(&subspaces[j].angular[c], &subspaces[j].linear[c]);
            out.set_col(ranges[j].start + c, k, l);
        }
    }
    Ok(())
}

/// Allocating flavor of [`momentum_matrix_into`].
pub fn momentum_matrix<T: Scalar>(
    mechanism: &Mechanism,
    state: &mut MechanismState<T>,
) -> Result<MomentumMatrix<T>, DynamicsError> {
    let mut out = MomentumMatrix::zeros(state.world_frame(), state.num_velocities());
    momentum_matrix_into(&mut out, mechanism, state)?;
    Ok(out)
}
