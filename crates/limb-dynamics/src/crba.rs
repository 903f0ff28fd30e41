//! Composite Rigid Body Algorithm: the joint-space mass matrix.

use crate::error::DynamicsError;
use crate::rnea::check_len;
use limb_math::{DMat, Scalar};
use limb_model::{Mechanism, MechanismState};

/// Compute `M(q)` into a pre-sized nv x nv matrix.
///
/// Composite inertias come from the state's CRB cache; because both they
/// and the motion subspaces are world-frame, the ancestor walk is just
/// dot products. Only ancestor-descendant entries are nonzero; each is
/// mirrored across the diagonal.
pub fn mass_matrix_into<T: Scalar>(
    m: &mut DMat<T>,
    mechanism: &Mechanism,
    state: &mut MechanismState<T>,
) -> Result<(), DynamicsError> {
    state.check_compatible(mechanism)?;
    let nv = state.num_velocities();
    check_len(m.rows(), nv)?;
    check_len(m.cols(), nv)?;

    state.ensure_crb_inertias();
    state.ensure_motion_subspaces();
    let crb = state.crb_inertias();
    let subspaces = state.motion_subspaces();
    let ranges = state.velocity().ranges();

    m.fill(T::ZERO);
    for j in 0..state.num_joints() {
        let body_j = j + 1;
        for cb in 0..subspaces[j].num_cols() {
            let col = ranges[j].start + cb;
            // F = I_c(subtree of j) * S_j column.
            let (f_ang, f_lin) =
                crb[body_j].apply_vec(&subspaces[j].angular[cb], &subspaces[j].linear[cb]);
            // Pair with joint j itself and every ancestor joint.
            let mut i = j;
            loop {
                for ca in 0..subspaces[i].num_cols() {
                    let row = ranges[i].start + ca;
                    let val =
                        subspaces[i].angular[ca].dot(&f_ang) + subspaces[i].linear[ca].dot(&f_lin);
                    m[(row, col)] = val;
                    m[(col, row)] = val;
                }
                let pred = state.predecessor_index(i);
                if pred == 0 {
                    break;
                }
                i = pred - 1;
            }
        }
    }
    Ok(())
}

/// Allocating flavor of [`mass_matrix_into`].
pub fn mass_matrix<T: Scalar>(
    mechanism: &Mechanism,
    state: &mut MechanismState<T>,
) -> Result<DMat<T>, DynamicsError> {
    let nv = state.num_velocities();
    let mut m = DMat::zeros(nv, nv);
    mass_matrix_into(&mut m, mechanism, state)?;
    Ok(m)
}
