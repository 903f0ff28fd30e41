//! Forward dynamics: `M(q) vdot = tau - c(q, v) + J^T lambda + contact`.
//!
//! The mass matrix is factorized by Cholesky with an LDL^T fallback on a
//! non-positive pivot. Loop closures contribute velocity-level constraints
//! `K^T T_rel = 0` differentiated once, with Baumgarte velocity
//! stabilization, solved through a Schur complement on the factor. Soft
//! contact forces are evaluated from the cached kinematics before the
//! solve; their state rates ride along in the result for the caller's
//! integrator.

use crate::crba::mass_matrix_into;
use crate::error::DynamicsError;
use crate::rnea::{check_len, inverse_dynamics_into};
use limb_math::{
    cholesky_in_place, cholesky_solve_in_place, ldlt_in_place, ldlt_solve_in_place, DMat, DVec,
    Scalar, SpatialError, Transform, Vec3, Wrench,
};
use limb_model::{DynamicsResult, Mechanism, MechanismState, SegmentedVec};

/// Diagonal shift applied to the loop-closure Schur complement.
const CONSTRAINT_REGULARIZATION: f64 = 1e-10;

/// Compute forward dynamics into `result`.
///
/// `torques` defaults to zero; `external_wrenches` are world-frame, one per
/// body. On success `result` holds `vdot`, constraint multipliers, joint
/// wrenches, contact wrenches, and the contact-state rate.
pub fn dynamics<T: Scalar>(
    result: &mut DynamicsResult<T>,
    mechanism: &Mechanism,
    state: &mut MechanismState<T>,
    torques: Option<&SegmentedVec<T>>,
    external_wrenches: Option<&[Wrench<T>]>,
) -> Result<(), DynamicsError> {
    state.check_compatible(mechanism)?;
    result.check_compatible(mechanism)?;
    let nv = state.num_velocities();
    let nb = state.num_bodies();
    if let Some(tau) = torques {
        check_len(tau.len(), nv)?;
    }
    if let Some(ext) = external_wrenches {
        check_len(ext.len(), nb)?;
        for w in ext {
            SpatialError::check_frames(state.world_frame(), w.frame)?;
        }
    }

    state.ensure_bias_accelerations();
    state.ensure_crb_inertias();

    contact_pass(mechanism, state, result);

    // Applied external wrenches plus contact wrenches, per body.
    let world = state.world_frame();
    for b in 0..nb {
        let mut angular = result.contact_wrenches[b].angular;
        let mut linear = result.contact_wrenches[b].linear;
        if let Some(ext) = external_wrenches {
            angular += ext[b].angular;
            linear += ext[b].linear;
        }
        result.external_scratch[b] = Wrench::new(state.body_frame(b), world, world, angular, linear);
    }

    // Bias torques c(q, v) with all external effects folded in.
    inverse_dynamics_into(
        &mut result.seg_scratch,
        mechanism,
        state,
        &result.zero_vdot,
        Some(result.external_scratch.as_slice()),
        &mut result.accelerations,
        &mut result.net_wrenches,
    )?;
    for i in 0..nv {
        result.dynamics_bias[i] = result.seg_scratch[i];
    }

    mass_matrix_into(&mut result.mass_matrix, mechanism, state)?;

    for i in 0..nv {
        let tau_i = torques.map_or(T::ZERO, |t| t[i]);
        result.rhs[i] = tau_i - result.dynamics_bias[i];
    }

    // Factor M: Cholesky, falling back to LDL^T on a non-positive pivot.
    result.factor.copy_from(&result.mass_matrix);
    let use_ldlt = if cholesky_in_place(&mut result.factor) {
        false
    } else {
        result.factor.copy_from(&result.mass_matrix);
        if ldlt_in_place(&mut result.factor, &mut result.factor_diag, 1e-12) {
            true
        } else {
            return Err(DynamicsError::SingularMassMatrix(
                "both Cholesky and LDL^T hit a zero pivot".to_string(),
            ));
        }
    };

    let nc = result.num_constraints();
    if nc > 0 {
        build_constraints(mechanism, state, result);

        // minv_jt = M^{-1} J^T, one solve per constraint row.
        for c in 0..nc {
            for i in 0..nv {
                result.tau_scratch[i] = result.constraint_jacobian[(c, i)];
            }
            solve_in_place(
                &result.factor,
                &result.factor_diag,
                use_ldlt,
                &mut result.tau_scratch,
            );
            for i in 0..nv {
                result.minv_jt[(i, c)] = result.tau_scratch[i];
            }
        }
        // Schur complement A = J M^{-1} J^T. Constraint rows that the tree
        // cannot violate at all (common with planar mechanisms closed by a
        // spatial joint) are identically zero, so A is regularized with a
        // small diagonal shift; consistent redundant rows then get zero
        // multipliers.
        for r in 0..nc {
            for c in 0..nc {
                let mut acc = T::ZERO;
                for i in 0..nv {
                    acc += result.constraint_jacobian[(r, i)] * result.minv_jt[(i, c)];
                }
                result.kkt[(r, c)] = acc;
            }
            result.kkt[(r, r)] += T::from_f64(CONSTRAINT_REGULARIZATION);
        }
        // Unconstrained solve x0 = M^{-1} (tau - c), in place.
        solve_in_place(&result.factor, &result.factor_diag, use_ldlt, &mut result.rhs);
        // lambda = A^{-1} (b_c - J x0).
        for r in 0..nc {
            let mut acc = result.constraint_rhs[r];
            for i in 0..nv {
                acc -= result.constraint_jacobian[(r, i)] * result.rhs[i];
            }
            result.lambda_rhs[r] = acc;
        }
        if !ldlt_in_place(&mut result.kkt, &mut result.kkt_diag, 1e-14) {
            return Err(DynamicsError::SingularMassMatrix(
                "loop-closure constraint system is singular".to_string(),
            ));
        }
        ldlt_solve_in_place(&result.kkt, &result.kkt_diag, &mut result.lambda_rhs);
        for r in 0..nc {
            result.multipliers[r] = result.lambda_rhs[r];
        }
        // vdot = x0 + M^{-1} J^T lambda.
        for i in 0..nv {
            let mut acc = result.rhs[i];
            for c in 0..nc {
                acc += result.minv_jt[(i, c)] * result.lambda_rhs[c];
            }
            result.rhs[i] = acc;
        }
    } else {
        solve_in_place(&result.factor, &result.factor_diag, use_ldlt, &mut result.rhs);
    }

    for i in 0..nv {
        result.vdot[i] = result.rhs[i];
    }

    // Transmitted tree-joint wrenches consistent with the solved motion.
    inverse_dynamics_into(
        &mut result.seg_scratch,
        mechanism,
        state,
        &result.vdot,
        Some(result.external_scratch.as_slice()),
        &mut result.accelerations,
        &mut result.net_wrenches,
    )?;
    result.joint_wrenches.copy_from_slice(&result.net_wrenches);
    Ok(())
}

fn solve_in_place<T: Scalar>(factor: &DMat<T>, diag: &DVec<T>, use_ldlt: bool, x: &mut DVec<T>) {
    if use_ldlt {
        ldlt_solve_in_place(factor, diag, x);
    } else {
        cholesky_solve_in_place(factor, x);
    }
}

/// Evaluate soft contact forces from the cached kinematics, accumulating
/// per-body wrenches and writing the contact-state rate.
fn contact_pass<T: Scalar>(
    mechanism: &Mechanism,
    state: &MechanismState<T>,
    result: &mut DynamicsResult<T>,
) {
    let world = state.world_frame();
    for b in 0..state.num_bodies() {
        result.contact_wrenches[b] = Wrench::zero(state.body_frame(b), world, world);
    }
    result.contact_state_rate.fill(T::ZERO);
    if state.contact_points().is_empty() {
        return;
    }

    let transforms = state.transforms_to_root();
    let twists = state.twists();
    for point in state.contact_points() {
        let b = point.body;
        let p_world = transforms[b].transform_point(&point.location);
        let v_world = twists[b].point_velocity(&p_world);
        let contact_state = &state.contact_state()[point.state_range.clone()];
        let rate = &mut result.contact_state_rate[point.state_range.clone()];

        let mut in_contact = false;
        for surface in mechanism.environment() {
            let penetration = surface.penetration(&p_world);
            if penetration.value() > 0.0 {
                in_contact = true;
                let normal = Vec3::<T>::from_f64(&surface.normal);
                let normal_rate = normal.dot(&v_world);
                let tangential = v_world - normal * normal_rate;
                let force = point.model.contact_force(
                    penetration,
                    -normal_rate,
                    &normal,
                    &tangential,
                    contact_state,
                    rate,
                );
                let w = Wrench::from_force_at_point(
                    state.body_frame(b),
                    world,
                    world,
                    &p_world,
                    &force,
                );
                result.contact_wrenches[b] = Wrench::new(
                    state.body_frame(b),
                    world,
                    world,
                    result.contact_wrenches[b].angular + w.angular,
                    result.contact_wrenches[b].linear + w.linear,
                );
            }
        }
        if !in_contact {
            point.model.friction.relax(contact_state, rate);
        }
    }
}

/// Fill the loop-closure constraint Jacobian and right-hand side.
///
/// For each loop joint with wrench basis K (world frame): rows
/// `K^T J_path vdot = -K^T (bias_succ - bias_pred) - alpha K^T T_rel`.
fn build_constraints<T: Scalar>(
    mechanism: &Mechanism,
    state: &MechanismState<T>,
    result: &mut DynamicsResult<T>,
) {
    let transforms = state.transforms_to_root();
    let twists = state.twists();
    let biases = state.bias_accelerations();
    let subspaces = state.motion_subspaces();
    let ranges = state.velocity().ranges();
    let nv = result.rhs.len();

    let mut row = 0;
    for (li, lj) in mechanism.non_tree_joints().iter().enumerate() {
        let pred = lj.predecessor.index();
        let succ = lj.successor.index();
        // World pose of the loop joint's after frame.
        let x_after = transforms[succ] * Transform::<T>::from_f64(&lj.pose_after);
        result.loop_subspaces_world[li].clone_from(&result.loop_subspaces[li]);
        result.loop_subspaces_world[li].transform_in_place(&x_after);
        let basis = &result.loop_subspaces_world[li];

        let rel_twist_ang = twists[succ].angular - twists[pred].angular;
        let rel_twist_lin = twists[succ].linear - twists[pred].linear;
        let rel_bias_ang = biases[succ].angular - biases[pred].angular;
        let rel_bias_lin = biases[succ].linear - biases[pred].linear;
        let alpha = T::from_f64(lj.joint.stabilization_gain);

        for c in 0..basis.num_cols() {
            for i in 0..nv {
                result.constraint_jacobian[(row, i)] = T::ZERO;
            }
            // Signed tree path: climb from the successor adding, then from
            // the predecessor subtracting; shared ancestors cancel.
            let mut b = succ;
            while b != 0 {
                let j = b - 1;
                for sc in 0..subspaces[j].num_cols() {
                    let col = ranges[j].start + sc;
                    result.constraint_jacobian[(row, col)] +=
                        basis.dot_motion(c, &subspaces[j].angular[sc], &subspaces[j].linear[sc]);
                }
                b = state.predecessor_index(j);
            }
            let mut b = pred;
            while b != 0 {
                let j = b - 1;
                for sc in 0..subspaces[j].num_cols() {
                    let col = ranges[j].start + sc;
                    result.constraint_jacobian[(row, col)] -=
                        basis.dot_motion(c, &subspaces[j].angular[sc], &subspaces[j].linear[sc]);
                }
                b = state.predecessor_index(j);
            }
            result.constraint_rhs[row] = -basis.dot_motion(c, &rel_bias_ang, &rel_bias_lin)
                - alpha * basis.dot_motion(c, &rel_twist_ang, &rel_twist_lin);
            row += 1;
        }
    }
    debug_assert_eq!(row, result.num_constraints());
}
