//! Geometric and point Jacobians over tree paths.

use crate::error::DynamicsError;
use crate::rnea::check_len;
use limb_math::{FrameId, GeometricJacobian, Scalar, Vec3};
use limb_model::{BodyId, Mechanism, MechanismState};

/// Geometric Jacobian of `body` with respect to `base`, world frame:
/// `J * v` is the twist of `body` relative to `base`.
///
/// Columns are indexed by velocity coordinate; joints off the tree path
/// between the two bodies contribute zero columns. Signed motion subspaces
/// enter positively on the `body` side of the common ancestor and
/// negatively on the `base` side.
pub fn geometric_jacobian_into<T: Scalar>(
    out: &mut GeometricJacobian<T>,
    mechanism: &Mechanism,
    state: &mut MechanismState<T>,
    base: BodyId,
    body: BodyId,
) -> Result<(), DynamicsError> {
    state.check_compatible(mechanism)?;
    mechanism.body(base)?;
    mechanism.body(body)?;
    check_len(out.num_cols(), state.num_velocities())?;

    state.ensure_motion_subspaces();
    let subspaces = state.motion_subspaces();
    let ranges = state.velocity().ranges();

    out.body = state.body_frame(body.index());
    out.base = state.body_frame(base.index());
    out.frame = state.world_frame();
    for c in 0..out.num_cols() {
        out.set_col(c, Vec3::zero(), Vec3::zero());
    }

    // Climb from `body` adding subspaces, then from `base` subtracting.
    // Joints above the common ancestor appear in both climbs and cancel.
    let mut b = body.index();
    while b != 0 {
        let j = b - 1;
        for c in 0..subspaces[j].num_cols() {
            let col = ranges[j].start + c;
            out.angular[col] += subspaces[j].angular[c];
            out.linear[col] += subspaces[j].linear[c];
        }
        b = state.predecessor_index(j);
    }
    let mut b = base.index();
    while b != 0 {
        let j = b - 1;
        for c in 0..subspaces[j].num_cols() {
            let col = ranges[j].start + c;
            out.angular[col] -= subspaces[j].angular[c];
            out.linear[col] -= subspaces[j].linear[c];
        }
        b = state.predecessor_index(j);
    }
    Ok(())
}

/// Allocating flavor of [`geometric_jacobian_into`].
pub fn geometric_jacobian<T: Scalar>(
    mechanism: &Mechanism,
    state: &mut MechanismState<T>,
    base: BodyId,
    body: BodyId,
) -> Result<GeometricJacobian<T>, DynamicsError> {
    let world = state.world_frame();
    let mut out = GeometricJacobian::zeros(world, world, world, state.num_velocities());
    geometric_jacobian_into(&mut out, mechanism, state, base, body)?;
    Ok(out)
}

/// Geometric Jacobian re-expressed in an arbitrary frame.
pub fn geometric_jacobian_in_frame<T: Scalar>(
    mechanism: &Mechanism,
    state: &mut MechanismState<T>,
    base: BodyId,
    body: BodyId,
    frame: FrameId,
) -> Result<GeometricJacobian<T>, DynamicsError> {
    let jac = geometric_jacobian(mechanism, state, base, body)?;
    let world_to_frame = state.relative_transform(mechanism, state.world_frame(), frame)?;
    Ok(jac.try_transform(&world_to_frame)?)
}

/// Jacobian of a point fixed to `body` (given in that body's frame):
/// `J_p * v` is the world-frame velocity of the point relative to `base`.
#[derive(Clone, Debug)]
pub struct PointJacobian<T> {
    pub frame: FrameId,
    pub cols: Vec<Vec3<T>>,
}

impl<T: Scalar> PointJacobian<T> {
    pub fn velocity(&self, v: &[T]) -> Vec3<T> {
        debug_assert_eq!(v.len(), self.cols.len());
        let mut out = Vec3::zero();
        for (c, &vi) in self.cols.iter().zip(v.iter()) {
            out += *c * vi;
        }
        out
    }
}

pub fn point_jacobian<T: Scalar>(
    mechanism: &Mechanism,
    state: &mut MechanismState<T>,
    base: BodyId,
    body: BodyId,
    point: &Vec3<T>,
) -> Result<PointJacobian<T>, DynamicsError> {
    let jac = geometric_jacobian(mechanism, state, base, body)?;
    state.ensure_transforms_to_root();
    let p_world = state.transforms_to_root()[body.index()].transform_point(point);
    let cols = (0..jac.num_cols())
        .map(|c| jac.linear[c] + jac.angular[c].cross(&p_world))
        .collect();
    Ok(PointJacobian {
        frame: state.world_frame(),
        cols,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use limb_math::{Mat3, Placement, GRAVITY};
    use limb_model::{JointKind, MassProperties};

    fn branched_mechanism() -> Mechanism {
        let mut m = Mechanism::new("world", Vec3::new(0.0, -GRAVITY, 0.0));
        let inertia = MassProperties::new(
            1.0,
            Vec3::new(0.5, 0.0, 0.0),
            Mat3::from_diagonal(&Vec3::new(0.01, 1.0 / 12.0, 1.0 / 12.0)),
        );
        let a = m
            .attach(
                BodyId::ROOT,
                "a",
                Some(inertia),
                "ja",
                JointKind::Revolute {
                    axis: Vec3::new(0.0, 0.0, 1.0),
                },
                Placement::identity(),
            )
            .unwrap();
        m.attach(
            a,
            "b",
            Some(inertia),
            "jb",
            JointKind::Revolute {
                axis: Vec3::new(0.0, 1.0, 0.0),
            },
            Placement::translation(Vec3::new(1.0, 0.0, 0.0)),
        )
        .unwrap();
        m.attach(
            a,
            "c",
            Some(inertia),
            "jc",
            JointKind::Revolute {
                axis: Vec3::new(1.0, 0.0, 0.0),
            },
            Placement::translation(Vec3::new(0.0, 0.0, 1.0)),
        )
        .unwrap();
        m
    }

    #[test]
    fn jacobian_times_velocity_matches_twist_from_root() {
        let m = branched_mechanism();
        let mut state: MechanismState<f64> = MechanismState::new(&m);
        let mut rng = rand::thread_rng();
        state.randomize(&mut rng);

        for body in [BodyId(1), BodyId(2), BodyId(3)] {
            let jac = geometric_jacobian(&m, &mut state, BodyId::ROOT, body).unwrap();
            let tw_from_jac = jac.twist(state.velocity().as_slice());
            let tw = state.twist_wrt_world(&m, body).unwrap();
            assert_relative_eq!(
                (tw_from_jac.angular - tw.angular).norm(),
                0.0,
                epsilon = 1e-10
            );
            assert_relative_eq!(
                (tw_from_jac.linear - tw.linear).norm(),
                0.0,
                epsilon = 1e-10
            );
        }
    }

    #[test]
    fn jacobian_between_siblings_matches_relative_twist() {
        let m = branched_mechanism();
        let mut state: MechanismState<f64> = MechanismState::new(&m);
        let mut rng = rand::thread_rng();
        state.randomize(&mut rng);

        let jac = geometric_jacobian(&m, &mut state, BodyId(2), BodyId(3)).unwrap();
        let tw_from_jac = jac.twist(state.velocity().as_slice());
        let tw = state.relative_twist(&m, BodyId(3), BodyId(2)).unwrap();
        assert_relative_eq!(
            (tw_from_jac.angular - tw.angular).norm(),
            0.0,
            epsilon = 1e-10
        );
        assert_relative_eq!((tw_from_jac.linear - tw.linear).norm(), 0.0, epsilon = 1e-10);
        // The shared joint ja cancels out.
        assert!(jac.angular[0].norm() < 1e-12 && jac.linear[0].norm() < 1e-12);
    }

    #[test]
    fn point_jacobian_matches_finite_difference() {
        let m = branched_mechanism();
        let mut state: MechanismState<f64> = MechanismState::new(&m);
        state.set_configuration(&[0.3, -0.4, 0.9]).unwrap();
        let v = [0.5, 1.1, -0.7];
        state.set_velocity(&v).unwrap();

        let point = Vec3::new(0.2, 0.1, 0.0);
        let pj = point_jacobian(&m, &mut state, BodyId::ROOT, BodyId(2), &point).unwrap();
        let vel = pj.velocity(&v);

        // Finite difference on the world position of the point.
        let h = 1e-7;
        let p0 = state
            .transform_to_root(&m, BodyId(2))
            .unwrap()
            .transform_point(&point);
        let q2 = [0.3 + h * v[0], -0.4 + h * v[1], 0.9 + h * v[2]];
        state.set_configuration(&q2).unwrap();
        let p1 = state
            .transform_to_root(&m, BodyId(2))
            .unwrap()
            .transform_point(&point);
        let fd = (p1 - p0) * (1.0 / h);
        assert_relative_eq!(vel.x, fd.x, epsilon = 1e-5);
        assert_relative_eq!(vel.y, fd.y, epsilon = 1e-5);
        assert_relative_eq!(vel.z, fd.z, epsilon = 1e-5);
    }
}
