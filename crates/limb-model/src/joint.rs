//! Joint kinds and their configuration/velocity kinematics.
//!
//! Every kind answers the same questions: how big are its configuration and
//! velocity slices, what transform does a configuration produce, what twist
//! does a unit velocity produce (motion subspace), and how do velocities
//! map to configuration rates. Dispatch is a plain match on the kind.

use crate::error::ModelError;
use limb_math::{
    DMat, FrameId, GeometricJacobian, Mat3, Quat, Scalar, SpatialAcceleration, Transform, Vec3,
    WrenchSubspace, skew,
};
use rand::Rng;
use rand_distr::StandardNormal;

/// Dense joint identifier; tree joints come first, in tree order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct JointId(pub usize);

impl JointId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Per-coordinate bounds.
#[derive(Clone, Copy, Debug)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn unbounded() -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        }
    }
}

/// The joint variants.
#[derive(Clone, Debug)]
pub enum JointKind<T> {
    /// One rotational degree of freedom about `axis` (unit, fixed in both
    /// joint frames).
    Revolute { axis: Vec3<T> },
    /// One translational degree of freedom along `axis`.
    Prismatic { axis: Vec3<T> },
    /// Translation in the span of `x_axis`/`y_axis` plus rotation about
    /// their normal. q = (x, y, theta), v = (x_dot, y_dot, theta_dot).
    Planar { x_axis: Vec3<T>, y_axis: Vec3<T> },
    /// Rigid attachment, zero degrees of freedom.
    Fixed,
    /// Free 6-DoF joint; q = [quaternion w x y z | position], v = twist of
    /// the successor in its own frame.
    QuaternionFloating,
    /// Free 6-DoF joint with a modified-Rodrigues (stereographic
    /// quaternion) orientation; q = [mrp | position], v as above.
    SpQuatFloating,
    /// One rotational degree of freedom storing q = (sin theta, cos theta).
    SinCosRevolute { axis: Vec3<T> },
}

impl<T: Scalar> JointKind<T> {
    /// Configuration dimension.
    pub fn nq(&self) -> usize {
        match self {
            JointKind::Revolute { .. } | JointKind::Prismatic { .. } => 1,
            JointKind::Planar { .. } => 3,
            JointKind::Fixed => 0,
            JointKind::QuaternionFloating => 7,
            JointKind::SpQuatFloating => 6,
            JointKind::SinCosRevolute { .. } => 2,
        }
    }

    /// Velocity dimension.
    pub fn nv(&self) -> usize {
        match self {
            JointKind::Revolute { .. } | JointKind::Prismatic { .. } => 1,
            JointKind::Planar { .. } => 3,
            JointKind::Fixed => 0,
            JointKind::QuaternionFloating | JointKind::SpQuatFloating => 6,
            JointKind::SinCosRevolute { .. } => 1,
        }
    }

    /// Transform from `frame_after` to `frame_before` for configuration `q`.
    pub fn joint_transform(&self, after: FrameId, before: FrameId, q: &[T]) -> Transform<T> {
        debug_assert_eq!(q.len(), self.nq());
        match self {
            JointKind::Revolute { axis } => Transform::rot_axis(after, before, axis, q[0]),
            JointKind::Prismatic { axis } => Transform::translation(after, before, *axis * q[0]),
            JointKind::Planar { x_axis, y_axis } => {
                let normal = x_axis.cross(y_axis);
                let mut t = Transform::rot_axis(after, before, &normal, q[2]);
                t.trans = *x_axis * q[0] + *y_axis * q[1];
                t
            }
            JointKind::Fixed => Transform::new(after, before, Mat3::identity(), Vec3::zero()),
            JointKind::QuaternionFloating => {
                let rot = Quat::new(q[0], q[1], q[2], q[3]).to_matrix();
                Transform::new(after, before, rot, Vec3::new(q[4], q[5], q[6]))
            }
            JointKind::SpQuatFloating => {
                let rot = mrp_to_quat(&Vec3::new(q[0], q[1], q[2])).to_matrix();
                Transform::new(after, before, rot, Vec3::new(q[3], q[4], q[5]))
            }
            JointKind::SinCosRevolute { axis } => {
                let (s, c) = (q[0], q[1]);
                let ax = skew(axis);
                let rot = Mat3::identity() + ax * s + (ax * ax) * (T::ONE - c);
                Transform::new(after, before, rot, Vec3::zero())
            }
        }
    }

    /// Motion subspace expressed in `frame_after`, written into a pre-sized
    /// Jacobian (6 x nv).
    pub fn motion_subspace_into(
        &self,
        q: &[T],
        out: &mut GeometricJacobian<T>,
    ) {
        debug_assert_eq!(out.num_cols(), self.nv());
        match self {
            JointKind::Revolute { axis } | JointKind::SinCosRevolute { axis } => {
                out.set_col(0, *axis, Vec3::zero());
            }
            JointKind::Prismatic { axis } => {
                out.set_col(0, Vec3::zero(), *axis);
            }
            JointKind::Planar { x_axis, y_axis } => {
                // Translation axes are fixed in frame_before; re-express in
                // frame_after by undoing the joint rotation.
                let normal = x_axis.cross(y_axis);
                let ax = skew(&normal);
                let rot = Mat3::identity() + ax * q[2].sin() + (ax * ax) * (T::ONE - q[2].cos());
                let rt = rot.transpose();
                out.set_col(0, Vec3::zero(), rt * *x_axis);
                out.set_col(1, Vec3::zero(), rt * *y_axis);
                out.set_col(2, normal, Vec3::zero());
            }
            JointKind::Fixed => {}
            JointKind::QuaternionFloating | JointKind::SpQuatFloating => {
                let e = Mat3::<T>::identity();
                for i in 0..3 {
                    out.set_col(i, e.col(i), Vec3::zero());
                    out.set_col(i + 3, Vec3::zero(), e.col(i));
                }
            }
        }
    }

    /// Motion subspace expressed in `frame_after` (allocating flavor).
    pub fn motion_subspace(
        &self,
        after: FrameId,
        before: FrameId,
        q: &[T],
    ) -> GeometricJacobian<T> {
        let mut out = GeometricJacobian::zeros(after, before, after, self.nv());
        self.motion_subspace_into(q, &mut out);
        out
    }

    /// Basis of the wrench directions this joint cannot move in, expressed
    /// in `frame_after`: 6 - nv columns. Used by loop closures.
    pub fn constraint_wrench_subspace(&self, after: FrameId) -> WrenchSubspace<T> {
        let mut out = WrenchSubspace::new(after);
        match self {
            JointKind::Revolute { axis } | JointKind::SinCosRevolute { axis } => {
                let (a1, a2) = orthonormal_pair(axis);
                out.push_col(a1, Vec3::zero());
                out.push_col(a2, Vec3::zero());
                let e = Mat3::<T>::identity();
                for i in 0..3 {
                    out.push_col(Vec3::zero(), e.col(i));
                }
            }
            JointKind::Prismatic { axis } => {
                let e = Mat3::<T>::identity();
                for i in 0..3 {
                    out.push_col(e.col(i), Vec3::zero());
                }
                let (a1, a2) = orthonormal_pair(axis);
                out.push_col(Vec3::zero(), a1);
                out.push_col(Vec3::zero(), a2);
            }
            JointKind::Planar { x_axis, y_axis } => {
                let normal = x_axis.cross(y_axis);
                let (a1, a2) = orthonormal_pair(&normal);
                out.push_col(a1, Vec3::zero());
                out.push_col(a2, Vec3::zero());
                out.push_col(Vec3::zero(), normal);
            }
            JointKind::Fixed => {
                let e = Mat3::<T>::identity();
                for i in 0..3 {
                    out.push_col(e.col(i), Vec3::zero());
                }
                for i in 0..3 {
                    out.push_col(Vec3::zero(), e.col(i));
                }
            }
            JointKind::QuaternionFloating | JointKind::SpQuatFloating => {}
        }
        out
    }

    /// Joint-space bias acceleration `S_dot * v`, expressed in
    /// `frame_after`. Zero for every kind whose motion subspace is constant
    /// there; nonzero only for `Planar`, whose translation columns follow
    /// the joint rotation.
    pub fn bias_acceleration(
        &self,
        after: FrameId,
        before: FrameId,
        q: &[T],
        v: &[T],
    ) -> SpatialAcceleration<T> {
        match self {
            JointKind::Planar { x_axis, y_axis } => {
                let normal = x_axis.cross(y_axis);
                let ax = skew(&normal);
                let rot = Mat3::identity() + ax * q[2].sin() + (ax * ax) * (T::ONE - q[2].cos());
                let rt = rot.transpose();
                let v_lin = rt * *x_axis * v[0] + rt * *y_axis * v[1];
                let omega = normal * v[2];
                SpatialAcceleration::new(after, before, after, Vec3::zero(), -omega.cross(&v_lin))
            }
            _ => SpatialAcceleration::zero(after, before, after),
        }
    }

    /// Map velocity to configuration rate, `q_dot = f(q, v)`.
    pub fn configuration_derivative(&self, q: &[T], v: &[T], q_dot: &mut [T]) {
        debug_assert_eq!(q_dot.len(), self.nq());
        debug_assert_eq!(v.len(), self.nv());
        match self {
            JointKind::Revolute { .. } | JointKind::Prismatic { .. } | JointKind::Planar { .. } => {
                q_dot.copy_from_slice(v);
            }
            JointKind::Fixed => {}
            JointKind::QuaternionFloating => {
                let quat = Quat::new(q[0], q[1], q[2], q[3]);
                let omega = Vec3::new(v[0], v[1], v[2]);
                let vel = Vec3::new(v[3], v[4], v[5]);
                let rate = quat.rate(&omega);
                q_dot[..4].copy_from_slice(&rate);
                let p_dot = quat.to_matrix() * vel;
                q_dot[4] = p_dot.x;
                q_dot[5] = p_dot.y;
                q_dot[6] = p_dot.z;
            }
            JointKind::SpQuatFloating => {
                let p = Vec3::new(q[0], q[1], q[2]);
                let omega = Vec3::new(v[0], v[1], v[2]);
                let vel = Vec3::new(v[3], v[4], v[5]);
                let p_dot = mrp_rate_matrix(&p) * omega * T::from_f64(0.25);
                q_dot[0] = p_dot.x;
                q_dot[1] = p_dot.y;
                q_dot[2] = p_dot.z;
                let x_dot = mrp_to_quat(&p).to_matrix() * vel;
                q_dot[3] = x_dot.x;
                q_dot[4] = x_dot.y;
                q_dot[5] = x_dot.z;
            }
            JointKind::SinCosRevolute { .. } => {
                let (s, c) = (q[0], q[1]);
                q_dot[0] = c * v[0];
                q_dot[1] = -s * v[0];
            }
        }
    }

    /// Inverse map: velocity from a configuration rate.
    pub fn velocity_from_configuration_derivative(&self, q: &[T], q_dot: &[T], v: &mut [T]) {
        debug_assert_eq!(v.len(), self.nv());
        match self {
            JointKind::Revolute { .. } | JointKind::Prismatic { .. } | JointKind::Planar { .. } => {
                v.copy_from_slice(q_dot);
            }
            JointKind::Fixed => {}
            JointKind::QuaternionFloating => {
                let quat = Quat::new(q[0], q[1], q[2], q[3]);
                let rate = [q_dot[0], q_dot[1], q_dot[2], q_dot[3]];
                let omega = quat.angular_velocity(&rate);
                let p_dot = Vec3::new(q_dot[4], q_dot[5], q_dot[6]);
                let vel = quat.to_matrix().transpose() * p_dot;
                v[0] = omega.x;
                v[1] = omega.y;
                v[2] = omega.z;
                v[3] = vel.x;
                v[4] = vel.y;
                v[5] = vel.z;
            }
            JointKind::SpQuatFloating => {
                let p = Vec3::new(q[0], q[1], q[2]);
                let n = p.norm_sq();
                let denom = (T::ONE + n) * (T::ONE + n);
                let p_dot = Vec3::new(q_dot[0], q_dot[1], q_dot[2]);
                let omega = mrp_rate_matrix(&p).transpose() * p_dot * (T::from_f64(4.0) / denom);
                let x_dot = Vec3::new(q_dot[3], q_dot[4], q_dot[5]);
                let vel = mrp_to_quat(&p).to_matrix().transpose() * x_dot;
                v[0] = omega.x;
                v[1] = omega.y;
                v[2] = omega.z;
                v[3] = vel.x;
                v[4] = vel.y;
                v[5] = vel.z;
            }
            JointKind::SinCosRevolute { .. } => {
                let (s, c) = (q[0], q[1]);
                v[0] = c * q_dot[0] - s * q_dot[1];
            }
        }
    }

    /// The nq x nv Jacobian of the velocity-to-configuration-rate map.
    pub fn velocity_to_configuration_derivative_jacobian(&self, q: &[T]) -> DMat<T> {
        let (nq, nv) = (self.nq(), self.nv());
        let mut jac = DMat::zeros(nq, nv);
        match self {
            JointKind::Revolute { .. } | JointKind::Prismatic { .. } | JointKind::Planar { .. } => {
                for i in 0..nq {
                    jac[(i, i)] = T::ONE;
                }
            }
            JointKind::Fixed => {}
            JointKind::QuaternionFloating => {
                let quat = Quat::new(q[0], q[1], q[2], q[3]);
                let half = T::from_f64(0.5);
                // d q_dot / d omega: 1/2 * [ -eps^T ; eta I + [eps x] ].
                let eps = quat.v;
                jac[(0, 0)] = -eps.x * half;
                jac[(0, 1)] = -eps.y * half;
                jac[(0, 2)] = -eps.z * half;
                let block = (Mat3::identity() * quat.w + skew(&eps)) * half;
                for i in 0..3 {
                    for j in 0..3 {
                        jac[(i + 1, j)] = block[(i, j)];
                    }
                }
                let rot = quat.to_matrix();
                for i in 0..3 {
                    for j in 0..3 {
                        jac[(i + 4, j + 3)] = rot[(i, j)];
                    }
                }
            }
            JointKind::SpQuatFloating => {
                let p = Vec3::new(q[0], q[1], q[2]);
                let block = mrp_rate_matrix(&p) * T::from_f64(0.25);
                for i in 0..3 {
                    for j in 0..3 {
                        jac[(i, j)] = block[(i, j)];
                    }
                }
                let rot = mrp_to_quat(&p).to_matrix();
                for i in 0..3 {
                    for j in 0..3 {
                        jac[(i + 3, j + 3)] = rot[(i, j)];
                    }
                }
            }
            JointKind::SinCosRevolute { .. } => {
                jac[(0, 0)] = q[1];
                jac[(1, 0)] = -q[0];
            }
        }
        jac
    }

    /// Write the identity configuration.
    pub fn zero_configuration(&self, q: &mut [T]) {
        debug_assert_eq!(q.len(), self.nq());
        q.fill(T::ZERO);
        match self {
            JointKind::QuaternionFloating => q[0] = T::ONE,
            JointKind::SinCosRevolute { .. } => q[1] = T::ONE,
            _ => {}
        }
    }

    /// Idempotent projection onto the valid configuration manifold.
    pub fn normalize_configuration(&self, q: &mut [T]) {
        match self {
            JointKind::QuaternionFloating => {
                let quat = Quat::new(q[0], q[1], q[2], q[3]).normalize();
                q[0] = quat.w;
                q[1] = quat.v.x;
                q[2] = quat.v.y;
                q[3] = quat.v.z;
            }
            JointKind::SpQuatFloating => {
                // Shadow-set switch keeps the parameters in the unit ball.
                let p = Vec3::new(q[0], q[1], q[2]);
                let n = p.norm_sq();
                if n.value() > 1.0 {
                    let scaled = -p * n.recip();
                    q[0] = scaled.x;
                    q[1] = scaled.y;
                    q[2] = scaled.z;
                }
            }
            JointKind::SinCosRevolute { .. } => {
                let norm = (q[0] * q[0] + q[1] * q[1]).sqrt();
                if norm.value() > 1e-12 {
                    let inv = norm.recip();
                    q[0] *= inv;
                    q[1] *= inv;
                }
            }
            _ => {}
        }
    }

    /// Write a random valid configuration.
    pub fn rand_configuration(&self, q: &mut [T], rng: &mut impl Rng) {
        use std::f64::consts::PI;
        match self {
            JointKind::Revolute { .. } => q[0] = T::from_f64(rng.gen_range(-PI..PI)),
            JointKind::Prismatic { .. } => q[0] = T::from_f64(rng.gen_range(-1.0..1.0)),
            JointKind::Planar { .. } => {
                q[0] = T::from_f64(rng.gen_range(-1.0..1.0));
                q[1] = T::from_f64(rng.gen_range(-1.0..1.0));
                q[2] = T::from_f64(rng.gen_range(-PI..PI));
            }
            JointKind::Fixed => {}
            JointKind::QuaternionFloating => {
                let quat = random_unit_quaternion(rng);
                q[0] = T::from_f64(quat[0]);
                q[1] = T::from_f64(quat[1]);
                q[2] = T::from_f64(quat[2]);
                q[3] = T::from_f64(quat[3]);
                for i in 4..7 {
                    q[i] = T::from_f64(rng.gen_range(-1.0..1.0));
                }
            }
            JointKind::SpQuatFloating => {
                let mut quat = random_unit_quaternion(rng);
                if quat[0] < 0.0 {
                    for w in quat.iter_mut() {
                        *w = -*w;
                    }
                }
                let denom = 1.0 + quat[0];
                q[0] = T::from_f64(quat[1] / denom);
                q[1] = T::from_f64(quat[2] / denom);
                q[2] = T::from_f64(quat[3] / denom);
                for i in 3..6 {
                    q[i] = T::from_f64(rng.gen_range(-1.0..1.0));
                }
            }
            JointKind::SinCosRevolute { .. } => {
                let (s, c) = rng.gen_range(-PI..PI).sin_cos();
                q[0] = T::from_f64(s);
                q[1] = T::from_f64(c);
            }
        }
    }
}

impl JointKind<f64> {
    /// Lift the kind's geometric parameters into another scalar type.
    pub fn cast<U: Scalar>(&self) -> JointKind<U> {
        match self {
            JointKind::Revolute { axis } => JointKind::Revolute {
                axis: Vec3::from_f64(axis),
            },
            JointKind::Prismatic { axis } => JointKind::Prismatic {
                axis: Vec3::from_f64(axis),
            },
            JointKind::Planar { x_axis, y_axis } => JointKind::Planar {
                x_axis: Vec3::from_f64(x_axis),
                y_axis: Vec3::from_f64(y_axis),
            },
            JointKind::Fixed => JointKind::Fixed,
            JointKind::QuaternionFloating => JointKind::QuaternionFloating,
            JointKind::SpQuatFloating => JointKind::SpQuatFloating,
            JointKind::SinCosRevolute { axis } => JointKind::SinCosRevolute {
                axis: Vec3::from_f64(axis),
            },
        }
    }
}

/// Modified Rodrigues parameters to unit quaternion:
/// `w = (1 - |p|^2) / (1 + |p|^2)`, `v = 2 p / (1 + |p|^2)`.
pub fn mrp_to_quat<T: Scalar>(p: &Vec3<T>) -> Quat<T> {
    let n = p.norm_sq();
    let denom = (T::ONE + n).recip();
    Quat {
        w: (T::ONE - n) * denom,
        v: *p * (T::from_f64(2.0) * denom),
    }
}

/// The MRP rate matrix `B(p) = (1 - |p|^2) I + 2 [p x] + 2 p p^T`, with
/// `p_dot = 1/4 B(p) omega` for a body-frame angular velocity.
pub fn mrp_rate_matrix<T: Scalar>(p: &Vec3<T>) -> Mat3<T> {
    let n = p.norm_sq();
    let two = T::from_f64(2.0);
    Mat3::identity() * (T::ONE - n) + skew(p) * two + Mat3::outer(p, p) * two
}

/// Two unit vectors completing `axis` (unit) to an orthonormal triad.
fn orthonormal_pair<T: Scalar>(axis: &Vec3<T>) -> (Vec3<T>, Vec3<T>) {
    let candidate = if axis.x.value().abs() < 0.9 {
        Vec3::new(T::ONE, T::ZERO, T::ZERO)
    } else {
        Vec3::new(T::ZERO, T::ONE, T::ZERO)
    };
    let a1 = axis.cross(&candidate);
    let a1 = a1 * a1.norm().recip();
    let a2 = axis.cross(&a1);
    (a1, a2)
}

fn random_unit_quaternion(rng: &mut impl Rng) -> [f64; 4] {
    let mut quat = [0.0; 4];
    let mut norm_sq = 0.0;
    for w in quat.iter_mut() {
        let x: f64 = rng.sample(StandardNormal);
        *w = x;
        norm_sq += x * x;
    }
    let inv = norm_sq.sqrt().recip();
    for w in quat.iter_mut() {
        *w *= inv;
    }
    quat
}

/// A joint instance: a kind plus identity, frames, and bounds. All mutable
/// per-joint state lives in the mechanism state, not here.
#[derive(Clone, Debug)]
pub struct Joint {
    pub id: JointId,
    pub name: String,
    pub kind: JointKind<f64>,
    /// Frame fixed to the predecessor body.
    pub frame_before: FrameId,
    /// Frame fixed to the successor body (the successor's own frame for
    /// tree joints).
    pub frame_after: FrameId,
    pub position_bounds: Vec<Bounds>,
    pub velocity_bounds: Vec<Bounds>,
    pub effort_bounds: Vec<f64>,
    /// Baumgarte velocity-stabilization gain, used when this joint closes a
    /// loop.
    pub stabilization_gain: f64,
}

impl Joint {
    pub(crate) fn new(
        id: JointId,
        name: String,
        kind: JointKind<f64>,
        frame_before: FrameId,
        frame_after: FrameId,
    ) -> Self {
        let nq = kind.nq();
        let nv = kind.nv();
        Self {
            id,
            name,
            kind,
            frame_before,
            frame_after,
            position_bounds: vec![Bounds::unbounded(); nq],
            velocity_bounds: vec![Bounds::unbounded(); nv],
            effort_bounds: vec![f64::INFINITY; nv],
            stabilization_gain: 0.0,
        }
    }

    #[inline]
    pub fn nq(&self) -> usize {
        self.kind.nq()
    }

    #[inline]
    pub fn nv(&self) -> usize {
        self.kind.nv()
    }
}

/// Validate the geometric parameters of a joint kind.
pub(crate) fn validate_kind(kind: &JointKind<f64>) -> Result<(), ModelError> {
    let unit = |v: &Vec3<f64>, what: &str| -> Result<(), ModelError> {
        if (v.norm() - 1.0).abs() > 1e-9 {
            Err(ModelError::InvalidArgument(format!(
                "{what} must be unit length"
            )))
        } else {
            Ok(())
        }
    };
    match kind {
        JointKind::Revolute { axis }
        | JointKind::Prismatic { axis }
        | JointKind::SinCosRevolute { axis } => unit(axis, "joint axis"),
        JointKind::Planar { x_axis, y_axis } => {
            unit(x_axis, "planar x axis")?;
            unit(y_axis, "planar y axis")?;
            if x_axis.dot(y_axis).abs() > 1e-9 {
                return Err(ModelError::InvalidArgument(
                    "planar axes must be orthogonal".to_string(),
                ));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn quaternion_normalization_is_idempotent(
            w in -2.0..2.0f64, x in -2.0..2.0f64, y in -2.0..2.0f64, z in -2.0..2.0f64,
            px in -1.0..1.0f64, py in -1.0..1.0f64, pz in -1.0..1.0f64,
        ) {
            prop_assume!(w * w + x * x + y * y + z * z > 1e-4);
            let kind = JointKind::QuaternionFloating;
            let mut q = [w, x, y, z, px, py, pz];
            kind.normalize_configuration(&mut q);
            let once = q;
            kind.normalize_configuration(&mut q);
            for i in 0..7 {
                prop_assert!((q[i] - once[i]).abs() < 1e-12);
            }
            let norm = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
            prop_assert!((norm - 1.0).abs() < 1e-12);
        }

        #[test]
        fn mrp_shadow_switch_is_idempotent(
            x in -3.0..3.0f64, y in -3.0..3.0f64, z in -3.0..3.0f64,
        ) {
            let kind = JointKind::SpQuatFloating;
            let mut q = [x, y, z, 0.0, 0.0, 0.0];
            kind.normalize_configuration(&mut q);
            let once = q;
            kind.normalize_configuration(&mut q);
            for i in 0..3 {
                prop_assert!((q[i] - once[i]).abs() < 1e-12);
            }
            let n = q[0] * q[0] + q[1] * q[1] + q[2] * q[2];
            prop_assert!(n <= 1.0 + 1e-12);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use limb_math::DVec;

    const BEFORE: FrameId = FrameId::new(1);
    const AFTER: FrameId = FrameId::new(2);

    fn z_axis() -> Vec3<f64> {
        Vec3::new(0.0, 0.0, 1.0)
    }

    #[test]
    fn revolute_transform_rotates_after_frame() {
        let kind = JointKind::Revolute { axis: z_axis() };
        let t = kind.joint_transform(AFTER, BEFORE, &[std::f64::consts::FRAC_PI_2]);
        // X axis of the after frame maps to Y in the before frame.
        let p = t.transform_point(&Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn sin_cos_revolute_matches_revolute() {
        let angle = 0.83;
        let rev = JointKind::Revolute { axis: z_axis() };
        let sc = JointKind::SinCosRevolute { axis: z_axis() };
        let t1 = rev.joint_transform(AFTER, BEFORE, &[angle]);
        let t2 = sc.joint_transform(AFTER, BEFORE, &[angle.sin(), angle.cos()]);
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(t1.rot[(i, j)], t2.rot[(i, j)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn sin_cos_normalization_is_idempotent() {
        let sc = JointKind::SinCosRevolute { axis: z_axis() };
        let mut q = [0.3, 0.5];
        sc.normalize_configuration(&mut q);
        let after_once = q;
        sc.normalize_configuration(&mut q);
        assert_relative_eq!(q[0], after_once[0], epsilon = 1e-15);
        assert_relative_eq!(q[1], after_once[1], epsilon = 1e-15);
        assert_relative_eq!(q[0] * q[0] + q[1] * q[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn quaternion_configuration_derivative_matches_finite_difference() {
        let kind = JointKind::QuaternionFloating;
        let mut q = [0.0; 7];
        kind.zero_configuration(&mut q);
        // Tilt a bit so the test is not at the identity.
        let tilt = Quat::from_axis_angle(&Vec3::new(1.0, 0.0, 0.0), 0.4);
        q[0] = tilt.w;
        q[1] = tilt.v.x;
        let v = [0.3, -0.2, 0.5, 1.0, 0.0, -0.5];

        let mut q_dot = [0.0; 7];
        kind.configuration_derivative(&q, &v, &mut q_dot);

        // Step along the joint motion and compare.
        let h = 1e-7;
        let omega = Vec3::new(v[0], v[1], v[2]) * h;
        let dq = Quat::new(1.0, omega.x * 0.5, omega.y * 0.5, omega.z * 0.5);
        let quat = Quat::new(q[0], q[1], q[2], q[3]);
        let q_next = quat.mul(&dq);
        assert_relative_eq!((q_next.w - q[0]) / h, q_dot[0], epsilon = 1e-6);
        assert_relative_eq!((q_next.v.x - q[1]) / h, q_dot[1], epsilon = 1e-6);
        assert_relative_eq!((q_next.v.y - q[2]) / h, q_dot[2], epsilon = 1e-6);
        assert_relative_eq!((q_next.v.z - q[3]) / h, q_dot[3], epsilon = 1e-6);

        // Position rate is the body-frame velocity rotated to the parent.
        let vel = quat.to_matrix() * Vec3::new(v[3], v[4], v[5]);
        assert_relative_eq!(q_dot[4], vel.x, epsilon = 1e-12);
    }

    #[test]
    fn quaternion_velocity_roundtrip() {
        let kind = JointKind::QuaternionFloating;
        let tilt = Quat::from_axis_angle(&Vec3::new(0.0, 1.0, 0.0), 1.1);
        let q = [tilt.w, tilt.v.x, tilt.v.y, tilt.v.z, 0.4, -0.3, 0.2];
        let v = [0.1, 0.2, -0.3, 0.5, 0.6, -0.7];
        let mut q_dot = [0.0; 7];
        kind.configuration_derivative(&q, &v, &mut q_dot);
        let mut v_back = [0.0; 6];
        kind.velocity_from_configuration_derivative(&q, &q_dot, &mut v_back);
        for i in 0..6 {
            assert_relative_eq!(v_back[i], v[i], epsilon = 1e-10);
        }
    }

    #[test]
    fn spquat_kinematics_match_quaternion_kinematics() {
        // Same physical motion expressed in both floating parameterizations
        // must land on the same orientation after a small step.
        let quat_kind = JointKind::QuaternionFloating;
        let mrp_kind = JointKind::SpQuatFloating;

        let quat = Quat::from_axis_angle(&Vec3::new(0.6, 0.8, 0.0), 0.7);
        let p = quat.v * (1.0 + quat.w).recip();
        let q_quat = [quat.w, quat.v.x, quat.v.y, quat.v.z, 0.0, 0.0, 0.0];
        let q_mrp = [p.x, p.y, p.z, 0.0, 0.0, 0.0];
        let v = [0.4, -0.1, 0.3, 0.0, 0.0, 0.0];

        let h = 1e-6;
        let mut dq_quat = [0.0; 7];
        quat_kind.configuration_derivative(&q_quat, &v, &mut dq_quat);
        let mut dq_mrp = [0.0; 6];
        mrp_kind.configuration_derivative(&q_mrp, &v, &mut dq_mrp);

        let quat_next = Quat::new(
            q_quat[0] + h * dq_quat[0],
            q_quat[1] + h * dq_quat[1],
            q_quat[2] + h * dq_quat[2],
            q_quat[3] + h * dq_quat[3],
        )
        .normalize();
        let p_next = Vec3::new(
            q_mrp[0] + h * dq_mrp[0],
            q_mrp[1] + h * dq_mrp[1],
            q_mrp[2] + h * dq_mrp[2],
        );
        let quat_from_mrp = mrp_to_quat(&p_next);

        assert_relative_eq!(quat_next.w, quat_from_mrp.w, epsilon = 1e-9);
        assert_relative_eq!(quat_next.v.x, quat_from_mrp.v.x, epsilon = 1e-9);
        assert_relative_eq!(quat_next.v.y, quat_from_mrp.v.y, epsilon = 1e-9);
        assert_relative_eq!(quat_next.v.z, quat_from_mrp.v.z, epsilon = 1e-9);
    }

    /// The rate map is linear in v, so the nq x nv Jacobian applied to v
    /// must reproduce `configuration_derivative` exactly.
    fn check_rate_jacobian(kind: &JointKind<f64>, q: &[f64], v: &[f64]) {
        let jac = kind.velocity_to_configuration_derivative_jacobian(q);
        assert_eq!(jac.rows(), kind.nq());
        assert_eq!(jac.cols(), kind.nv());
        let mut q_dot = vec![0.0; kind.nq()];
        kind.configuration_derivative(q, v, &mut q_dot);
        let jv = jac.mul_vec(&DVec::from_vec(v.to_vec()));
        for i in 0..kind.nq() {
            assert_relative_eq!(jv[i], q_dot[i], epsilon = 1e-12);
        }
        // And the inverse map recovers v from J v (valid configurations).
        let mut v_back = vec![0.0; kind.nv()];
        kind.velocity_from_configuration_derivative(q, &q_dot, &mut v_back);
        for i in 0..kind.nv() {
            assert_relative_eq!(v_back[i], v[i], epsilon = 1e-10);
        }
    }

    #[test]
    fn rate_jacobian_matches_configuration_derivative() {
        check_rate_jacobian(&JointKind::Revolute { axis: z_axis() }, &[0.5], &[-1.2]);
        check_rate_jacobian(
            &JointKind::Prismatic {
                axis: Vec3::new(1.0, 0.0, 0.0),
            },
            &[0.3],
            &[0.9],
        );
        check_rate_jacobian(
            &JointKind::Planar {
                x_axis: Vec3::new(1.0, 0.0, 0.0),
                y_axis: Vec3::new(0.0, 1.0, 0.0),
            },
            &[0.3, -0.2, 0.8],
            &[0.7, 0.4, 1.3],
        );

        let angle = 0.6f64;
        check_rate_jacobian(
            &JointKind::SinCosRevolute { axis: z_axis() },
            &[angle.sin(), angle.cos()],
            &[1.7],
        );

        let tilt = Quat::from_axis_angle(&Vec3::new(0.6, 0.0, 0.8), 0.9);
        check_rate_jacobian(
            &JointKind::QuaternionFloating,
            &[tilt.w, tilt.v.x, tilt.v.y, tilt.v.z, 0.2, -0.5, 1.0],
            &[0.4, -0.2, 0.7, 0.3, -0.8, 0.1],
        );

        check_rate_jacobian(
            &JointKind::SpQuatFloating,
            &[0.2, -0.1, 0.3, 1.0, 2.0, 3.0],
            &[0.5, 0.4, -0.2, 0.1, -0.6, 0.3],
        );
    }

    #[test]
    fn spquat_velocity_roundtrip() {
        let kind = JointKind::SpQuatFloating;
        let q = [0.2, -0.1, 0.3, 1.0, 2.0, 3.0];
        let v = [0.5, 0.4, -0.2, 0.1, -0.6, 0.3];
        let mut q_dot = [0.0; 6];
        kind.configuration_derivative(&q, &v, &mut q_dot);
        let mut v_back = [0.0; 6];
        kind.velocity_from_configuration_derivative(&q, &q_dot, &mut v_back);
        for i in 0..6 {
            assert_relative_eq!(v_back[i], v[i], epsilon = 1e-10);
        }
    }

    #[test]
    fn planar_bias_acceleration_matches_finite_difference_of_subspace() {
        let kind = JointKind::Planar {
            x_axis: Vec3::new(1.0, 0.0, 0.0),
            y_axis: Vec3::new(0.0, 1.0, 0.0),
        };
        let q = [0.3, -0.2, 0.8];
        let v = [0.7, 0.4, 1.3];

        let bias = kind.bias_acceleration(AFTER, BEFORE, &q, &v);

        // S(q + h*q_dot) v vs S(q) v, with q_dot = v for this kind.
        let h = 1e-7;
        let q2 = [q[0] + h * v[0], q[1] + h * v[1], q[2] + h * v[2]];
        let s1 = kind.motion_subspace(AFTER, BEFORE, &q);
        let s2 = kind.motion_subspace(AFTER, BEFORE, &q2);
        let t1 = s1.twist(&v);
        let t2 = s2.twist(&v);
        let fd_lin = (t2.linear - t1.linear) * (1.0 / h);
        assert_relative_eq!(bias.linear.x, fd_lin.x, epsilon = 1e-5);
        assert_relative_eq!(bias.linear.y, fd_lin.y, epsilon = 1e-5);
        assert!(bias.angular.norm() < 1e-12);
    }

    #[test]
    fn constraint_wrench_subspace_annihilates_motion_subspace() {
        for kind in [
            JointKind::Revolute { axis: z_axis() },
            JointKind::Prismatic {
                axis: Vec3::new(1.0, 0.0, 0.0),
            },
            JointKind::Planar {
                x_axis: Vec3::new(1.0, 0.0, 0.0),
                y_axis: Vec3::new(0.0, 1.0, 0.0),
            },
            JointKind::SinCosRevolute { axis: z_axis() },
        ] {
            let mut q = vec![0.0; kind.nq()];
            kind.zero_configuration(&mut q);
            let s = kind.motion_subspace(AFTER, BEFORE, &q);
            let k = kind.constraint_wrench_subspace(AFTER);
            assert_eq!(k.num_cols(), 6 - kind.nv());
            for ci in 0..k.num_cols() {
                for si in 0..s.num_cols() {
                    let pairing = k.dot_motion(ci, &s.angular[si], &s.linear[si]);
                    assert!(
                        pairing.abs() < 1e-12,
                        "kind {kind:?} column {ci} does not annihilate subspace column {si}"
                    );
                }
            }
        }
    }
}
