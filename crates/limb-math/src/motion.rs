//! Motion-type spatial vectors: twists, spatial accelerations, Jacobians.
//!
//! A motion vector is tagged with three frames: the `body` it describes,
//! the `base` it is measured against, and the `frame` its coordinates are
//! expressed in (reference point = that frame's origin). Additions follow
//! the body/base chain rule; transformations follow the Plücker motion
//! rule.

use crate::error::SpatialError;
use crate::frame::FrameId;
use crate::frame_check;
use crate::linear::Vec3;
use crate::scalar::Scalar;
use crate::transform::Transform;
use std::ops::{Add, Neg, Sub};

/// Twist: spatial velocity of `body` with respect to `base`, expressed in
/// `frame`.
#[derive(Clone, Copy, Debug)]
pub struct Twist<T> {
    pub body: FrameId,
    pub base: FrameId,
    pub frame: FrameId,
    pub angular: Vec3<T>,
    pub linear: Vec3<T>,
}

impl<T: Scalar> Twist<T> {
    #[inline]
    pub fn new(
        body: FrameId,
        base: FrameId,
        frame: FrameId,
        angular: Vec3<T>,
        linear: Vec3<T>,
    ) -> Self {
        Self {
            body,
            base,
            frame,
            angular,
            linear,
        }
    }

    #[inline]
    pub fn zero(body: FrameId, base: FrameId, frame: FrameId) -> Self {
        Self::new(body, base, frame, Vec3::zero(), Vec3::zero())
    }

    /// Re-express in the transform's `to` frame (motion rule).
    pub fn transform(&self, tf: &Transform<T>) -> Twist<T> {
        frame_check!(self.frame, tf.from);
        let angular = tf.rot * self.angular;
        let linear = tf.rot * self.linear + tf.trans.cross(&angular);
        Twist {
            body: self.body,
            base: self.base,
            frame: tf.to,
            angular,
            linear,
        }
    }

    /// Checked transform for caller-supplied data.
    pub fn try_transform(&self, tf: &Transform<T>) -> Result<Twist<T>, SpatialError> {
        SpatialError::check_frames(tf.from, self.frame)?;
        Ok(self.transform(tf))
    }

    /// Spatial cross product with another motion vector, `self ×m other`.
    ///
    /// Result tags follow `other` (the quantity being differentiated).
    pub fn cross(&self, other: &Twist<T>) -> SpatialAcceleration<T> {
        frame_check!(self.frame, other.frame);
        SpatialAcceleration {
            body: other.body,
            base: other.base,
            frame: other.frame,
            angular: self.angular.cross(&other.angular),
            linear: self.angular.cross(&other.linear) + self.linear.cross(&other.angular),
        }
    }

    /// Spatial cross product with a force-type vector, `self ×f other`.
    pub fn cross_force(&self, other: &crate::force::Momentum<T>) -> crate::force::Wrench<T> {
        frame_check!(self.frame, other.frame);
        crate::force::Wrench {
            body: other.body,
            base: other.base,
            frame: other.frame,
            angular: self.angular.cross(&other.angular) + self.linear.cross(&other.linear),
            linear: self.angular.cross(&other.linear),
        }
    }

    /// Velocity of the point at position `p` (in `frame` coordinates).
    #[inline]
    pub fn point_velocity(&self, p: &Vec3<T>) -> Vec3<T> {
        self.linear + self.angular.cross(p)
    }

    /// Power transmitted against a wrench: `ω·τ + v·f`.
    pub fn dot(&self, w: &crate::force::Wrench<T>) -> T {
        frame_check!(self.frame, w.frame);
        self.angular.dot(&w.angular) + self.linear.dot(&w.linear)
    }
}

/// Chain rule: `(b wrt a) + (c wrt b) = (c wrt a)`.
impl<T: Scalar> Add for Twist<T> {
    type Output = Twist<T>;

    fn add(self, rhs: Twist<T>) -> Twist<T> {
        frame_check!(self.frame, rhs.frame);
        frame_check!(self.body, rhs.base);
        Twist {
            body: rhs.body,
            base: self.base,
            frame: self.frame,
            angular: self.angular + rhs.angular,
            linear: self.linear + rhs.linear,
        }
    }
}

/// Common-base difference: `(b wrt w) - (a wrt w) = (b wrt a)`.
impl<T: Scalar> Sub for Twist<T> {
    type Output = Twist<T>;

    fn sub(self, rhs: Twist<T>) -> Twist<T> {
        frame_check!(self.frame, rhs.frame);
        frame_check!(self.base, rhs.base);
        Twist {
            body: self.body,
            base: rhs.body,
            frame: self.frame,
            angular: self.angular - rhs.angular,
            linear: self.linear - rhs.linear,
        }
    }
}

impl<T: Scalar> Neg for Twist<T> {
    type Output = Twist<T>;

    #[inline]
    fn neg(self) -> Twist<T> {
        Twist {
            body: self.base,
            base: self.body,
            frame: self.frame,
            angular: -self.angular,
            linear: -self.linear,
        }
    }
}

/// Spatial acceleration, tagged like a twist.
#[derive(Clone, Copy, Debug)]
pub struct SpatialAcceleration<T> {
    pub body: FrameId,
    pub base: FrameId,
    pub frame: FrameId,
    pub angular: Vec3<T>,
    pub linear: Vec3<T>,
}

impl<T: Scalar> SpatialAcceleration<T> {
    #[inline]
    pub fn new(
        body: FrameId,
        base: FrameId,
        frame: FrameId,
        angular: Vec3<T>,
        linear: Vec3<T>,
    ) -> Self {
        Self {
            body,
            base,
            frame,
            angular,
            linear,
        }
    }

    #[inline]
    pub fn zero(body: FrameId, base: FrameId, frame: FrameId) -> Self {
        Self::new(body, base, frame, Vec3::zero(), Vec3::zero())
    }

    /// Coordinate re-expression (motion rule). Velocity-dependent terms of
    /// a moving target frame are the caller's responsibility; the kinematic
    /// recursions add them explicitly.
    pub fn transform(&self, tf: &Transform<T>) -> SpatialAcceleration<T> {
        frame_check!(self.frame, tf.from);
        let angular = tf.rot * self.angular;
        let linear = tf.rot * self.linear + tf.trans.cross(&angular);
        SpatialAcceleration {
            body: self.body,
            base: self.base,
            frame: tf.to,
            angular,
            linear,
        }
    }
}

impl<T: Scalar> Add for SpatialAcceleration<T> {
    type Output = SpatialAcceleration<T>;

    fn add(self, rhs: SpatialAcceleration<T>) -> SpatialAcceleration<T> {
        frame_check!(self.frame, rhs.frame);
        frame_check!(self.body, rhs.base);
        SpatialAcceleration {
            body: rhs.body,
            base: self.base,
            frame: self.frame,
            angular: self.angular + rhs.angular,
            linear: self.linear + rhs.linear,
        }
    }
}

impl<T: Scalar> Sub for SpatialAcceleration<T> {
    type Output = SpatialAcceleration<T>;

    fn sub(self, rhs: SpatialAcceleration<T>) -> SpatialAcceleration<T> {
        frame_check!(self.frame, rhs.frame);
        frame_check!(self.base, rhs.base);
        SpatialAcceleration {
            body: self.body,
            base: rhs.body,
            frame: self.frame,
            angular: self.angular - rhs.angular,
            linear: self.linear - rhs.linear,
        }
    }
}

/// A 6×n collection of motion columns: the twist of `body` with respect to
/// `base` per unit velocity coordinate, expressed in `frame`.
#[derive(Clone, Debug)]
pub struct GeometricJacobian<T> {
    pub body: FrameId,
    pub base: FrameId,
    pub frame: FrameId,
    pub angular: Vec<Vec3<T>>,
    pub linear: Vec<Vec3<T>>,
}

impl<T: Scalar> GeometricJacobian<T> {
    pub fn zeros(body: FrameId, base: FrameId, frame: FrameId, cols: usize) -> Self {
        Self {
            body,
            base,
            frame,
            angular: vec![Vec3::zero(); cols],
            linear: vec![Vec3::zero(); cols],
        }
    }

    #[inline]
    pub fn num_cols(&self) -> usize {
        self.angular.len()
    }

    #[inline]
    pub fn set_col(&mut self, i: usize, angular: Vec3<T>, linear: Vec3<T>) {
        self.angular[i] = angular;
        self.linear[i] = linear;
    }

    /// `J * v`: the twist produced by velocity coordinates `v`.
    pub fn twist(&self, v: &[T]) -> Twist<T> {
        debug_assert_eq!(v.len(), self.num_cols());
        let mut angular = Vec3::zero();
        let mut linear = Vec3::zero();
        for (i, &vi) in v.iter().enumerate() {
            angular += self.angular[i] * vi;
            linear += self.linear[i] * vi;
        }
        Twist {
            body: self.body,
            base: self.base,
            frame: self.frame,
            angular,
            linear,
        }
    }

    /// `J^T * w`: torque coordinates produced by a wrench.
    pub fn joint_torque(&self, w: &crate::force::Wrench<T>, out: &mut [T]) {
        frame_check!(self.frame, w.frame);
        debug_assert_eq!(out.len(), self.num_cols());
        for i in 0..self.num_cols() {
            out[i] = self.angular[i].dot(&w.angular) + self.linear[i].dot(&w.linear);
        }
    }

    /// Re-express all columns in the transform's `to` frame, in place.
    pub fn transform_in_place(&mut self, tf: &Transform<T>) {
        frame_check!(self.frame, tf.from);
        for i in 0..self.num_cols() {
            let angular = tf.rot * self.angular[i];
            let linear = tf.rot * self.linear[i] + tf.trans.cross(&angular);
            self.angular[i] = angular;
            self.linear[i] = linear;
        }
        self.frame = tf.to;
    }

    /// Checked, allocating transform for caller-supplied frames.
    pub fn try_transform(&self, tf: &Transform<T>) -> Result<GeometricJacobian<T>, SpatialError> {
        SpatialError::check_frames(tf.from, self.frame)?;
        let mut out = self.clone();
        out.transform_in_place(tf);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Transform;

    const W: FrameId = FrameId::new(0);
    const A: FrameId = FrameId::new(1);
    const B: FrameId = FrameId::new(2);
    const C: FrameId = FrameId::new(3);

    #[test]
    fn twist_addition_chains_bodies() {
        let ab = Twist::new(
            A,
            W,
            W,
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 0.0),
        );
        let bc = Twist::new(
            B,
            A,
            W,
            Vec3::new(0.0, 0.0, 0.5),
            Vec3::new(1.0, 0.0, 0.0),
        );
        let ac = ab + bc;
        assert_eq!(ac.body, B);
        assert_eq!(ac.base, W);
        assert!((ac.angular.z - 1.5).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "frame mismatch")]
    fn transform_rejects_wrong_expressed_in_frame() {
        // Transform maps B -> A; the twist is expressed in C.
        let tf = Transform::<f64>::translation(B, A, Vec3::new(1.0, 0.0, 0.0));
        let tw = Twist::new(A, W, C, Vec3::zero(), Vec3::new(1.0, 0.0, 0.0));
        let _ = tw.transform(&tf);
    }

    #[test]
    fn pure_rotation_twist_gives_tangential_point_velocity() {
        let tw = Twist::new(
            A,
            W,
            W,
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(0.0, 0.0, 0.0),
        );
        let v = tw.point_velocity(&Vec3::new(1.0, 0.0, 0.0));
        assert!((v.y - 2.0).abs() < 1e-12 && v.x.abs() < 1e-12);
    }

    #[test]
    fn translated_transform_shifts_moment() {
        // Rotation about Z at the origin of A, re-expressed in a frame
        // whose origin sits at (-1, 0, 0) in A: the point there moves in -y.
        let tw = Twist::new(
            A,
            W,
            A,
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 0.0),
        );
        let tf = Transform::translation(A, B, Vec3::new(1.0, 0.0, 0.0));
        let out = tw.transform(&tf);
        assert!((out.linear.y + 1.0).abs() < 1e-12);
        assert_eq!(out.frame, B);
    }

    #[test]
    fn jacobian_times_velocity_matches_column_sum() {
        let mut jac = GeometricJacobian::zeros(A, W, W, 2);
        jac.set_col(0, Vec3::new(0.0, 0.0, 1.0), Vec3::zero());
        jac.set_col(1, Vec3::zero(), Vec3::new(1.0, 0.0, 0.0));
        let tw = jac.twist(&[2.0, 3.0]);
        assert!((tw.angular.z - 2.0).abs() < 1e-12);
        assert!((tw.linear.x - 3.0).abs() < 1e-12);
    }
}
