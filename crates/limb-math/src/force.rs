//! Force-type spatial vectors: wrenches, momenta, and their matrices.

use crate::error::SpatialError;
use crate::frame::FrameId;
use crate::frame_check;
use crate::linear::Vec3;
use crate::scalar::Scalar;
use crate::transform::Transform;
use std::ops::{Add, Neg, Sub};

/// Wrench: torque about the expressed-in frame's origin plus force, acting
/// on `body` with reaction on `base`.
#[derive(Clone, Copy, Debug)]
pub struct Wrench<T> {
    pub body: FrameId,
    pub base: FrameId,
    pub frame: FrameId,
    pub angular: Vec3<T>,
    pub linear: Vec3<T>,
}

impl<T: Scalar> Wrench<T> {
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

    /// Wrench of a point force: torque = p × f about the frame origin.
    #[inline]
    pub fn from_force_at_point(
        body: FrameId,
        base: FrameId,
        frame: FrameId,
        point: &Vec3<T>,
        force: &Vec3<T>,
    ) -> Self {
        Self::new(body, base, frame, point.cross(force), *force)
    }

    /// Re-express in the transform's `to` frame (force rule).
    pub fn transform(&self, tf: &Transform<T>) -> Wrench<T> {
        frame_check!(self.frame, tf.from);
        let linear = tf.rot * self.linear;
        let angular = tf.rot * self.angular + tf.trans.cross(&linear);
        Wrench {
            body: self.body,
            base: self.base,
            frame: tf.to,
            angular,
            linear,
        }
    }

    /// Checked transform for caller-supplied data.
    pub fn try_transform(&self, tf: &Transform<T>) -> Result<Wrench<T>, SpatialError> {
        SpatialError::check_frames(tf.from, self.frame)?;
        Ok(self.transform(tf))
    }

    /// The same wrench viewed as acting on a different body; the numeric
    /// fields are unchanged. Used when accumulating subtree wrenches onto
    /// an inboard body.
    #[inline]
    pub fn applied_to(&self, body: FrameId) -> Wrench<T> {
        Wrench { body, ..*self }
    }
}

impl<T: Scalar> Add for Wrench<T> {
    type Output = Wrench<T>;

    fn add(self, rhs: Wrench<T>) -> Wrench<T> {
        frame_check!(self.frame, rhs.frame);
        frame_check!(self.body, rhs.body);
        frame_check!(self.base, rhs.base);
        Wrench {
            angular: self.angular + rhs.angular,
            linear: self.linear + rhs.linear,
            ..self
        }
    }
}

impl<T: Scalar> Sub for Wrench<T> {
    type Output = Wrench<T>;

    fn sub(self, rhs: Wrench<T>) -> Wrench<T> {
        frame_check!(self.frame, rhs.frame);
        frame_check!(self.body, rhs.body);
        frame_check!(self.base, rhs.base);
        Wrench {
            angular: self.angular - rhs.angular,
            linear: self.linear - rhs.linear,
            ..self
        }
    }
}

impl<T: Scalar> Neg for Wrench<T> {
    type Output = Wrench<T>;

    #[inline]
    fn neg(self) -> Wrench<T> {
        Wrench {
            angular: -self.angular,
            linear: -self.linear,
            ..self
        }
    }
}

/// Momentum: angular momentum about the expressed-in frame's origin plus
/// linear momentum, of `body` relative to `base`.
#[derive(Clone, Copy, Debug)]
pub struct Momentum<T> {
    pub body: FrameId,
    pub base: FrameId,
    pub frame: FrameId,
    pub angular: Vec3<T>,
    pub linear: Vec3<T>,
}

impl<T: Scalar> Momentum<T> {
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

    /// Re-express in the transform's `to` frame (force rule).
    pub fn transform(&self, tf: &Transform<T>) -> Momentum<T> {
        frame_check!(self.frame, tf.from);
        let linear = tf.rot * self.linear;
        let angular = tf.rot * self.angular + tf.trans.cross(&linear);
        Momentum {
            body: self.body,
            base: self.base,
            frame: tf.to,
            angular,
            linear,
        }
    }

    /// Checked transform for caller-supplied data.
    pub fn try_transform(&self, tf: &Transform<T>) -> Result<Momentum<T>, SpatialError> {
        SpatialError::check_frames(tf.from, self.frame)?;
        Ok(self.transform(tf))
    }
}

impl<T: Scalar> Add for Momentum<T> {
    type Output = Momentum<T>;

    fn add(self, rhs: Momentum<T>) -> Momentum<T> {
        frame_check!(self.frame, rhs.frame);
        Momentum {
            angular: self.angular + rhs.angular,
            linear: self.linear + rhs.linear,
            ..self
        }
    }
}

/// A 6×n collection of momentum columns: system momentum per unit velocity
/// coordinate, expressed in `frame`.
#[derive(Clone, Debug)]
pub struct MomentumMatrix<T> {
    pub frame: FrameId,
    pub angular: Vec<Vec3<T>>,
    pub linear: Vec<Vec3<T>>,
}

impl<T: Scalar> MomentumMatrix<T> {
    pub fn zeros(frame: FrameId, cols: usize) -> Self {
        Self {
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

    /// `A * v`: the momentum produced by velocity coordinates `v`.
    pub fn momentum(&self, body: FrameId, base: FrameId, v: &[T]) -> Momentum<T> {
        debug_assert_eq!(v.len(), self.num_cols());
        let mut angular = Vec3::zero();
        let mut linear = Vec3::zero();
        for (i, &vi) in v.iter().enumerate() {
            angular += self.angular[i] * vi;
            linear += self.linear[i] * vi;
        }
        Momentum {
            body,
            base,
            frame: self.frame,
            angular,
            linear,
        }
    }
}

/// A 6×n collection of wrench-basis columns spanning the directions a joint
/// cannot move in. Used to form loop-closure constraints.
#[derive(Clone, Debug)]
pub struct WrenchSubspace<T> {
    pub frame: FrameId,
    pub angular: Vec<Vec3<T>>,
    pub linear: Vec<Vec3<T>>,
}

impl<T: Scalar> WrenchSubspace<T> {
    pub fn new(frame: FrameId) -> Self {
        Self {
            frame,
            angular: Vec::new(),
            linear: Vec::new(),
        }
    }

    #[inline]
    pub fn num_cols(&self) -> usize {
        self.angular.len()
    }

    #[inline]
    pub fn push_col(&mut self, angular: Vec3<T>, linear: Vec3<T>) {
        self.angular.push(angular);
        self.linear.push(linear);
    }

    /// Re-express all columns in the transform's `to` frame (force rule).
    pub fn transform_in_place(&mut self, tf: &Transform<T>) {
        frame_check!(self.frame, tf.from);
        for i in 0..self.num_cols() {
            let linear = tf.rot * self.linear[i];
            let angular = tf.rot * self.angular[i] + tf.trans.cross(&linear);
            self.angular[i] = angular;
            self.linear[i] = linear;
        }
        self.frame = tf.to;
    }

    /// Pairing of column `i` with a motion vector: `k_ang·ω + k_lin·v`.
    pub fn dot_motion(&self, i: usize, angular: &Vec3<T>, linear: &Vec3<T>) -> T {
        self.angular[i].dot(angular) + self.linear[i].dot(linear)
    }
}
