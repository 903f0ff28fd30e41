//! Spatial inertia.

use crate::error::SpatialError;
use crate::force::Momentum;
use crate::frame::FrameId;
use crate::frame_check;
use crate::linear::{Mat3, Vec3};
use crate::motion::Twist;
use crate::scalar::Scalar;
use crate::skew;
use crate::transform::Transform;
use std::ops::Add;

/// Spatial inertia of a rigid body, expressed in `frame`.
///
/// `moment` is the rotational inertia about the frame origin,
/// `first_moment` is mass times the center-of-mass position. Storing the
/// moment about the origin makes same-frame addition a plain field-wise sum.
#[derive(Clone, Copy, Debug)]
pub struct SpatialInertia<T> {
    pub frame: FrameId,
    pub mass: T,
    pub first_moment: Vec3<T>,
    pub moment: Mat3<T>,
}

impl<T: Scalar> SpatialInertia<T> {
    /// Construct from fields; `moment` is symmetrised on input.
    pub fn new(frame: FrameId, mass: T, first_moment: Vec3<T>, moment: Mat3<T>) -> Self {
        Self {
            frame,
            mass,
            first_moment,
            moment: moment.symmetric_part(),
        }
    }

    /// Checked construction: rejects negative mass and non-PSD moments.
    pub fn try_new(
        frame: FrameId,
        mass: T,
        first_moment: Vec3<T>,
        moment: Mat3<T>,
    ) -> Result<Self, SpatialError> {
        if mass.value() < 0.0 {
            return Err(SpatialError::InvalidArgument(format!(
                "negative mass {}",
                mass.value()
            )));
        }
        let m = moment.symmetric_part();
        if !psd_by_value(&m) {
            return Err(SpatialError::InvalidArgument(
                "moment matrix is not positive semidefinite".to_string(),
            ));
        }
        Ok(Self {
            frame,
            mass,
            first_moment,
            moment: m,
        })
    }

    /// From mass, center of mass, and rotational inertia about the center
    /// of mass: parallel-axis shift to the frame origin.
    pub fn from_com(frame: FrameId, mass: T, com: Vec3<T>, moment_about_com: Mat3<T>) -> Self {
        let cx = skew(&com);
        let moment = moment_about_com.symmetric_part() - (cx * cx) * mass;
        Self {
            frame,
            mass,
            first_moment: com * mass,
            moment,
        }
    }

    /// A point mass at `pos`.
    pub fn point_mass(frame: FrameId, mass: T, pos: Vec3<T>) -> Self {
        Self::from_com(frame, mass, pos, Mat3::zero())
    }

    /// Zero inertia (the root body).
    pub fn zero(frame: FrameId) -> Self {
        Self {
            frame,
            mass: T::ZERO,
            first_moment: Vec3::zero(),
            moment: Mat3::zero(),
        }
    }

    /// Center of mass in `frame` coordinates; zero for a massless body.
    pub fn center_of_mass(&self) -> Vec3<T> {
        if self.mass.value().abs() < 1e-12 {
            Vec3::zero()
        } else {
            self.first_moment * self.mass.recip()
        }
    }

    /// Apply to a twist: `h = I * t`.
    pub fn apply(&self, t: &Twist<T>) -> Momentum<T> {
        frame_check!(self.frame, t.frame);
        let (angular, linear) = self.apply_vec(&t.angular, &t.linear);
        Momentum {
            body: t.body,
            base: t.base,
            frame: self.frame,
            angular,
            linear,
        }
    }

    /// Raw application to (angular, linear) motion coordinates.
    ///
    /// `k = J ω + c × v`, `l = m v − c × ω` with `c` the first moment.
    #[inline]
    pub fn apply_vec(&self, angular: &Vec3<T>, linear: &Vec3<T>) -> (Vec3<T>, Vec3<T>) {
        let k = self.moment * *angular + self.first_moment.cross(linear);
        let l = *linear * self.mass - self.first_moment.cross(angular);
        (k, l)
    }

    /// Kinetic energy of a body moving with twist `t`: `1/2 t · (I t)`.
    pub fn kinetic_energy(&self, t: &Twist<T>) -> T {
        frame_check!(self.frame, t.frame);
        let (k, l) = self.apply_vec(&t.angular, &t.linear);
        T::from_f64(0.5) * (t.angular.dot(&k) + t.linear.dot(&l))
    }

    /// Relocate to the transform's `to` frame.
    pub fn transform(&self, tf: &Transform<T>) -> SpatialInertia<T> {
        frame_check!(self.frame, tf.from);
        let r = tf.rot;
        let p = tf.trans;
        let rc = r * self.first_moment;
        let first_moment = rc + p * self.mass;
        let moment = r * self.moment * r.transpose() - skew(&rc) * skew(&p) - skew(&p) * skew(&first_moment);
        SpatialInertia {
            frame: tf.to,
            mass: self.mass,
            first_moment,
            moment,
        }
    }

    /// Checked transform for caller-supplied data.
    pub fn try_transform(&self, tf: &Transform<T>) -> Result<SpatialInertia<T>, SpatialError> {
        SpatialError::check_frames(tf.from, self.frame)?;
        Ok(self.transform(tf))
    }

    /// Lift a plain-float inertia into this scalar type.
    pub fn from_f64(i: &SpatialInertia<f64>) -> Self {
        Self {
            frame: i.frame,
            mass: T::from_f64(i.mass),
            first_moment: Vec3::from_f64(&i.first_moment),
            moment: Mat3::from_f64(&i.moment),
        }
    }
}

impl<T: Scalar> Add for SpatialInertia<T> {
    type Output = SpatialInertia<T>;

    fn add(self, rhs: SpatialInertia<T>) -> SpatialInertia<T> {
        frame_check!(self.frame, rhs.frame);
        SpatialInertia {
            frame: self.frame,
            mass: self.mass + rhs.mass,
            first_moment: self.first_moment + rhs.first_moment,
            moment: self.moment + rhs.moment,
        }
    }
}

/// Positive-semidefiniteness via leading principal minors of the value
/// parts, with a small tolerance for rounding.
fn psd_by_value<T: Scalar>(m: &Mat3<T>) -> bool {
    let a = |i: usize, j: usize| m[(i, j)].value();
    let tol = -1e-10;
    let d1 = a(0, 0);
    let d2 = a(0, 0) * a(1, 1) - a(0, 1) * a(1, 0);
    let d3 = a(0, 0) * (a(1, 1) * a(2, 2) - a(1, 2) * a(2, 1))
        - a(0, 1) * (a(1, 0) * a(2, 2) - a(1, 2) * a(2, 0))
        + a(0, 2) * (a(1, 0) * a(2, 1) - a(1, 1) * a(2, 0));
    d1 >= tol && d2 >= tol && d3 >= tol
}
