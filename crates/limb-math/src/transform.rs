//! Rigid transforms between tagged coordinate frames.

use crate::error::SpatialError;
use crate::frame::FrameId;
use crate::linear::{Mat3, Vec3};
use crate::scalar::Scalar;
use std::ops::Mul;

/// A frameless rigid placement (rotation + translation).
///
/// Promoted to a [`Transform`] once its frames are known, e.g. when a joint
/// is attached and the mechanism allocates the frames involved.
#[derive(Clone, Copy, Debug)]
pub struct Placement<T> {
    pub rot: Mat3<T>,
    pub trans: Vec3<T>,
}

impl<T: Scalar> Placement<T> {
    #[inline]
    pub fn new(rot: Mat3<T>, trans: Vec3<T>) -> Self {
        Self { rot, trans }
    }

    #[inline]
    pub fn identity() -> Self {
        Self {
            rot: Mat3::identity(),
            trans: Vec3::zero(),
        }
    }

    #[inline]
    pub fn translation(trans: Vec3<T>) -> Self {
        Self {
            rot: Mat3::identity(),
            trans,
        }
    }

    #[inline]
    pub fn rotation(rot: Mat3<T>) -> Self {
        Self {
            rot,
            trans: Vec3::zero(),
        }
    }
}

/// A rigid transform mapping coordinates in frame `from` to frame `to`:
/// `p_to = rot * p_from + trans`.
#[derive(Clone, Copy, Debug)]
pub struct Transform<T> {
    pub from: FrameId,
    pub to: FrameId,
    pub rot: Mat3<T>,
    pub trans: Vec3<T>,
}

impl<T: Scalar> Transform<T> {
    #[inline]
    pub fn new(from: FrameId, to: FrameId, rot: Mat3<T>, trans: Vec3<T>) -> Self {
        Self {
            from,
            to,
            rot,
            trans,
        }
    }

    #[inline]
    pub fn identity(frame: FrameId) -> Self {
        Self {
            from: frame,
            to: frame,
            rot: Mat3::identity(),
            trans: Vec3::zero(),
        }
    }

    #[inline]
    pub fn from_placement(from: FrameId, to: FrameId, p: &Placement<T>) -> Self {
        Self {
            from,
            to,
            rot: p.rot,
            trans: p.trans,
        }
    }

    /// Pure rotation about the Z axis.
    pub fn rot_z(from: FrameId, to: FrameId, angle: T) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            from,
            to,
            rot: Mat3::new(c, -s, T::ZERO, s, c, T::ZERO, T::ZERO, T::ZERO, T::ONE),
            trans: Vec3::zero(),
        }
    }

    /// Rotation about an arbitrary unit axis (Rodrigues).
    pub fn rot_axis(from: FrameId, to: FrameId, axis: &Vec3<T>, angle: T) -> Self {
        let (s, c) = angle.sin_cos();
        let ax = crate::skew(axis);
        let rot = Mat3::identity() + ax * s + (ax * ax) * (T::ONE - c);
        Self {
            from,
            to,
            rot,
            trans: Vec3::zero(),
        }
    }

    #[inline]
    pub fn translation(from: FrameId, to: FrameId, trans: Vec3<T>) -> Self {
        Self {
            from,
            to,
            rot: Mat3::identity(),
            trans,
        }
    }

    /// Apply to a point expressed in `from`, yielding `to` coordinates.
    #[inline]
    pub fn transform_point(&self, p: &Vec3<T>) -> Vec3<T> {
        self.rot * *p + self.trans
    }

    /// Inverse transform, swapping the frame tags.
    pub fn inverse(&self) -> Transform<T> {
        let rt = self.rot.transpose();
        Transform {
            from: self.to,
            to: self.from,
            rot: rt,
            trans: -(rt * self.trans),
        }
    }

    /// Checked composition for caller-supplied transforms.
    pub fn try_compose(&self, inner: &Transform<T>) -> Result<Transform<T>, SpatialError> {
        SpatialError::check_frames(self.from, inner.to)?;
        Ok(*self * *inner)
    }

    /// Lift a plain-float transform into this scalar type.
    pub fn from_f64(t: &Transform<f64>) -> Self {
        Self {
            from: t.from,
            to: t.to,
            rot: Mat3::from_f64(&t.rot),
            trans: Vec3::from_f64(&t.trans),
        }
    }
}

/// Composition: `(self * inner)` maps `inner.from` to `self.to`.
impl<T: Scalar> Mul for Transform<T> {
    type Output = Transform<T>;

    #[inline]
    fn mul(self, inner: Transform<T>) -> Transform<T> {
        crate::frame_check!(self.from, inner.to);
        Transform {
            from: inner.from,
            to: self.to,
            rot: self.rot * inner.rot,
            trans: self.rot * inner.trans + self.trans,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const A: FrameId = FrameId::new(1);
    const B: FrameId = FrameId::new(2);
    const C: FrameId = FrameId::new(3);

    fn arb_angle() -> impl Strategy<Value = f64> {
        -std::f64::consts::PI..std::f64::consts::PI
    }

    fn arb_pos() -> impl Strategy<Value = Vec3<f64>> {
        (-10.0..10.0f64, -10.0..10.0f64, -10.0..10.0f64).prop_map(|(x, y, z)| Vec3::new(x, y, z))
    }

    fn arb_axis() -> impl Strategy<Value = Vec3<f64>> {
        (-1.0..1.0f64, -1.0..1.0f64, -1.0..1.0f64)
            .prop_filter("non-zero axis", |(x, y, z)| x * x + y * y + z * z > 0.01)
            .prop_map(|(x, y, z)| {
                let v = Vec3::new(x, y, z);
                v * v.norm().recip()
            })
    }

    fn arb_transform(from: FrameId, to: FrameId) -> impl Strategy<Value = Transform<f64>> {
        (arb_axis(), arb_angle(), arb_pos()).prop_map(move |(axis, angle, pos)| {
            let mut t = Transform::rot_axis(from, to, &axis, angle);
            t.trans = pos;
            t
        })
    }

    proptest! {
        #[test]
        fn compose_with_inverse_is_identity(t in arb_transform(A, B)) {
            let id = t * t.inverse();
            prop_assert_eq!(id.from, B);
            prop_assert_eq!(id.to, B);
            let eye = Mat3::<f64>::identity();
            for i in 0..3 {
                for j in 0..3 {
                    prop_assert!((id.rot[(i, j)] - eye[(i, j)]).abs() < 1e-9);
                }
            }
            prop_assert!(id.trans.norm() < 1e-9);
        }

        #[test]
        fn compose_is_associative(
            ab in arb_transform(A, B),
            bc in arb_transform(B, C),
            p in arb_pos(),
        ) {
            let composed = bc * ab;
            let lhs = composed.transform_point(&p);
            let rhs = bc.transform_point(&ab.transform_point(&p));
            prop_assert!((lhs - rhs).norm() < 1e-9);
        }
    }

    #[test]
    fn try_compose_rejects_mismatched_frames() {
        let ab = Transform::<f64>::identity(A);
        let cb = Transform::<f64>::translation(C, B, Vec3::new(1.0, 0.0, 0.0));
        assert!(cb.try_compose(&ab).is_err());
    }
}
