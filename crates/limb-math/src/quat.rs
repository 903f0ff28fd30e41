//! Quaternion utilities for 3D rotations.
//!
//! Convention: q = [w; x; y; z] where w is the scalar part. A quaternion
//! here represents the orientation of a child frame in its parent: its
//! rotation matrix maps child coordinates to parent coordinates.

use crate::linear::{Mat3, Vec3};
use crate::scalar::Scalar;

/// A unit quaternion representing a 3D rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat<T> {
    /// Scalar part (w).
    pub w: T,
    /// Vector part (x, y, z).
    pub v: Vec3<T>,
}

impl<T: Scalar> Quat<T> {
    #[inline]
    pub fn new(w: T, x: T, y: T, z: T) -> Self {
        Self {
            w,
            v: Vec3::new(x, y, z),
        }
    }

    #[inline]
    pub fn identity() -> Self {
        Self {
            w: T::ONE,
            v: Vec3::zero(),
        }
    }

    /// From axis-angle; `axis` must be unit length.
    pub fn from_axis_angle(axis: &Vec3<T>, angle: T) -> Self {
        let half = angle * T::from_f64(0.5);
        let (s, c) = half.sin_cos();
        Self { w: c, v: *axis * s }
    }

    #[inline]
    pub fn norm(&self) -> T {
        (self.w * self.w + self.v.norm_sq()).sqrt()
    }

    pub fn normalize(&self) -> Self {
        let n = self.norm();
        if n.value() < 1e-12 {
            return Self::identity();
        }
        let inv = n.recip();
        Self {
            w: self.w * inv,
            v: self.v * inv,
        }
    }

    /// Hamilton product `self * other`.
    pub fn mul(&self, other: &Quat<T>) -> Quat<T> {
        Quat {
            w: self.w * other.w - self.v.dot(&other.v),
            v: self.v.cross(&other.v) + other.v * self.w + self.v * other.w,
        }
    }

    /// Conjugate (inverse for unit quaternions).
    #[inline]
    pub fn conjugate(&self) -> Quat<T> {
        Quat {
            w: self.w,
            v: -self.v,
        }
    }

    /// Rotation matrix (child coordinates to parent coordinates).
    pub fn to_matrix(&self) -> Mat3<T> {
        let two = T::from_f64(2.0);
        let w = self.w;
        let x = self.v.x;
        let y = self.v.y;
        let z = self.v.z;

        let x2 = x * x;
        let y2 = y * y;
        let z2 = z * z;
        let xy = x * y;
        let xz = x * z;
        let yz = y * z;
        let wx = w * x;
        let wy = w * y;
        let wz = w * z;

        Mat3::new(
            T::ONE - two * (y2 + z2),
            two * (xy - wz),
            two * (xz + wy),
            two * (xy + wz),
            T::ONE - two * (x2 + z2),
            two * (yz - wx),
            two * (xz - wy),
            two * (yz + wx),
            T::ONE - two * (x2 + y2),
        )
    }

    /// Rotation matrix to quaternion, Shepperd's method.
    pub fn from_matrix(m: &Mat3<T>) -> Quat<T> {
        let quarter = T::from_f64(0.25);
        let two = T::from_f64(2.0);
        let trace = m.trace();

        if trace > T::ZERO {
            let s = (trace + T::ONE).sqrt() * two; // s = 4w
            Quat {
                w: quarter * s,
                v: Vec3::new(
                    (m[(2, 1)] - m[(1, 2)]) / s,
                    (m[(0, 2)] - m[(2, 0)]) / s,
                    (m[(1, 0)] - m[(0, 1)]) / s,
                ),
            }
        } else if m[(0, 0)] > m[(1, 1)] && m[(0, 0)] > m[(2, 2)] {
            let s = (T::ONE + m[(0, 0)] - m[(1, 1)] - m[(2, 2)]).sqrt() * two; // s = 4x
            Quat {
                w: (m[(2, 1)] - m[(1, 2)]) / s,
                v: Vec3::new(
                    quarter * s,
                    (m[(0, 1)] + m[(1, 0)]) / s,
                    (m[(0, 2)] + m[(2, 0)]) / s,
                ),
            }
        } else if m[(1, 1)] > m[(2, 2)] {
            let s = (T::ONE + m[(1, 1)] - m[(0, 0)] - m[(2, 2)]).sqrt() * two; // s = 4y
            Quat {
                w: (m[(0, 2)] - m[(2, 0)]) / s,
                v: Vec3::new(
                    (m[(0, 1)] + m[(1, 0)]) / s,
                    quarter * s,
                    (m[(1, 2)] + m[(2, 1)]) / s,
                ),
            }
        } else {
            let s = (T::ONE + m[(2, 2)] - m[(0, 0)] - m[(1, 1)]).sqrt() * two; // s = 4z
            Quat {
                w: (m[(1, 0)] - m[(0, 1)]) / s,
                v: Vec3::new(
                    (m[(0, 2)] + m[(2, 0)]) / s,
                    (m[(1, 2)] + m[(2, 1)]) / s,
                    quarter * s,
                ),
            }
        }
    }

    /// Quaternion rate from a child-frame angular velocity:
    /// `q_dot = 1/2 q ⊗ (0, omega)`. Returned as `[w_dot, x_dot, y_dot, z_dot]`.
    pub fn rate(&self, omega: &Vec3<T>) -> [T; 4] {
        let half = T::from_f64(0.5);
        let pure = Quat {
            w: T::ZERO,
            v: *omega,
        };
        let d = self.mul(&pure);
        [d.w * half, d.v.x * half, d.v.y * half, d.v.z * half]
    }

    /// Child-frame angular velocity from a quaternion rate:
    /// `omega = 2 vec(q* ⊗ q_dot)` for unit `q`.
    pub fn angular_velocity(&self, q_dot: &[T; 4]) -> Vec3<T> {
        let two = T::from_f64(2.0);
        let d = Quat {
            w: q_dot[0],
            v: Vec3::new(q_dot[1], q_dot[2], q_dot[3]),
        };
        let w = self.conjugate().mul(&d);
        w.v * two
    }
}
