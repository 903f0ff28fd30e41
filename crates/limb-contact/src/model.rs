//! Contact point and force-law definitions.

use limb_math::{Scalar, Vec3};

/// Hunt-Crossley normal force: `f_n = z^(3/2) * (k + lambda * z_dot)`,
/// clamped at zero so the surface never pulls.
#[derive(Clone, Copy, Debug)]
pub struct HuntCrossley {
    /// Hertz stiffness (N/m^(3/2)).
    pub stiffness: f64,
    /// Dissipation coefficient (N·s/m^(5/2)).
    pub dissipation: f64,
}

impl HuntCrossley {
    pub fn new(stiffness: f64, dissipation: f64) -> Self {
        Self {
            stiffness,
            dissipation,
        }
    }

    /// Hertzian contact with dissipation parameter `alpha`:
    /// `lambda = 3/2 * alpha * k`.
    pub fn hertz(stiffness: f64, alpha: f64) -> Self {
        Self {
            stiffness,
            dissipation: 1.5 * alpha * stiffness,
        }
    }

    /// Normal force magnitude for penetration `z >= 0` and penetration rate
    /// `z_dot` (positive while penetrating deeper).
    pub fn normal_force<T: Scalar>(&self, z: T, z_dot: T) -> T {
        let zn = z * z.sqrt();
        let f = zn * (T::from_f64(self.stiffness) + T::from_f64(self.dissipation) * z_dot);
        f.max(T::ZERO)
    }
}

/// Viscoelastic Coulomb friction: a bristle spring-damper whose force is
/// capped at `mu * f_n`. State is the 3-vector bristle displacement.
#[derive(Clone, Copy, Debug)]
pub struct ViscoelasticCoulomb {
    /// Friction coefficient.
    pub mu: f64,
    /// Bristle stiffness (N/m).
    pub stiffness: f64,
    /// Bristle damping (N·s/m).
    pub damping: f64,
}

impl ViscoelasticCoulomb {
    pub const STATE_DIM: usize = 3;

    pub fn new(mu: f64, stiffness: f64, damping: f64) -> Self {
        Self {
            mu,
            stiffness,
            damping,
        }
    }

    /// Friction force for a contact carrying normal force `normal_force`,
    /// with world-frame tangential velocity `tangential_velocity` and
    /// bristle state `state`. Writes the bristle state rate to
    /// `state_rate`.
    pub fn friction_force<T: Scalar>(
        &self,
        normal_force: T,
        tangential_velocity: &Vec3<T>,
        state: &[T],
        state_rate: &mut [T],
    ) -> Vec3<T> {
        debug_assert_eq!(state.len(), Self::STATE_DIM);
        debug_assert_eq!(state_rate.len(), Self::STATE_DIM);
        let k = T::from_f64(self.stiffness);
        let b = T::from_f64(self.damping);
        let s = Vec3::new(state[0], state[1], state[2]);

        let desired = -(s * k + *tangential_velocity * b);
        let limit = T::from_f64(self.mu) * normal_force;
        let mag = desired.norm();

        let (force, rate) = if mag.value() <= limit.value() {
            // Sticking: the bristle stretches with the slip velocity.
            (desired, *tangential_velocity)
        } else {
            // Sliding: scale onto the friction cone and move the bristle so
            // the spring-damper stays consistent with the applied force.
            let force = desired * (limit / mag);
            let rate = -(force + s * k) * b.recip();
            (force, rate)
        };

        state_rate[0] = rate.x;
        state_rate[1] = rate.y;
        state_rate[2] = rate.z;
        force
    }

    /// Bristle relaxation while out of contact: the spring discharges
    /// through the damper.
    pub fn relax<T: Scalar>(&self, state: &[T], state_rate: &mut [T]) {
        let decay = T::from_f64(self.stiffness / self.damping);
        for i in 0..Self::STATE_DIM {
            state_rate[i] = -state[i] * decay;
        }
    }
}

/// A point contact model: normal law plus friction law.
#[derive(Clone, Copy, Debug)]
pub struct ContactModel {
    pub normal: HuntCrossley,
    pub friction: ViscoelasticCoulomb,
}

impl ContactModel {
    pub fn new(normal: HuntCrossley, friction: ViscoelasticCoulomb) -> Self {
        Self { normal, friction }
    }

    /// Size of the per-point state owned by the mechanism state.
    pub fn state_dim(&self) -> usize {
        ViscoelasticCoulomb::STATE_DIM
    }

    pub fn zero_state<T: Scalar>(&self, state: &mut [T]) {
        state.fill(T::ZERO);
    }

    /// Total world-frame contact force for a penetrating point.
    ///
    /// `penetration >= 0`, `penetration_rate` positive while deepening,
    /// `normal` the outward surface normal, `tangential_velocity` the slip
    /// velocity. Writes the state rate.
    pub fn contact_force<T: Scalar>(
        &self,
        penetration: T,
        penetration_rate: T,
        normal: &Vec3<T>,
        tangential_velocity: &Vec3<T>,
        state: &[T],
        state_rate: &mut [T],
    ) -> Vec3<T> {
        let f_n = self.normal.normal_force(penetration, penetration_rate);
        let f_t = self
            .friction
            .friction_force(f_n, tangential_velocity, state, state_rate);
        *normal * f_n + f_t
    }
}

impl Default for ContactModel {
    fn default() -> Self {
        Self {
            normal: HuntCrossley::hertz(50e3, 0.2),
            friction: ViscoelasticCoulomb::new(0.8, 20e3, 100.0),
        }
    }
}

/// A contact point fixed to a rigid body, located in the body's frame.
#[derive(Clone, Copy, Debug)]
pub struct ContactPoint {
    pub location: Vec3<f64>,
    pub model: ContactModel,
}

impl ContactPoint {
    pub fn new(location: Vec3<f64>, model: ContactModel) -> Self {
        Self { location, model }
    }
}

/// An environment half-space: points with `normal · (p - point) < 0` are
/// penetrating.
#[derive(Clone, Copy, Debug)]
pub struct HalfSpace {
    pub point: Vec3<f64>,
    pub normal: Vec3<f64>,
}

impl HalfSpace {
    /// `normal` must be unit length.
    pub fn new(point: Vec3<f64>, normal: Vec3<f64>) -> Self {
        Self { point, normal }
    }

    /// The ground plane z = 0 with +z outward.
    pub fn ground() -> Self {
        Self {
            point: Vec3::zero(),
            normal: Vec3::new(0.0, 0.0, 1.0),
        }
    }

    /// Penetration depth of a point; positive inside the surface.
    pub fn penetration<T: Scalar>(&self, p: &Vec3<T>) -> T {
        let n = Vec3::<T>::from_f64(&self.normal);
        let anchor = Vec3::<T>::from_f64(&self.point);
        n.dot(&(anchor - *p))
    }
}
