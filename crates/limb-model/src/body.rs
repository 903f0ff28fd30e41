//! Rigid bodies.

use limb_contact::ContactPoint;
use limb_math::{FrameId, SpatialInertia};

/// Dense body identifier; the root body is id 0.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct BodyId(pub usize);

impl BodyId {
    pub const ROOT: BodyId = BodyId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A rigid body in the mechanism.
#[derive(Clone, Debug)]
pub struct RigidBody {
    pub id: BodyId,
    pub name: String,
    /// The body's own frame.
    pub frame: FrameId,
    /// Spatial inertia in the body's frame; `None` for the root body.
    pub inertia: Option<SpatialInertia<f64>>,
    /// Frames rigidly attached to this body (its own frame included).
    pub attached_frames: Vec<FrameId>,
    /// Contact points in the body's frame.
    pub contact_points: Vec<ContactPoint>,
}

impl RigidBody {
    pub(crate) fn new(
        id: BodyId,
        name: String,
        frame: FrameId,
        inertia: Option<SpatialInertia<f64>>,
    ) -> Self {
        Self {
            id,
            name,
            frame,
            inertia,
            attached_frames: vec![frame],
            contact_points: Vec::new(),
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.id == BodyId::ROOT
    }
}

/// Frameless mass properties, promoted to a [`SpatialInertia`] in the new
/// body's frame when the body is attached.
#[derive(Clone, Copy, Debug)]
pub struct MassProperties {
    pub mass: f64,
    /// Center of mass in the body frame.
    pub com: limb_math::Vec3<f64>,
    /// Rotational inertia about the center of mass.
    pub moment_about_com: limb_math::Mat3<f64>,
}

impl MassProperties {
    pub fn new(
        mass: f64,
        com: limb_math::Vec3<f64>,
        moment_about_com: limb_math::Mat3<f64>,
    ) -> Self {
        Self {
            mass,
            com,
            moment_about_com,
        }
    }

    /// A point mass at `com`.
    pub fn point_mass(mass: f64, com: limb_math::Vec3<f64>) -> Self {
        Self {
            mass,
            com,
            moment_about_com: limb_math::Mat3::zero(),
        }
    }
}
