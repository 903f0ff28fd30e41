//! Mechanism state: generalized coordinates plus lazily evaluated,
//! explicitly invalidated kinematic caches.
//!
//! A state is built once per (mechanism, scalar type); the mechanism's
//! numeric parameters are converted to the state's scalar at construction.
//! Mutators flip the minimal set of validity bits; `ensure_*` walks the
//! tree root-to-leaves and recomputes a cache only when its bit is clear.
//! A valid entry is never recomputed without an intervening invalidation.

use crate::body::BodyId;
use crate::error::ModelError;
use crate::joint::{JointId, JointKind};
use crate::mechanism::Mechanism;
use crate::seg::SegmentedVec;
use limb_contact::ContactModel;
use limb_math::{
    FrameId, GeometricJacobian, Scalar, SpatialAcceleration, SpatialInertia, Transform, Twist,
    Vec3,
};
use rand::Rng;
use std::ops::Range;

/// The cached quantities, one validity bit each.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CacheKind {
    JointTransforms,
    TransformsToRoot,
    MotionSubspaces,
    Twists,
    BiasAccelerations,
    InertiasInWorld,
    CrbInertias,
}

impl CacheKind {
    #[inline]
    const fn bit(self) -> u32 {
        match self {
            CacheKind::JointTransforms => 1 << 0,
            CacheKind::TransformsToRoot => 1 << 1,
            CacheKind::MotionSubspaces => 1 << 2,
            CacheKind::Twists => 1 << 3,
            CacheKind::BiasAccelerations => 1 << 4,
            CacheKind::InertiasInWorld => 1 << 5,
            CacheKind::CrbInertias => 1 << 6,
        }
    }
}

const ALL_CONFIG_DEPENDENT: u32 = CacheKind::JointTransforms.bit()
    | CacheKind::TransformsToRoot.bit()
    | CacheKind::MotionSubspaces.bit()
    | CacheKind::Twists.bit()
    | CacheKind::BiasAccelerations.bit()
    | CacheKind::InertiasInWorld.bit()
    | CacheKind::CrbInertias.bit();

const VELOCITY_DEPENDENT: u32 = CacheKind::Twists.bit() | CacheKind::BiasAccelerations.bit();

/// A contact point flattened into state order, with its slice of the
/// additional-state buffer.
#[derive(Clone, Debug)]
pub struct StateContactPoint<T> {
    /// Body index the point is fixed to.
    pub body: usize,
    /// Location in the body's frame.
    pub location: Vec3<T>,
    pub model: ContactModel,
    /// This point's slice of the additional-state buffer.
    pub state_range: Range<usize>,
}

/// Generalized coordinates and cached spatial quantities for one mechanism
/// under one scalar type.
pub struct MechanismState<T: Scalar> {
    mechanism_id: u64,
    generation: u64,
    world: FrameId,

    // Topology and parameters, converted to T once at construction.
    kinds: Vec<JointKind<T>>,
    joint_frames: Vec<(FrameId, FrameId)>,
    before_poses: Vec<Transform<T>>,
    predecessors: Vec<usize>,
    body_frames: Vec<FrameId>,
    body_inertias: Vec<SpatialInertia<T>>,
    gravity: Vec3<T>,
    contact_points: Vec<StateContactPoint<T>>,

    // Generalized coordinates and additional (contact) state.
    q: SegmentedVec<T>,
    v: SegmentedVec<T>,
    s: Vec<T>,

    // Caches, one entry per joint or per body.
    joint_transforms: Vec<Transform<T>>,
    transforms_to_root: Vec<Transform<T>>,
    motion_subspaces: Vec<GeometricJacobian<T>>,
    twists: Vec<Twist<T>>,
    bias_accelerations: Vec<SpatialAcceleration<T>>,
    inertias_in_world: Vec<SpatialInertia<T>>,
    crb_inertias: Vec<SpatialInertia<T>>,
    valid: u32,
}

impl<T: Scalar> MechanismState<T> {
    pub fn new(mechanism: &Mechanism) -> Self {
        let world = mechanism.world_frame();
        let nb = mechanism.num_bodies();
        let joints = mechanism.tree_joints();

        let kinds: Vec<JointKind<T>> = joints.iter().map(|j| j.kind.cast()).collect();
        let joint_frames: Vec<(FrameId, FrameId)> = joints
            .iter()
            .map(|j| (j.frame_before, j.frame_after))
            .collect();
        let before_poses: Vec<Transform<T>> = (0..joints.len())
            .map(|j| Transform::from_f64(mechanism.before_pose(JointId(j))))
            .collect();
        let predecessors: Vec<usize> = (0..joints.len())
            .map(|j| mechanism.predecessor(JointId(j)).expect("tree joint").index())
            .collect();
        let body_frames: Vec<FrameId> = mechanism.bodies().iter().map(|b| b.frame).collect();
        let body_inertias: Vec<SpatialInertia<T>> = mechanism
            .bodies()
            .iter()
            .map(|b| match &b.inertia {
                Some(i) => SpatialInertia::from_f64(i),
                None => SpatialInertia::zero(b.frame),
            })
            .collect();

        let mut contact_points = Vec::new();
        let mut s_len = 0;
        for body in mechanism.bodies() {
            for p in &body.contact_points {
                let dim = p.model.state_dim();
                contact_points.push(StateContactPoint {
                    body: body.id.index(),
                    location: Vec3::from_f64(&p.location),
                    model: p.model,
                    state_range: s_len..s_len + dim,
                });
                s_len += dim;
            }
        }

        let mut q = SegmentedVec::from_widths(joints.iter().map(|j| j.nq()));
        let v = SegmentedVec::from_widths(joints.iter().map(|j| j.nv()));
        for (j, kind) in kinds.iter().enumerate() {
            kind.zero_configuration(q.segment_mut(JointId(j)));
        }

        let joint_transforms = (0..joints.len())
            .map(|j| Transform::identity(joint_frames[j].1))
            .collect();
        let transforms_to_root = body_frames
            .iter()
            .map(|&f| Transform::identity(f))
            .collect();
        let motion_subspaces = (0..joints.len())
            .map(|j| {
                GeometricJacobian::zeros(
                    joint_frames[j].1,
                    body_frames[predecessors[j]],
                    world,
                    kinds[j].nv(),
                )
            })
            .collect();
        let twists = body_frames
            .iter()
            .map(|&f| Twist::zero(f, world, world))
            .collect();
        let bias_accelerations = body_frames
            .iter()
            .map(|&f| SpatialAcceleration::zero(f, world, world))
            .collect();
        let inertias_in_world: Vec<SpatialInertia<T>> =
            (0..nb).map(|_| SpatialInertia::zero(world)).collect();
        let crb_inertias = inertias_in_world.clone();

        Self {
            mechanism_id: mechanism.id(),
            generation: mechanism.generation(),
            world,
            kinds,
            joint_frames,
            before_poses,
            predecessors,
            body_frames,
            body_inertias,
            gravity: Vec3::from_f64(&mechanism.gravity()),
            contact_points,
            q,
            v,
            s: vec![T::ZERO; s_len],
            joint_transforms,
            transforms_to_root,
            motion_subspaces,
            twists,
            bias_accelerations,
            inertias_in_world,
            crb_inertias,
            valid: 0,
        }
    }

    /// Fail with `StaleState` when this state was built for a different
    /// mechanism or an older topology generation.
    pub fn check_compatible(&self, mechanism: &Mechanism) -> Result<(), ModelError> {
        if self.mechanism_id != mechanism.id() || self.generation != mechanism.generation() {
            Err(ModelError::StaleState)
        } else {
            Ok(())
        }
    }

    // ── Coordinate access and mutation ──

    #[inline]
    pub fn configuration(&self) -> &SegmentedVec<T> {
        &self.q
    }

    #[inline]
    pub fn velocity(&self) -> &SegmentedVec<T> {
        &self.v
    }

    #[inline]
    pub fn additional_state(&self) -> &[T] {
        &self.s
    }

    #[inline]
    pub fn num_positions(&self) -> usize {
        self.q.len()
    }

    #[inline]
    pub fn num_velocities(&self) -> usize {
        self.v.len()
    }

    #[inline]
    pub fn num_bodies(&self) -> usize {
        self.body_frames.len()
    }

    #[inline]
    pub fn num_joints(&self) -> usize {
        self.kinds.len()
    }

    pub fn set_configuration(&mut self, q: &[T]) -> Result<(), ModelError> {
        self.q.copy_from_slice(q)?;
        self.valid &= !ALL_CONFIG_DEPENDENT;
        Ok(())
    }

    pub fn set_velocity(&mut self, v: &[T]) -> Result<(), ModelError> {
        self.v.copy_from_slice(v)?;
        self.valid &= !VELOCITY_DEPENDENT;
        Ok(())
    }

    /// Contact and other application-defined state; no kinematic cache
    /// depends on it.
    pub fn set_additional_state(&mut self, s: &[T]) -> Result<(), ModelError> {
        if s.len() != self.s.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.s.len(),
                got: s.len(),
            });
        }
        self.s.copy_from_slice(s);
        Ok(())
    }

    pub fn set_joint_configuration(&mut self, joint: JointId, q: &[T]) -> Result<(), ModelError> {
        let seg = self
            .q
            .ranges()
            .get(joint.index())
            .cloned()
            .ok_or_else(|| ModelError::Topology(format!("unknown joint id {}", joint.index())))?;
        if q.len() != seg.len() {
            return Err(ModelError::DimensionMismatch {
                expected: seg.len(),
                got: q.len(),
            });
        }
        self.q.segment_mut(joint).copy_from_slice(q);
        self.valid &= !ALL_CONFIG_DEPENDENT;
        Ok(())
    }

    pub fn set_joint_velocity(&mut self, joint: JointId, v: &[T]) -> Result<(), ModelError> {
        let seg = self
            .v
            .ranges()
            .get(joint.index())
            .cloned()
            .ok_or_else(|| ModelError::Topology(format!("unknown joint id {}", joint.index())))?;
        if v.len() != seg.len() {
            return Err(ModelError::DimensionMismatch {
                expected: seg.len(),
                got: v.len(),
            });
        }
        self.v.segment_mut(joint).copy_from_slice(v);
        self.valid &= !VELOCITY_DEPENDENT;
        Ok(())
    }

    /// Identity configuration, zero velocity, zero contact state.
    pub fn zero(&mut self) {
        self.zero_configuration();
        self.zero_velocity();
        for p in &self.contact_points {
            p.model.zero_state(&mut self.s[p.state_range.clone()]);
        }
    }

    pub fn zero_configuration(&mut self) {
        for j in 0..self.kinds.len() {
            let kind = self.kinds[j].clone();
            kind.zero_configuration(self.q.segment_mut(JointId(j)));
        }
        self.valid &= !ALL_CONFIG_DEPENDENT;
    }

    pub fn zero_velocity(&mut self) {
        self.v.fill(T::ZERO);
        self.valid &= !VELOCITY_DEPENDENT;
    }

    /// Random configuration and velocity, for tests and sampling.
    pub fn randomize(&mut self, rng: &mut impl Rng) {
        for j in 0..self.kinds.len() {
            let kind = self.kinds[j].clone();
            kind.rand_configuration(self.q.segment_mut(JointId(j)), rng);
        }
        for i in 0..self.v.len() {
            self.v[i] = T::from_f64(rng.gen_range(-1.0..1.0));
        }
        self.valid = 0;
    }

    /// Project every joint configuration onto its valid manifold.
    pub fn normalize_configuration(&mut self) {
        for j in 0..self.kinds.len() {
            let kind = self.kinds[j].clone();
            kind.normalize_configuration(self.q.segment_mut(JointId(j)));
        }
        self.valid &= !ALL_CONFIG_DEPENDENT;
    }

    // ── Cache updates ──

    #[inline]
    pub fn cache_valid(&self, kind: CacheKind) -> bool {
        self.valid & kind.bit() != 0
    }

    pub fn ensure_joint_transforms(&mut self) {
        if self.cache_valid(CacheKind::JointTransforms) {
            return;
        }
        for j in 0..self.kinds.len() {
            let (before, after) = self.joint_frames[j];
            self.joint_transforms[j] =
                self.kinds[j].joint_transform(after, before, self.q.segment(JointId(j)));
        }
        self.valid |= CacheKind::JointTransforms.bit();
    }

    pub fn ensure_transforms_to_root(&mut self) {
        if self.cache_valid(CacheKind::TransformsToRoot) {
            return;
        }
        self.ensure_joint_transforms();
        self.transforms_to_root[0] = Transform::identity(self.world);
        for j in 0..self.kinds.len() {
            let succ = j + 1;
            let pred = self.predecessors[j];
            self.transforms_to_root[succ] =
                self.transforms_to_root[pred] * self.before_poses[j] * self.joint_transforms[j];
        }
        self.valid |= CacheKind::TransformsToRoot.bit();
    }

    /// World-frame motion subspaces. The base tag is the predecessor body's
    /// frame: the joint's `frame_before` is rigidly attached to it, so the
    /// relative twist is unchanged by the relabeling.
    pub fn ensure_motion_subspaces(&mut self) {
        if self.cache_valid(CacheKind::MotionSubspaces) {
            return;
        }
        self.ensure_transforms_to_root();
        for j in 0..self.kinds.len() {
            let succ = j + 1;
            let pred = self.predecessors[j];
            let (_, after) = self.joint_frames[j];
            let jac = &mut self.motion_subspaces[j];
            jac.body = self.body_frames[succ];
            jac.base = self.body_frames[pred];
            jac.frame = after;
            self.kinds[j].motion_subspace_into(self.q.segment(JointId(j)), jac);
            jac.transform_in_place(&self.transforms_to_root[succ]);
        }
        self.valid |= CacheKind::MotionSubspaces.bit();
    }

    pub fn ensure_twists(&mut self) {
        if self.cache_valid(CacheKind::Twists) {
            return;
        }
        self.ensure_motion_subspaces();
        self.twists[0] = Twist::zero(self.world, self.world, self.world);
        for j in 0..self.kinds.len() {
            let succ = j + 1;
            let pred = self.predecessors[j];
            let joint_twist = self.motion_subspaces[j].twist(self.v.segment(JointId(j)));
            self.twists[succ] = self.twists[pred] + joint_twist;
        }
        self.valid |= CacheKind::Twists.bit();
    }

    /// Gravity-free bias accelerations with respect to the world: the
    /// spatial acceleration each body would have with zero joint
    /// accelerations.
    pub fn ensure_bias_accelerations(&mut self) {
        if self.cache_valid(CacheKind::BiasAccelerations) {
            return;
        }
        self.ensure_twists();
        self.bias_accelerations[0] = SpatialAcceleration::zero(self.world, self.world, self.world);
        for j in 0..self.kinds.len() {
            let succ = j + 1;
            let pred = self.predecessors[j];
            let joint_twist = self.motion_subspaces[j].twist(self.v.segment(JointId(j)));
            // d/dt (X S v) = T_succ x (X S v) + X (S_dot v), with X the
            // transform to root of the (moving) successor frame.
            let cross = self.twists[succ].cross(&joint_twist);
            let (before, after) = self.joint_frames[j];
            let cj = self.kinds[j]
                .bias_acceleration(
                    after,
                    before,
                    self.q.segment(JointId(j)),
                    self.v.segment(JointId(j)),
                )
                .transform(&self.transforms_to_root[succ]);
            let joint_bias = SpatialAcceleration::new(
                self.body_frames[succ],
                self.body_frames[pred],
                self.world,
                cross.angular + cj.angular,
                cross.linear + cj.linear,
            );
            self.bias_accelerations[succ] = self.bias_accelerations[pred] + joint_bias;
        }
        self.valid |= CacheKind::BiasAccelerations.bit();
    }

    pub fn ensure_inertias_in_world(&mut self) {
        if self.cache_valid(CacheKind::InertiasInWorld) {
            return;
        }
        self.ensure_transforms_to_root();
        for b in 0..self.body_frames.len() {
            self.inertias_in_world[b] =
                self.body_inertias[b].transform(&self.transforms_to_root[b]);
        }
        self.valid |= CacheKind::InertiasInWorld.bit();
    }

    /// Composite rigid-body inertias: the inertia of each body's subtree,
    /// in world frame.
    pub fn ensure_crb_inertias(&mut self) {
        if self.cache_valid(CacheKind::CrbInertias) {
            return;
        }
        self.ensure_inertias_in_world();
        self.crb_inertias.copy_from_slice(&self.inertias_in_world);
        for j in (0..self.kinds.len()).rev() {
            let succ = j + 1;
            let pred = self.predecessors[j];
            self.crb_inertias[pred] = self.crb_inertias[pred] + self.crb_inertias[succ];
        }
        self.valid |= CacheKind::CrbInertias.bit();
    }

    // ── Cache slices (call the matching `ensure_*` first) ──

    #[inline]
    pub fn transforms_to_root(&self) -> &[Transform<T>] {
        debug_assert!(self.cache_valid(CacheKind::TransformsToRoot));
        &self.transforms_to_root
    }

    #[inline]
    pub fn motion_subspaces(&self) -> &[GeometricJacobian<T>] {
        debug_assert!(self.cache_valid(CacheKind::MotionSubspaces));
        &self.motion_subspaces
    }

    #[inline]
    pub fn twists(&self) -> &[Twist<T>] {
        debug_assert!(self.cache_valid(CacheKind::Twists));
        &self.twists
    }

    #[inline]
    pub fn bias_accelerations(&self) -> &[SpatialAcceleration<T>] {
        debug_assert!(self.cache_valid(CacheKind::BiasAccelerations));
        &self.bias_accelerations
    }

    #[inline]
    pub fn inertias_in_world(&self) -> &[SpatialInertia<T>] {
        debug_assert!(self.cache_valid(CacheKind::InertiasInWorld));
        &self.inertias_in_world
    }

    #[inline]
    pub fn crb_inertias(&self) -> &[SpatialInertia<T>] {
        debug_assert!(self.cache_valid(CacheKind::CrbInertias));
        &self.crb_inertias
    }

    // ── Topology accessors for the algorithms ──

    #[inline]
    pub fn world_frame(&self) -> FrameId {
        self.world
    }

    #[inline]
    pub fn body_frame(&self, body: usize) -> FrameId {
        self.body_frames[body]
    }

    #[inline]
    pub fn predecessor_index(&self, joint: usize) -> usize {
        self.predecessors[joint]
    }

    #[inline]
    pub fn gravity(&self) -> Vec3<T> {
        self.gravity
    }

    #[inline]
    pub fn contact_points(&self) -> &[StateContactPoint<T>] {
        &self.contact_points
    }

    #[inline]
    pub fn contact_state(&self) -> &[T] {
        &self.s
    }

    // ── Queries ──

    /// Transform from a body's frame to the world frame.
    pub fn transform_to_root(
        &mut self,
        mechanism: &Mechanism,
        body: BodyId,
    ) -> Result<Transform<T>, ModelError> {
        self.check_compatible(mechanism)?;
        mechanism.body(body)?;
        self.ensure_transforms_to_root();
        Ok(self.transforms_to_root[body.index()])
    }

    /// Transform between any two frames known to the mechanism.
    pub fn relative_transform(
        &mut self,
        mechanism: &Mechanism,
        from: FrameId,
        to: FrameId,
    ) -> Result<Transform<T>, ModelError> {
        self.check_compatible(mechanism)?;
        let from_to_world = self.frame_to_world(mechanism, from)?;
        let to_to_world = self.frame_to_world(mechanism, to)?;
        Ok(to_to_world.inverse() * from_to_world)
    }

    fn frame_to_world(
        &mut self,
        mechanism: &Mechanism,
        frame: FrameId,
    ) -> Result<Transform<T>, ModelError> {
        let body = mechanism.frame_body(frame)?;
        let fixed = Transform::<T>::from_f64(mechanism.frame_to_body(frame)?);
        self.ensure_transforms_to_root();
        Ok(self.transforms_to_root[body.index()] * fixed)
    }

    /// Twist of a body with respect to the world, in world frame.
    pub fn twist_wrt_world(
        &mut self,
        mechanism: &Mechanism,
        body: BodyId,
    ) -> Result<Twist<T>, ModelError> {
        self.check_compatible(mechanism)?;
        mechanism.body(body)?;
        self.ensure_twists();
        Ok(self.twists[body.index()])
    }

    /// Twist of `body` with respect to `base`, in world frame.
    pub fn relative_twist(
        &mut self,
        mechanism: &Mechanism,
        body: BodyId,
        base: BodyId,
    ) -> Result<Twist<T>, ModelError> {
        self.check_compatible(mechanism)?;
        mechanism.body(body)?;
        mechanism.body(base)?;
        self.ensure_twists();
        Ok(self.twists[body.index()] - self.twists[base.index()])
    }

    /// Map the current velocity to a configuration rate, per joint kind.
    pub fn configuration_derivative_into(
        &self,
        out: &mut SegmentedVec<T>,
    ) -> Result<(), ModelError> {
        if out.len() != self.q.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.q.len(),
                got: out.len(),
            });
        }
        for j in 0..self.kinds.len() {
            self.kinds[j].configuration_derivative(
                self.q.segment(JointId(j)),
                self.v.segment(JointId(j)),
                out.segment_mut(JointId(j)),
            );
        }
        Ok(())
    }

    /// Allocating flavor of [`Self::configuration_derivative_into`].
    pub fn configuration_derivative(&self) -> SegmentedVec<T> {
        let mut out = SegmentedVec::from_widths(self.q.ranges().iter().map(|r| r.len()));
        self.configuration_derivative_into(&mut out)
            .expect("freshly sized output");
        out
    }

    /// Inverse map: velocity coordinates from a configuration rate.
    pub fn velocity_from_configuration_derivative_into(
        &self,
        q_dot: &SegmentedVec<T>,
        out: &mut SegmentedVec<T>,
    ) -> Result<(), ModelError> {
        if q_dot.len() != self.q.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.q.len(),
                got: q_dot.len(),
            });
        }
        if out.len() != self.v.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.v.len(),
                got: out.len(),
            });
        }
        for j in 0..self.kinds.len() {
            self.kinds[j].velocity_from_configuration_derivative(
                self.q.segment(JointId(j)),
                q_dot.segment(JointId(j)),
                out.segment_mut(JointId(j)),
            );
        }
        Ok(())
    }
}
