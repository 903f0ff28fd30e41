//! The mechanism graph: rigid bodies joined by a spanning tree of joints,
//! plus optional loop-closure joints.
//!
//! Bodies and tree joints are numbered densely with `successor(joint i) =
//! body i + 1`, so a body's inboard joint is `body index - 1` and parents
//! always precede children. Structural mutation renumbers densely and bumps
//! a generation counter; states built for an older generation fail with
//! `StaleState` when used.

use crate::body::{BodyId, MassProperties, RigidBody};
use crate::error::ModelError;
use crate::joint::{validate_kind, Joint, JointId, JointKind};
use limb_contact::{ContactPoint, HalfSpace};
use limb_math::{FrameId, Mat3, Placement, SpatialInertia, Transform, Vec3};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MECHANISM_ID: AtomicU64 = AtomicU64::new(1);

/// A frame's place in the mechanism: the body it is fixed to and its pose
/// in that body's frame.
#[derive(Clone, Debug)]
struct FrameInfo {
    name: String,
    body: BodyId,
    /// Transform from this frame to its body's frame.
    pose: Transform<f64>,
}

/// A joint outside the spanning tree, closing a kinematic loop.
#[derive(Clone, Debug)]
pub struct LoopJoint {
    pub joint: Joint,
    pub predecessor: BodyId,
    pub successor: BodyId,
    /// `frame_before` in the predecessor body's frame.
    pub pose_before: Transform<f64>,
    /// `frame_after` in the successor body's frame.
    pub pose_after: Transform<f64>,
}

/// A tree (or tree plus loop-closures) of rigid bodies and joints.
#[derive(Clone, Debug)]
pub struct Mechanism {
    bodies: Vec<RigidBody>,
    joints: Vec<Joint>,
    /// Predecessor body per tree joint.
    predecessors: Vec<BodyId>,
    /// `frame_before` in the predecessor body's frame, per tree joint.
    before_poses: Vec<Transform<f64>>,
    loop_joints: Vec<LoopJoint>,
    gravity: Vec3<f64>,
    frames: Vec<FrameInfo>,
    environment: Vec<HalfSpace>,
    id: u64,
    generation: u64,
}

impl Mechanism {
    /// A mechanism with just a root body; its frame is the world frame.
    pub fn new(root_name: &str, gravity: Vec3<f64>) -> Self {
        let world = FrameId::new(0);
        let root = RigidBody::new(BodyId::ROOT, root_name.to_string(), world, None);
        Self {
            bodies: vec![root],
            joints: Vec::new(),
            predecessors: Vec::new(),
            before_poses: Vec::new(),
            loop_joints: Vec::new(),
            gravity,
            frames: vec![FrameInfo {
                name: root_name.to_string(),
                body: BodyId::ROOT,
                pose: Transform::identity(world),
            }],
            environment: Vec::new(),
            id: NEXT_MECHANISM_ID.fetch_add(1, Ordering::Relaxed),
            generation: 0,
        }
    }

    /// Attach a new body to `predecessor` through a joint.
    ///
    /// `pose` places the joint's `frame_before` in the predecessor body's
    /// frame. The new body's frame coincides with the joint's `frame_after`.
    pub fn attach(
        &mut self,
        predecessor: BodyId,
        body_name: &str,
        mass: Option<MassProperties>,
        joint_name: &str,
        kind: JointKind<f64>,
        pose: Placement<f64>,
    ) -> Result<BodyId, ModelError> {
        self.check_body(predecessor)?;
        validate_kind(&kind)?;
        if let Some(m) = &mass {
            validate_mass_properties(m)?;
        }

        let body_id = BodyId(self.bodies.len());
        let pred_frame = self.bodies[predecessor.index()].frame;

        let before = self.new_attached_frame(format!("before_{joint_name}"), predecessor, &pose);
        let after = FrameId::new(self.frames.len() as u32);
        self.frames.push(FrameInfo {
            name: body_name.to_string(),
            body: body_id,
            pose: Transform::identity(after),
        });

        let inertia = mass.map(|m| {
            SpatialInertia::from_com(after, m.mass, m.com, m.moment_about_com)
        });

        let joint_id = JointId(self.joints.len());
        self.joints
            .push(Joint::new(joint_id, joint_name.to_string(), kind, before, after));
        self.predecessors.push(predecessor);
        self.before_poses
            .push(Transform::from_placement(before, pred_frame, &pose));
        self.bodies
            .push(RigidBody::new(body_id, body_name.to_string(), after, inertia));

        self.renumber_loop_joints();
        self.generation += 1;
        Ok(body_id)
    }

    /// Attach a loop-closure joint between two existing bodies.
    pub fn attach_loop_joint(
        &mut self,
        predecessor: BodyId,
        successor: BodyId,
        joint_name: &str,
        kind: JointKind<f64>,
        pose_before: Placement<f64>,
        pose_after: Placement<f64>,
    ) -> Result<JointId, ModelError> {
        self.check_body(predecessor)?;
        self.check_body(successor)?;
        if predecessor == successor {
            return Err(ModelError::Topology(
                "a loop joint must connect two distinct bodies".to_string(),
            ));
        }
        validate_kind(&kind)?;
        if matches!(kind, JointKind::QuaternionFloating | JointKind::SpQuatFloating) {
            return Err(ModelError::Topology(
                "a floating joint constrains nothing and cannot close a loop".to_string(),
            ));
        }

        let before = self.new_attached_frame(format!("before_{joint_name}"), predecessor, &pose_before);
        let after = self.new_attached_frame(format!("after_{joint_name}"), successor, &pose_after);
        let id = JointId(self.joints.len() + self.loop_joints.len());
        let pred_frame = self.bodies[predecessor.index()].frame;
        let succ_frame = self.bodies[successor.index()].frame;
        self.loop_joints.push(LoopJoint {
            joint: Joint::new(id, joint_name.to_string(), kind, before, after),
            predecessor,
            successor,
            pose_before: Transform::from_placement(before, pred_frame, &pose_before),
            pose_after: Transform::from_placement(after, succ_frame, &pose_after),
        });
        self.generation += 1;
        Ok(id)
    }

    /// Attach a frame to a body at the given pose (frame in body frame).
    pub fn add_frame(
        &mut self,
        body: BodyId,
        name: &str,
        pose: Placement<f64>,
    ) -> Result<FrameId, ModelError> {
        self.check_body(body)?;
        Ok(self.new_attached_frame(name.to_string(), body, &pose))
    }

    /// Add a contact point to a body. Structural: contact state layout
    /// changes, so existing states go stale.
    pub fn add_contact_point(&mut self, body: BodyId, point: ContactPoint) -> Result<(), ModelError> {
        self.check_body(body)?;
        if body == BodyId::ROOT {
            return Err(ModelError::Topology(
                "contact points on the root body never move".to_string(),
            ));
        }
        self.bodies[body.index()].contact_points.push(point);
        self.generation += 1;
        Ok(())
    }

    /// Add an environment half-space contact surfaces collide with.
    pub fn add_environment_halfspace(&mut self, halfspace: HalfSpace) {
        self.environment.push(halfspace);
    }

    /// Merge every body whose inboard tree joint is `Fixed` into its
    /// predecessor, re-expressing inertia, contact points, and attached
    /// frames, then renumber densely.
    pub fn remove_fixed_joints(&mut self) -> Result<(), ModelError> {
        let nb = self.bodies.len();
        let mut merged = vec![false; nb];
        let mut target: Vec<usize> = (0..nb).collect();
        let mut to_target: Vec<Transform<f64>> = self
            .bodies
            .iter()
            .map(|b| Transform::identity(b.frame))
            .collect();

        for j in 0..self.joints.len() {
            let succ = j + 1;
            if matches!(self.joints[j].kind, JointKind::Fixed) {
                let pred = self.predecessors[j].index();
                // Fixed joint transform is the identity, so the successor
                // frame sits at `frame_before`'s pose in the predecessor.
                let jt = Transform::new(
                    self.joints[j].frame_after,
                    self.joints[j].frame_before,
                    Mat3::identity(),
                    Vec3::zero(),
                );
                merged[succ] = true;
                target[succ] = target[pred];
                to_target[succ] = to_target[pred] * (self.before_poses[j] * jt);
            }
        }
        if !merged.iter().any(|&m| m) {
            return Ok(());
        }

        let mut new_index = vec![usize::MAX; nb];
        let mut count = 0;
        for b in 0..nb {
            if !merged[b] {
                new_index[b] = count;
                count += 1;
            }
        }

        // Fold merged bodies into their targets.
        for b in 0..nb {
            if !merged[b] {
                continue;
            }
            let t = target[b];
            let x = to_target[b];
            let inertia = self.bodies[b].inertia.take();
            if t != BodyId::ROOT.index() {
                if let Some(i) = inertia {
                    let moved = i.transform(&x);
                    match &mut self.bodies[t].inertia {
                        Some(ti) => *ti = *ti + moved,
                        None => self.bodies[t].inertia = Some(moved),
                    }
                }
            }
            let points = std::mem::take(&mut self.bodies[b].contact_points);
            for mut p in points {
                p.location = x.transform_point(&p.location);
                self.bodies[t].contact_points.push(p);
            }
            let frames = std::mem::take(&mut self.bodies[b].attached_frames);
            self.bodies[t].attached_frames.extend(frames);
        }

        // Re-point frames fixed to merged bodies.
        for info in &mut self.frames {
            let fb = info.body.index();
            if merged[fb] {
                info.pose = to_target[fb] * info.pose;
                info.body = BodyId(target[fb]);
            }
        }

        // Rebuild the tree, keeping relative order (which preserves the
        // parent-before-child numbering).
        let mut joints = Vec::new();
        let mut predecessors = Vec::new();
        let mut before_poses = Vec::new();
        for j in 0..self.joints.len() {
            if merged[j + 1] {
                continue;
            }
            let pred_old = self.predecessors[j].index();
            let mut joint = self.joints[j].clone();
            joint.id = JointId(joints.len());
            joints.push(joint);
            predecessors.push(BodyId(new_index[target[pred_old]]));
            before_poses.push(to_target[pred_old] * self.before_poses[j]);
        }

        let mut bodies = Vec::new();
        for b in 0..nb {
            if merged[b] {
                continue;
            }
            let mut body = self.bodies[b].clone();
            body.id = BodyId(new_index[b]);
            bodies.push(body);
        }

        for lj in &mut self.loop_joints {
            let p = lj.predecessor.index();
            let s = lj.successor.index();
            lj.pose_before = to_target[p] * lj.pose_before;
            lj.pose_after = to_target[s] * lj.pose_after;
            lj.predecessor = BodyId(new_index[target[p]]);
            lj.successor = BodyId(new_index[target[s]]);
        }

        self.bodies = bodies;
        self.joints = joints;
        self.predecessors = predecessors;
        self.before_poses = before_poses;
        self.renumber_loop_joints();
        self.generation += 1;
        Ok(())
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn gravity(&self) -> Vec3<f64> {
        self.gravity
    }

    #[inline]
    pub fn root(&self) -> &RigidBody {
        &self.bodies[0]
    }

    #[inline]
    pub fn world_frame(&self) -> FrameId {
        self.bodies[0].frame
    }

    #[inline]
    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    #[inline]
    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    pub fn body(&self, id: BodyId) -> Result<&RigidBody, ModelError> {
        self.check_body(id)?;
        Ok(&self.bodies[id.index()])
    }

    #[inline]
    pub fn tree_joints(&self) -> &[Joint] {
        &self.joints
    }

    #[inline]
    pub fn non_tree_joints(&self) -> &[LoopJoint] {
        &self.loop_joints
    }

    /// All joints, tree first then loop-closure.
    pub fn joints(&self) -> impl Iterator<Item = &Joint> {
        self.joints
            .iter()
            .chain(self.loop_joints.iter().map(|lj| &lj.joint))
    }

    pub fn joint(&self, id: JointId) -> Result<&Joint, ModelError> {
        let i = id.index();
        if i < self.joints.len() {
            Ok(&self.joints[i])
        } else if i - self.joints.len() < self.loop_joints.len() {
            Ok(&self.loop_joints[i - self.joints.len()].joint)
        } else {
            Err(ModelError::Topology(format!("unknown joint id {i}")))
        }
    }

    /// Mutable joint access, for bounds and stabilization gains. Does not
    /// change topology.
    pub fn joint_mut(&mut self, id: JointId) -> Result<&mut Joint, ModelError> {
        let ntree = self.joints.len();
        let i = id.index();
        if i < ntree {
            Ok(&mut self.joints[i])
        } else if i - ntree < self.loop_joints.len() {
            Ok(&mut self.loop_joints[i - ntree].joint)
        } else {
            Err(ModelError::Topology(format!("unknown joint id {i}")))
        }
    }

    pub fn predecessor(&self, id: JointId) -> Result<BodyId, ModelError> {
        let i = id.index();
        if i < self.joints.len() {
            Ok(self.predecessors[i])
        } else if i - self.joints.len() < self.loop_joints.len() {
            Ok(self.loop_joints[i - self.joints.len()].predecessor)
        } else {
            Err(ModelError::Topology(format!("unknown joint id {i}")))
        }
    }

    pub fn successor(&self, id: JointId) -> Result<BodyId, ModelError> {
        let i = id.index();
        if i < self.joints.len() {
            Ok(BodyId(i + 1))
        } else if i - self.joints.len() < self.loop_joints.len() {
            Ok(self.loop_joints[i - self.joints.len()].successor)
        } else {
            Err(ModelError::Topology(format!("unknown joint id {i}")))
        }
    }

    /// The inboard joint and parent of a non-root body.
    #[inline]
    pub fn parent(&self, body: BodyId) -> Option<(BodyId, JointId)> {
        if body == BodyId::ROOT {
            None
        } else {
            let j = body.index() - 1;
            Some((self.predecessors[j], JointId(j)))
        }
    }

    /// `frame_before` pose in the predecessor body's frame, per tree joint.
    #[inline]
    pub fn before_pose(&self, joint: JointId) -> &Transform<f64> {
        &self.before_poses[joint.index()]
    }

    #[inline]
    pub fn environment(&self) -> &[HalfSpace] {
        &self.environment
    }

    pub fn num_positions(&self) -> usize {
        self.joints.iter().map(|j| j.nq()).sum()
    }

    pub fn num_velocities(&self) -> usize {
        self.joints.iter().map(|j| j.nv()).sum()
    }

    /// The body a frame is fixed to.
    pub fn frame_body(&self, frame: FrameId) -> Result<BodyId, ModelError> {
        self.frames
            .get(frame.index())
            .map(|info| info.body)
            .ok_or_else(|| ModelError::Topology(format!("unknown frame {:?}", frame)))
    }

    /// Fixed transform from a frame to its body's frame.
    pub fn frame_to_body(&self, frame: FrameId) -> Result<&Transform<f64>, ModelError> {
        self.frames
            .get(frame.index())
            .map(|info| &info.pose)
            .ok_or_else(|| ModelError::Topology(format!("unknown frame {:?}", frame)))
    }

    pub fn frame_name(&self, frame: FrameId) -> Result<&str, ModelError> {
        self.frames
            .get(frame.index())
            .map(|info| info.name.as_str())
            .ok_or_else(|| ModelError::Topology(format!("unknown frame {:?}", frame)))
    }

    /// Find a body by name.
    pub fn find_body(&self, name: &str) -> Option<BodyId> {
        self.bodies.iter().find(|b| b.name == name).map(|b| b.id)
    }

    /// The tree joints between two bodies, with +1 for joints traversed
    /// parent-to-child towards `to` and -1 for joints traversed towards
    /// `from`. `J_path * v` is then the twist of `to` with respect to
    /// `from`.
    pub fn path(&self, from: BodyId, to: BodyId) -> Result<Vec<(JointId, f64)>, ModelError> {
        self.check_body(from)?;
        self.check_body(to)?;
        let mut from_side = Vec::new();
        let mut to_side = Vec::new();
        let mut a = from;
        let mut b = to;
        // Body ids increase from root to leaves, so the deeper body always
        // has the larger index.
        while a != b {
            if a.index() > b.index() {
                let (pa, ja) = self.parent(a).expect("non-root body has a parent");
                from_side.push((ja, -1.0));
                a = pa;
            } else {
                let (pb, jb) = self.parent(b).expect("non-root body has a parent");
                to_side.push((jb, 1.0));
                b = pb;
            }
        }
        to_side.reverse();
        from_side.extend(to_side);
        Ok(from_side)
    }

    fn check_body(&self, id: BodyId) -> Result<(), ModelError> {
        if id.index() < self.bodies.len() {
            Ok(())
        } else {
            Err(ModelError::Topology(format!("unknown body id {}", id.index())))
        }
    }

    fn new_attached_frame(&mut self, name: String, body: BodyId, pose: &Placement<f64>) -> FrameId {
        let id = FrameId::new(self.frames.len() as u32);
        let body_frame = self.bodies[body.index()].frame;
        self.frames.push(FrameInfo {
            name,
            body,
            pose: Transform::from_placement(id, body_frame, pose),
        });
        self.bodies[body.index()].attached_frames.push(id);
        id
    }

    fn renumber_loop_joints(&mut self) {
        let ntree = self.joints.len();
        for (k, lj) in self.loop_joints.iter_mut().enumerate() {
            lj.joint.id = JointId(ntree + k);
        }
    }
}

/// Reject negative masses and indefinite rotational inertias up front.
fn validate_mass_properties(m: &MassProperties) -> Result<(), ModelError> {
    SpatialInertia::try_new(
        FrameId::new(0),
        m.mass,
        Vec3::zero(),
        m.moment_about_com,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn z_axis() -> Vec3<f64> {
        Vec3::new(0.0, 0.0, 1.0)
    }

    fn unit_mass() -> MassProperties {
        MassProperties::new(1.0, Vec3::zero(), Mat3::identity())
    }

    fn chain(n: usize) -> Mechanism {
        let mut m = Mechanism::new("world", Vec3::new(0.0, 0.0, -limb_math::GRAVITY));
        let mut parent = BodyId::ROOT;
        for i in 0..n {
            parent = m
                .attach(
                    parent,
                    &format!("link{}", i + 1),
                    Some(unit_mass()),
                    &format!("joint{}", i + 1),
                    JointKind::Revolute { axis: z_axis() },
                    Placement::translation(Vec3::new(0.0, 0.0, -1.0)),
                )
                .unwrap();
        }
        m
    }

    #[test]
    fn attach_numbers_bodies_and_joints_densely() {
        let m = chain(3);
        assert_eq!(m.num_bodies(), 4);
        assert_eq!(m.tree_joints().len(), 3);
        for (i, j) in m.tree_joints().iter().enumerate() {
            assert_eq!(j.id, JointId(i));
            assert_eq!(m.successor(j.id).unwrap(), BodyId(i + 1));
        }
        assert_eq!(m.num_positions(), 3);
        assert_eq!(m.num_velocities(), 3);
    }

    #[test]
    fn attach_rejects_unknown_predecessor() {
        let mut m = Mechanism::new("world", Vec3::zero());
        let r = m.attach(
            BodyId(5),
            "link",
            None,
            "joint",
            JointKind::Revolute { axis: z_axis() },
            Placement::identity(),
        );
        assert!(matches!(r, Err(ModelError::Topology(_))));
    }

    #[test]
    fn attach_rejects_negative_mass() {
        let mut m = Mechanism::new("world", Vec3::zero());
        let r = m.attach(
            BodyId::ROOT,
            "link",
            Some(MassProperties::new(-1.0, Vec3::zero(), Mat3::identity())),
            "joint",
            JointKind::Revolute { axis: z_axis() },
            Placement::identity(),
        );
        assert!(r.is_err());
    }

    #[test]
    fn attach_rejects_non_unit_axis() {
        let mut m = Mechanism::new("world", Vec3::zero());
        let r = m.attach(
            BodyId::ROOT,
            "link",
            None,
            "joint",
            JointKind::Revolute {
                axis: Vec3::new(0.0, 0.0, 2.0),
            },
            Placement::identity(),
        );
        assert!(r.is_err());
    }

    #[test]
    fn mutation_bumps_generation() {
        let mut m = chain(1);
        let g = m.generation();
        m.attach(
            BodyId(1),
            "link2",
            None,
            "joint2",
            JointKind::Revolute { axis: z_axis() },
            Placement::identity(),
        )
        .unwrap();
        assert!(m.generation() > g);
    }

    #[test]
    fn path_between_branches_is_signed_through_the_ancestor() {
        // world -> a -> b, and world -> a -> c: path(b, c) climbs joint b
        // (sign -1) then descends joint c (sign +1).
        let mut m = Mechanism::new("world", Vec3::zero());
        let a = m
            .attach(
                BodyId::ROOT,
                "a",
                Some(unit_mass()),
                "ja",
                JointKind::Revolute { axis: z_axis() },
                Placement::identity(),
            )
            .unwrap();
        let b = m
            .attach(
                a,
                "b",
                Some(unit_mass()),
                "jb",
                JointKind::Revolute { axis: z_axis() },
                Placement::identity(),
            )
            .unwrap();
        let c = m
            .attach(
                a,
                "c",
                Some(unit_mass()),
                "jc",
                JointKind::Revolute { axis: z_axis() },
                Placement::identity(),
            )
            .unwrap();

        let path = m.path(b, c).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0], (JointId(1), -1.0));
        assert_eq!(path[1], (JointId(2), 1.0));

        let down = m.path(BodyId::ROOT, b).unwrap();
        assert_eq!(down, vec![(JointId(0), 1.0), (JointId(1), 1.0)]);
    }

    #[test]
    fn remove_fixed_joints_merges_inertia_with_offset() {
        let mut m = Mechanism::new("world", Vec3::zero());
        let a = m
            .attach(
                BodyId::ROOT,
                "a",
                Some(MassProperties::point_mass(2.0, Vec3::zero())),
                "ja",
                JointKind::Revolute { axis: z_axis() },
                Placement::identity(),
            )
            .unwrap();
        // Fixed child offset 1m along x, with a point mass.
        m.attach(
            a,
            "lump",
            Some(MassProperties::point_mass(3.0, Vec3::zero())),
            "weld",
            JointKind::Fixed,
            Placement::translation(Vec3::new(1.0, 0.0, 0.0)),
        )
        .unwrap();

        let g = m.generation();
        m.remove_fixed_joints().unwrap();
        assert!(m.generation() > g);
        assert_eq!(m.num_bodies(), 2);
        assert_eq!(m.tree_joints().len(), 1);

        let merged = m.body(BodyId(1)).unwrap().inertia.unwrap();
        assert_relative_eq!(merged.mass, 5.0, epsilon = 1e-12);
        // Combined center of mass: (2*0 + 3*1)/5 along x.
        assert_relative_eq!(merged.first_moment.x, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn remove_fixed_joints_repoints_descendant_joints() {
        let mut m = Mechanism::new("world", Vec3::zero());
        let a = m
            .attach(
                BodyId::ROOT,
                "a",
                Some(unit_mass()),
                "ja",
                JointKind::Revolute { axis: z_axis() },
                Placement::identity(),
            )
            .unwrap();
        let weld = m
            .attach(
                a,
                "bracket",
                None,
                "weld",
                JointKind::Fixed,
                Placement::translation(Vec3::new(0.5, 0.0, 0.0)),
            )
            .unwrap();
        m.attach(
            weld,
            "b",
            Some(unit_mass()),
            "jb",
            JointKind::Revolute { axis: z_axis() },
            Placement::translation(Vec3::new(0.5, 0.0, 0.0)),
        )
        .unwrap();

        m.remove_fixed_joints().unwrap();
        assert_eq!(m.num_bodies(), 3);
        assert_eq!(m.tree_joints().len(), 2);
        // The surviving joint jb now hangs off body a directly, with the
        // bracket offset folded into its pose.
        let jb = JointId(1);
        assert_eq!(m.predecessor(jb).unwrap(), BodyId(1));
        assert_relative_eq!(m.before_pose(jb).trans.x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn loop_joint_ids_follow_tree_ids_after_mutation() {
        let mut m = chain(2);
        let lid = m
            .attach_loop_joint(
                BodyId(1),
                BodyId(2),
                "closure",
                JointKind::Revolute { axis: z_axis() },
                Placement::identity(),
                Placement::identity(),
            )
            .unwrap();
        assert_eq!(lid, JointId(2));
        // A further attach renumbers the loop joint after the new tree joint.
        m.attach(
            BodyId(2),
            "extra",
            Some(unit_mass()),
            "jx",
            JointKind::Revolute { axis: z_axis() },
            Placement::identity(),
        )
        .unwrap();
        assert_eq!(m.non_tree_joints()[0].joint.id, JointId(3));
    }
}
