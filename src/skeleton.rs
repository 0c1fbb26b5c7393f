//! Skeletal rigging: bone hierarchies, secondary-motion physics, smart bones
//! and FABRIK inverse kinematics.
//!
//! Bones reference their parent by id. A [`Skeleton`] is an id-indexed arena
//! that can only be built from a hierarchy that passed
//! [`validate_skeleton`], so physics and IK never see cycles or dangling
//! parents. Every solver is a pure function returning updated bones; the host
//! document merges them back with [`SkeletalLayer::apply_bones`].

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::basics::PointD;
use crate::error::SkeletonError;

/// Gravity used by [`apply_physics`] when the host has no preference.
pub const DEFAULT_GRAVITY: PointD = PointD::new(0.0, 0.5);
/// End-effector distance at which FABRIK stops iterating.
pub const FABRIK_TOLERANCE: f64 = 0.1;
pub const FABRIK_MAX_ITERATIONS: usize = 10;

const JOINT_EPSILON: f64 = 1e-12;

// ============================================================================
// Data model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoneSegment {
    pub start_point: PointD,
    pub end_point: PointD,
    pub length: f64,
}

impl BoneSegment {
    pub fn between(start_point: PointD, end_point: PointD) -> Self {
        Self {
            start_point,
            end_point,
            length: start_point.distance(end_point),
        }
    }

    /// Direction of the segment in radians.
    pub fn angle(&self) -> f64 {
        self.start_point.angle_to(self.end_point)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoneConstraints {
    /// Bone follows the spring-damper simulation.
    pub physics: bool,
}

fn default_stiffness() -> f64 {
    0.1
}

fn default_damping() -> f64 {
    0.9
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bone {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub segment: BoneSegment,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub constraints: BoneConstraints,
    #[serde(default = "default_stiffness")]
    pub stiffness: f64,
    #[serde(default = "default_damping")]
    pub damping: f64,
    #[serde(default)]
    pub angular_velocity: f64,
}

impl Bone {
    /// A root bone from `start` to `end`, named after its id.
    pub fn new(id: impl Into<String>, start: PointD, end: PointD) -> Self {
        let id = id.into();
        let segment = BoneSegment::between(start, end);
        Self {
            name: id.clone(),
            id,
            parent_id: None,
            rotation: segment.angle(),
            segment,
            constraints: BoneConstraints::default(),
            stiffness: default_stiffness(),
            damping: default_damping(),
            angular_velocity: 0.0,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }

    pub fn with_physics(mut self, stiffness: f64, damping: f64) -> Self {
        self.constraints.physics = true;
        self.stiffness = stiffness;
        self.damping = damping;
        self
    }

    /// Place the bone on `start`..`end`, keeping its stored length.
    fn set_joints(&mut self, start: PointD, end: PointD) {
        self.segment.start_point = start;
        self.segment.end_point = end;
        self.rotation = start.angle_to(end);
    }
}

/// A value driven by a smart bone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Driving bone rotation in radians.
    pub angle: f64,
    pub value: PropertyValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartAction {
    pub bone_id: String,
    pub target_property: String,
    pub keyframes: Vec<Keyframe>,
}

/// Property name to value, as produced by [`solve_smart_bones`].
pub type PropertyPatch = BTreeMap<String, PropertyValue>;

/// The rig stored in a drawing document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkeletalLayer {
    pub bones: Vec<Bone>,
    /// Ordered root-to-tip bone ids.
    #[serde(default)]
    pub ik_chains: Vec<Vec<String>>,
    #[serde(default)]
    pub smart_actions: Vec<SmartAction>,
}

impl SkeletalLayer {
    /// Validated arena over a copy of the layer's bones.
    pub fn skeleton(&self) -> Result<Skeleton, SkeletonError> {
        Skeleton::new(self.bones.clone())
    }

    /// Replace bones by id. Bones with unknown ids are appended.
    pub fn apply_bones<I>(&mut self, bones: I)
    where
        I: IntoIterator<Item = Bone>,
    {
        for bone in bones {
            match self.bones.iter_mut().find(|b| b.id == bone.id) {
                Some(slot) => *slot = bone,
                None => self.bones.push(bone),
            }
        }
    }

    /// The part of the first IK chain containing `bone_id` that ends at it.
    pub fn chain_to(&self, bone_id: &str) -> Option<&[String]> {
        self.ik_chains.iter().find_map(|chain| {
            chain
                .iter()
                .position(|id| id == bone_id)
                .map(|i| &chain[..=i])
        })
    }
}

// ============================================================================
// Validation and the arena
// ============================================================================

/// Check that every parent exists and that no parent chain loops.
///
/// Checks run per bone in order: missing parent, self-parent, then a walk to
/// the root that fails on the first repeated id.
pub fn validate_skeleton(bones: &[Bone]) -> Result<(), SkeletonError> {
    let index: HashMap<&str, &Bone> = bones.iter().map(|b| (b.id.as_str(), b)).collect();

    for bone in bones {
        let Some(parent) = bone.parent_id.as_deref() else {
            continue;
        };
        if !index.contains_key(parent) {
            return Err(SkeletonError::OrphanBone {
                bone: bone.id.clone(),
                parent: parent.to_string(),
            });
        }
        if parent == bone.id {
            return Err(SkeletonError::SelfParent {
                bone: bone.id.clone(),
            });
        }

        let mut visited: HashSet<&str> = HashSet::from([bone.id.as_str()]);
        let mut current = Some(parent);
        while let Some(id) = current {
            if !visited.insert(id) {
                return Err(SkeletonError::DeepCycle {
                    bone: bone.id.clone(),
                    repeated: id.to_string(),
                });
            }
            current = index.get(id).and_then(|b| b.parent_id.as_deref());
        }
    }
    Ok(())
}

/// Bones of a validated hierarchy with O(1) lookup by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    bones: Vec<Bone>,
    index: HashMap<String, usize>,
}

impl Skeleton {
    pub fn new(bones: Vec<Bone>) -> Result<Self, SkeletonError> {
        if let Err(e) = validate_skeleton(&bones) {
            warn!(bone = e.bone_id(), error = %e, "invalid skeleton");
            return Err(e);
        }
        let mut index = HashMap::with_capacity(bones.len());
        for (i, bone) in bones.iter().enumerate() {
            index.entry(bone.id.clone()).or_insert(i);
        }
        Ok(Self { bones, index })
    }

    pub fn get(&self, id: &str) -> Option<&Bone> {
        self.index.get(id).map(|&i| &self.bones[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn into_bones(self) -> Vec<Bone> {
        self.bones
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn children<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Bone> + 'a {
        self.bones
            .iter()
            .filter(move |b| b.parent_id.as_deref() == Some(id))
    }

    /// Parent, grandparent, ... up to the root. Terminates because the
    /// hierarchy is acyclic.
    pub fn ancestors<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Bone> + 'a {
        let start = self.get(id).and_then(|b| b.parent_id.as_deref());
        std::iter::successors(start.and_then(|p| self.get(p)), move |b| {
            b.parent_id.as_deref().and_then(|p| self.get(p))
        })
    }

    /// Merge `bones` by id and re-validate. On error the skeleton is left
    /// untouched.
    pub fn apply(&mut self, bones: Vec<Bone>) -> Result<(), SkeletonError> {
        let mut merged = self.bones.clone();
        for bone in bones {
            match self.index.get(&bone.id) {
                Some(&i) => merged[i] = bone,
                None => merged.push(bone),
            }
        }
        *self = Self::new(merged)?;
        Ok(())
    }
}

// ============================================================================
// Physics
// ============================================================================

/// One spring-damper step for every bone with the physics constraint.
///
/// `velocity' = (velocity - stiffness * rotation + gravity.y * sin(rotation)) * damping`
/// and `rotation' = rotation + velocity' * dt`. Other bones are copied.
pub fn apply_physics(skeleton: &Skeleton, dt: f64, gravity: PointD) -> Vec<Bone> {
    skeleton
        .bones()
        .iter()
        .map(|bone| {
            if !bone.constraints.physics {
                return bone.clone();
            }
            let restoration = -bone.stiffness * bone.rotation;
            let gravity_effect = gravity.y * bone.rotation.sin();
            let velocity = (bone.angular_velocity + restoration + gravity_effect) * bone.damping;
            Bone {
                rotation: bone.rotation + velocity * dt,
                angular_velocity: velocity,
                ..bone.clone()
            }
        })
        .collect()
}

// ============================================================================
// Smart bones
// ============================================================================

/// Keyframe value for `angle`: the nearer of the two bracketing keyframes,
/// switching at the midpoint. Angles outside the keyframe range clamp.
pub fn step_keyframes(keyframes: &[Keyframe], angle: f64) -> Option<&PropertyValue> {
    let mut sorted: Vec<&Keyframe> = keyframes.iter().collect();
    sorted.sort_by(|a, b| a.angle.total_cmp(&b.angle));
    let (first, last) = (*sorted.first()?, *sorted.last()?);
    if angle <= first.angle {
        return Some(&first.value);
    }
    if angle >= last.angle {
        return Some(&last.value);
    }
    sorted.windows(2).find_map(|pair| {
        let (k0, k1) = (pair[0], pair[1]);
        if angle < k0.angle || angle > k1.angle {
            return None;
        }
        let span = k1.angle - k0.angle;
        let t = if span > 0.0 { (angle - k0.angle) / span } else { 1.0 };
        Some(if t < 0.5 { &k0.value } else { &k1.value })
    })
}

/// Values of every smart action driven by the current bone rotations.
/// Actions whose driver bone is missing or which have no keyframes are
/// skipped; a later action on the same property overrides an earlier one.
pub fn solve_smart_bones(layer: &SkeletalLayer) -> PropertyPatch {
    let mut patch = PropertyPatch::new();
    for action in &layer.smart_actions {
        let Some(bone) = layer.bones.iter().find(|b| b.id == action.bone_id) else {
            debug!(bone = %action.bone_id, property = %action.target_property, "smart bone driver missing");
            continue;
        };
        if let Some(value) = step_keyframes(&action.keyframes, bone.rotation) {
            patch.insert(action.target_property.clone(), value.clone());
        }
    }
    patch
}

// ============================================================================
// FABRIK
// ============================================================================

/// Point `len` away from `from` in the direction of `toward`.
fn reach(from: PointD, toward: PointD, len: f64) -> PointD {
    let d = toward - from;
    let l = d.length();
    if l < JOINT_EPSILON {
        return PointD::new(from.x + len, from.y);
    }
    from + d * (len / l)
}

/// Pose `chain` (root first) so its tip reaches toward `target`.
///
/// Joint positions are the chain root's start point followed by every bone's
/// end point; segment lengths are the bones' stored lengths. An out-of-reach
/// target stretches the chain straight at it. Returns all bones, with only
/// the chain's segments and rotations changed. A chain naming unknown bones
/// leaves everything unchanged.
pub fn solve_fabrik<S: AsRef<str>>(
    target: PointD,
    chain: &[S],
    skeleton: &Skeleton,
    tolerance: f64,
    max_iterations: usize,
) -> Vec<Bone> {
    let mut bones = skeleton.bones().to_vec();
    let mut slots = Vec::with_capacity(chain.len());
    for id in chain {
        match skeleton.index.get(id.as_ref()) {
            Some(&i) => slots.push(i),
            None => {
                warn!(bone = id.as_ref(), "ik chain references an unknown bone");
                return bones;
            }
        }
    }
    let Some(&root_slot) = slots.first() else {
        return bones;
    };

    let lengths: Vec<f64> = slots.iter().map(|&i| bones[i].segment.length).collect();
    let root = bones[root_slot].segment.start_point;
    let mut joints: Vec<PointD> = std::iter::once(root)
        .chain(slots.iter().map(|&i| bones[i].segment.end_point))
        .collect();
    let n = lengths.len();
    let total: f64 = lengths.iter().sum();

    if root.distance(target) > total {
        for i in 0..n {
            joints[i + 1] = reach(joints[i], target, lengths[i]);
        }
    } else {
        let mut iterations = 0;
        while iterations < max_iterations && joints[n].distance(target) > tolerance {
            joints[n] = target;
            for i in (0..n).rev() {
                joints[i] = reach(joints[i + 1], joints[i], lengths[i]);
            }
            joints[0] = root;
            for i in 0..n {
                joints[i + 1] = reach(joints[i], joints[i + 1], lengths[i]);
            }
            iterations += 1;
        }
        trace!(iterations, error = joints[n].distance(target), "fabrik solved");
    }

    for (k, &i) in slots.iter().enumerate() {
        bones[i].set_joints(joints[k], joints[k + 1]);
    }
    bones
}

// ============================================================================
// Drag gesture
// ============================================================================

/// Which end of a bone the pointer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragHandle {
    /// Moves the whole bone.
    Start,
    /// Poses the bone's IK chain.
    #[default]
    End,
}

/// Per-gesture bone drag state. The host keeps it between pointer events.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BoneDrag {
    #[default]
    Idle,
    Dragging { bone_id: String, handle: DragHandle },
}

impl BoneDrag {
    pub fn begin(&mut self, bone_id: impl Into<String>, handle: DragHandle) {
        let bone_id = bone_id.into();
        debug!(bone = %bone_id, ?handle, "bone drag start");
        *self = BoneDrag::Dragging { bone_id, handle };
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, BoneDrag::Dragging { .. })
    }

    /// New pose for a pointer at `target`, or `None` when idle or the bone
    /// is unknown.
    ///
    /// Dragging an end point solves the IK chain prefix ending at the bone
    /// (or just the bone when it is in no chain); dragging a start point
    /// translates the bone.
    pub fn update(&self, layer: &SkeletalLayer, skeleton: &Skeleton, target: PointD) -> Option<Vec<Bone>> {
        let BoneDrag::Dragging { bone_id, handle } = self else {
            return None;
        };
        let bone = skeleton.get(bone_id)?;
        match handle {
            DragHandle::End => {
                let single = [bone_id.as_str()];
                let bones = match layer.chain_to(bone_id) {
                    Some(chain) => solve_fabrik(target, chain, skeleton, FABRIK_TOLERANCE, FABRIK_MAX_ITERATIONS),
                    None => solve_fabrik(target, &single, skeleton, FABRIK_TOLERANCE, FABRIK_MAX_ITERATIONS),
                };
                Some(bones)
            }
            DragHandle::Start => {
                let delta = target - bone.segment.start_point;
                let mut moved = bone.clone();
                moved.segment.start_point = target;
                moved.segment.end_point = moved.segment.end_point + delta;
                let mut bones = skeleton.bones().to_vec();
                if let Some(slot) = bones.iter_mut().find(|b| b.id == moved.id) {
                    *slot = moved;
                }
                Some(bones)
            }
        }
    }

    /// End the gesture, returning the bone that was held.
    pub fn release(&mut self) -> Option<String> {
        match std::mem::take(self) {
            BoneDrag::Dragging { bone_id, .. } => {
                debug!(bone = %bone_id, "bone drag end");
                Some(bone_id)
            }
            BoneDrag::Idle => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
