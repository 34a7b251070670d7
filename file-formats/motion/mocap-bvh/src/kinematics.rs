//! Forward kinematics
//!
//! Walks the skeleton in pre-order, so every parent's world transform is ready
//! before its children need it. A joint's local transform is its rotation
//! channels composed in declaration order plus a translation: the position
//! channels when present (they are absolute and replace the offset), the
//! static offset otherwise. End sites carry no rotation and inherit their
//! parent's world rotation.

use std::ops::Index;

use glam::{DMat3, DQuat, DVec3};

use crate::error::{BvhError, Result};
use crate::math::Transform;
use crate::motion::Motion;
use crate::skeleton::{Joint, JointId, Skeleton};

/// Local and world state of one joint in one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPose {
    /// Transform relative to the parent joint
    pub local: Transform,
    /// Transform relative to the world origin
    pub world: Transform,
    /// Local Euler angles in degrees, in the joint's rotation order
    pub local_euler: [f64; 3],
}

impl JointPose {
    /// World position
    pub fn position(&self) -> DVec3 {
        self.world.translation
    }

    /// World rotation
    pub fn rotation(&self) -> DQuat {
        self.world.rotation
    }

    /// World rotation as a matrix
    pub fn rotation_matrix(&self) -> DMat3 {
        self.world.rotation_matrix()
    }
}

/// World transforms of every joint for one frame, indexed by [`JointId`]
#[derive(Debug, Clone, PartialEq)]
pub struct WorldPose {
    frame: usize,
    joints: Vec<JointPose>,
}

impl WorldPose {
    /// 0-based frame the pose was computed for
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Number of joints
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    /// Whether the pose holds no joints
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Pose of one joint
    pub fn get(&self, id: JointId) -> Option<&JointPose> {
        self.joints.get(id.index())
    }

    /// World position of one joint
    pub fn position(&self, id: JointId) -> Option<DVec3> {
        self.get(id).map(JointPose::position)
    }

    /// Poses in pre-order
    pub fn joints(&self) -> &[JointPose] {
        &self.joints
    }
}

impl Index<JointId> for WorldPose {
    type Output = JointPose;

    fn index(&self, id: JointId) -> &Self::Output {
        &self.joints[id.index()]
    }
}

/// Local transform and Euler angles of a joint given its slice of channel values
pub fn local_transform(joint: &Joint, values: &[f64]) -> (Transform, [f64; 3]) {
    let translation = joint
        .position_slots()
        .map_or(joint.offset(), |[x, y, z]| {
            DVec3::new(values[x], values[y], values[z])
        });
    match (joint.rotation_slots(), joint.rotation_order()) {
        (Some(slots), Some(order)) => {
            let euler = slots.map(|slot| values[slot]);
            (Transform::new(order.to_quat(euler), translation), euler)
        }
        _ => (Transform::from_translation(translation), [0.0; 3]),
    }
}

/// World transforms of every joint in a 0-based frame
///
/// Pure: neither the skeleton nor the motion is modified.
pub fn forward_kinematics(skeleton: &Skeleton, motion: &Motion, frame: usize) -> Result<WorldPose> {
    motion.check_layout(skeleton)?;
    let values = motion.frame(frame)?;

    let mut joints: Vec<JointPose> = Vec::with_capacity(skeleton.len());
    for (id, joint) in skeleton.iter() {
        let start = joint.channel_offset();
        let (local, local_euler) =
            local_transform(joint, &values[start..start + joint.channel_count()]);
        let world = match joint.parent() {
            Some(parent) => {
                let parent_pose = joints.get(parent.index()).ok_or_else(|| {
                    BvhError::ConsistencyError(format!(
                        "parent of joint {id} is not ordered before it"
                    ))
                })?;
                parent_pose.world.compose(&local)
            }
            None => local,
        };
        joints.push(JointPose {
            local,
            world,
            local_euler,
        });
    }

    Ok(WorldPose { frame, joints })
}

/// World poses for every frame
pub fn world_poses(skeleton: &Skeleton, motion: &Motion) -> Result<Vec<WorldPose>> {
    motion.check_layout(skeleton)?;
    (0..motion.frame_count())
        .map(|frame| forward_kinematics(skeleton, motion, frame))
        .collect()
}

/// World poses for every frame, computed on the rayon thread pool
#[cfg(feature = "parallel")]
pub fn par_world_poses(skeleton: &Skeleton, motion: &Motion) -> Result<Vec<WorldPose>> {
    use rayon::prelude::*;

    motion.check_layout(skeleton)?;
    (0..motion.frame_count())
        .into_par_iter()
        .map(|frame| forward_kinematics(skeleton, motion, frame))
        .collect()
}
