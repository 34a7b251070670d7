//! Skeleton model
//!
//! Joints live in an arena ordered depth-first, pre-order (a parent always
//! precedes its children). The arena index of a joint is its [`JointId`], and
//! the same order drives motion channel layout and every tabular export, so it
//! is fixed once when the skeleton is built.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::ops::Index;

use glam::DVec3;

use crate::error::{BvhError, Result};
use crate::math::{Axis, AxisOrder};

/// One animated degree of freedom of a joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(clippy::enum_variant_names)]
pub enum ChannelKind {
    /// Translation along X
    Xposition,
    /// Translation along Y
    Yposition,
    /// Translation along Z
    Zposition,
    /// Rotation about X
    Xrotation,
    /// Rotation about Y
    Yrotation,
    /// Rotation about Z
    Zrotation,
}

impl ChannelKind {
    /// Position channel for an axis
    pub fn position(axis: Axis) -> Self {
        match axis {
            Axis::X => ChannelKind::Xposition,
            Axis::Y => ChannelKind::Yposition,
            Axis::Z => ChannelKind::Zposition,
        }
    }

    /// Rotation channel for an axis
    pub fn rotation(axis: Axis) -> Self {
        match axis {
            Axis::X => ChannelKind::Xrotation,
            Axis::Y => ChannelKind::Yrotation,
            Axis::Z => ChannelKind::Zrotation,
        }
    }

    /// Axis the channel acts along
    pub fn axis(self) -> Axis {
        match self {
            ChannelKind::Xposition | ChannelKind::Xrotation => Axis::X,
            ChannelKind::Yposition | ChannelKind::Yrotation => Axis::Y,
            ChannelKind::Zposition | ChannelKind::Zrotation => Axis::Z,
        }
    }

    /// Whether this is a translation channel
    pub fn is_position(self) -> bool {
        matches!(
            self,
            ChannelKind::Xposition | ChannelKind::Yposition | ChannelKind::Zposition
        )
    }

    /// Whether this is a rotation channel
    pub fn is_rotation(self) -> bool {
        !self.is_position()
    }

    /// Name as written in a `CHANNELS` declaration
    pub fn name(self) -> &'static str {
        match self {
            ChannelKind::Xposition => "Xposition",
            ChannelKind::Yposition => "Yposition",
            ChannelKind::Zposition => "Zposition",
            ChannelKind::Xrotation => "Xrotation",
            ChannelKind::Yrotation => "Yrotation",
            ChannelKind::Zrotation => "Zrotation",
        }
    }

    /// Parse a channel name as written in a `CHANNELS` declaration
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Xposition" => Some(ChannelKind::Xposition),
            "Yposition" => Some(ChannelKind::Yposition),
            "Zposition" => Some(ChannelKind::Zposition),
            "Xrotation" => Some(ChannelKind::Xrotation),
            "Yrotation" => Some(ChannelKind::Yrotation),
            "Zrotation" => Some(ChannelKind::Zrotation),
            _ => None,
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Index of a joint inside its [`Skeleton`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointId(usize);

impl JointId {
    /// The root joint is always first in pre-order
    pub const ROOT: JointId = JointId(0);

    /// Id of the joint at a pre-order position
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the joint in pre-order traversal
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Flat description of one joint, used to build a [`Skeleton`]
///
/// Parents are referenced by name, so records may come in any order.
#[derive(Debug, Clone, PartialEq)]
pub struct JointRecord {
    /// Unique joint name
    pub name: String,
    /// Parent joint name, `None` for the root
    pub parent: Option<String>,
    /// Rest-pose translation relative to the parent
    pub offset: DVec3,
    /// Declared channels, in motion-data order
    pub channels: Vec<ChannelKind>,
    /// End sites have an offset but neither channels nor children
    pub end_site: bool,
}

impl JointRecord {
    /// Root joint record
    pub fn root(name: impl Into<String>, offset: DVec3, channels: Vec<ChannelKind>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            offset,
            channels,
            end_site: false,
        }
    }

    /// Regular joint record
    pub fn joint(
        name: impl Into<String>,
        parent: impl Into<String>,
        offset: DVec3,
        channels: Vec<ChannelKind>,
    ) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent.into()),
            offset,
            channels,
            end_site: false,
        }
    }

    /// End site record
    pub fn end_site(name: impl Into<String>, parent: impl Into<String>, offset: DVec3) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent.into()),
            offset,
            channels: Vec::new(),
            end_site: true,
        }
    }
}

/// A node of the skeleton
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    name: String,
    offset: DVec3,
    channels: Vec<ChannelKind>,
    parent: Option<JointId>,
    children: Vec<JointId>,
    is_end_site: bool,
    depth: usize,
    /// Index of the first channel of this joint inside a frame
    channel_offset: usize,
    /// Relative indices of the X, Y and Z position channels
    position_slots: Option<[usize; 3]>,
    /// Relative indices of the rotation channels, in `rotation_order`
    rotation_slots: Option<[usize; 3]>,
    rotation_order: Option<AxisOrder>,
}

impl Joint {
    /// Joint name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rest-pose translation relative to the parent
    pub fn offset(&self) -> DVec3 {
        self.offset
    }

    /// Declared channels, in motion-data order
    pub fn channels(&self) -> &[ChannelKind] {
        &self.channels
    }

    /// Number of channels (0 for end sites, otherwise 3 or 6)
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Parent joint, `None` for the root
    pub fn parent(&self) -> Option<JointId> {
        self.parent
    }

    /// Child joints in declaration order
    pub fn children(&self) -> &[JointId] {
        &self.children
    }

    /// Whether this node is an end site
    pub fn is_end_site(&self) -> bool {
        self.is_end_site
    }

    /// Whether this node is the root
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Distance from the root (the root has depth 0)
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Index of the joint's first channel inside a frame
    pub fn channel_offset(&self) -> usize {
        self.channel_offset
    }

    /// Axis order of the rotation channels, if the joint has any
    pub fn rotation_order(&self) -> Option<AxisOrder> {
        self.rotation_order
    }

    /// Whether the joint declares position channels
    pub fn has_position_channels(&self) -> bool {
        self.position_slots.is_some()
    }

    /// Whether the joint declares rotation channels
    pub fn has_rotation_channels(&self) -> bool {
        self.rotation_slots.is_some()
    }

    /// Index of `kind` relative to the joint's first channel
    pub fn channel_slot(&self, kind: ChannelKind) -> Option<usize> {
        self.channels.iter().position(|&c| c == kind)
    }

    /// Relative indices of the X, Y and Z position channels
    pub fn position_slots(&self) -> Option<[usize; 3]> {
        self.position_slots
    }

    /// Relative indices of the rotation channels in [`Joint::rotation_order`]
    pub fn rotation_slots(&self) -> Option<[usize; 3]> {
        self.rotation_slots
    }
}

/// Tree of joints with a cached pre-order channel layout
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    joints: Vec<Joint>,
    channel_count: usize,
}

impl Skeleton {
    /// Build and validate a skeleton from flat joint records
    ///
    /// Children keep the relative order of their records. Rejects empty input,
    /// duplicate names, missing parents, zero or several roots, cycles, end sites
    /// with channels or children, and channel sets other than three rotations,
    /// three positions, or three positions plus three rotations.
    pub fn from_records(records: Vec<JointRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(BvhError::ValidationError(
                "skeleton has no joints".to_string(),
            ));
        }

        let mut by_name: HashMap<&str, usize> = HashMap::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if !is_valid_name(&record.name) {
                return Err(BvhError::ValidationError(format!(
                    "joint #{index} has an invalid name '{}'",
                    record.name
                )));
            }
            if by_name.insert(record.name.as_str(), index).is_some() {
                return Err(BvhError::DuplicateNameError(record.name.clone()));
            }
        }

        let mut roots = Vec::new();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
        for (index, record) in records.iter().enumerate() {
            match &record.parent {
                None => roots.push(index),
                Some(parent) if *parent == record.name => {
                    return Err(BvhError::ValidationError(format!(
                        "joint '{}' cannot be its own parent",
                        record.name
                    )));
                }
                Some(parent) => {
                    let parent_index = by_name.get(parent.as_str()).ok_or_else(|| {
                        BvhError::NotFoundError(format!(
                            "parent '{}' of joint '{}'",
                            parent, record.name
                        ))
                    })?;
                    children[*parent_index].push(index);
                }
            }
        }

        let root = match roots.as_slice() {
            [root] => *root,
            [] => {
                return Err(BvhError::ValidationError(
                    "skeleton has no root joint".to_string(),
                ));
            }
            _ => {
                let names: Vec<&str> = roots.iter().map(|&i| records[i].name.as_str()).collect();
                return Err(BvhError::ValidationError(format!(
                    "skeleton has more than one root: {}",
                    names.join(", ")
                )));
            }
        };

        // Pre-order walk; `stack` holds (record index, depth).
        let mut order = Vec::with_capacity(records.len());
        let mut depths = vec![0usize; records.len()];
        let mut stack = vec![(root, 0usize)];
        while let Some((index, depth)) = stack.pop() {
            order.push(index);
            depths[index] = depth;
            for &child in children[index].iter().rev() {
                stack.push((child, depth + 1));
            }
        }

        if order.len() != records.len() {
            let reached: HashSet<usize> = order.iter().copied().collect();
            let detached: Vec<&str> = (0..records.len())
                .filter(|i| !reached.contains(i))
                .map(|i| records[i].name.as_str())
                .collect();
            return Err(BvhError::ValidationError(format!(
                "joints not connected to the root (cyclic parents): {}",
                detached.join(", ")
            )));
        }

        let mut new_id = vec![0usize; records.len()];
        for (position, &index) in order.iter().enumerate() {
            new_id[index] = position;
        }

        let mut joints = Vec::with_capacity(records.len());
        let mut channel_count = 0;
        for &index in &order {
            let record = &records[index];
            let (position_slots, rotation_slots, rotation_order) = analyze_channels(record)?;

            if record.end_site {
                if record.parent.is_none() {
                    return Err(BvhError::ValidationError(format!(
                        "end site '{}' cannot be the root",
                        record.name
                    )));
                }
                if !children[index].is_empty() {
                    return Err(BvhError::ValidationError(format!(
                        "end site '{}' cannot have children",
                        record.name
                    )));
                }
            }

            let parent = record
                .parent
                .as_deref()
                .and_then(|name| by_name.get(name))
                .map(|&p| JointId(new_id[p]));

            joints.push(Joint {
                name: record.name.clone(),
                offset: record.offset,
                channels: record.channels.clone(),
                parent,
                children: children[index].iter().map(|&c| JointId(new_id[c])).collect(),
                is_end_site: record.end_site,
                depth: depths[index],
                channel_offset: channel_count,
                position_slots,
                rotation_slots,
                rotation_order,
            });
            channel_count += record.channels.len();
        }

        Ok(Self {
            joints,
            channel_count,
        })
    }

    /// The root joint
    pub fn root(&self) -> JointId {
        JointId::ROOT
    }

    /// Number of joints, end sites included
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    /// A validated skeleton always has a root, so this is always `false`
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Joint by id
    pub fn get(&self, id: JointId) -> Option<&Joint> {
        self.joints.get(id.0)
    }

    /// All joints in pre-order
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Joint ids in pre-order (parent before children)
    pub fn traversal(&self) -> impl ExactSizeIterator<Item = JointId> + '_ {
        (0..self.joints.len()).map(JointId)
    }

    /// `(id, joint)` pairs in pre-order
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (JointId, &Joint)> + '_ {
        self.joints
            .iter()
            .enumerate()
            .map(|(index, joint)| (JointId(index), joint))
    }

    /// Joints that carry channels, in pre-order
    pub fn animated_joints(&self) -> impl Iterator<Item = (JointId, &Joint)> + '_ {
        self.iter().filter(|(_, joint)| !joint.is_end_site)
    }

    /// End sites, in pre-order
    pub fn end_sites(&self) -> impl Iterator<Item = (JointId, &Joint)> + '_ {
        self.iter().filter(|(_, joint)| joint.is_end_site)
    }

    /// Look up a joint (or end site) by name
    pub fn find(&self, name: &str) -> Result<JointId> {
        self.joints
            .iter()
            .position(|joint| joint.name == name)
            .map(JointId)
            .ok_or_else(|| BvhError::NotFoundError(format!("joint '{name}'")))
    }

    /// Whether a joint with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.joints.iter().any(|joint| joint.name == name)
    }

    /// Parent of a joint
    pub fn parent(&self, id: JointId) -> Option<JointId> {
        self.get(id).and_then(Joint::parent)
    }

    /// Children of a joint
    pub fn children(&self, id: JointId) -> &[JointId] {
        self.get(id).map(Joint::children).unwrap_or(&[])
    }

    /// Chain of joints from `id` up to and including the root
    pub fn ancestors(&self, id: JointId) -> impl Iterator<Item = JointId> + '_ {
        std::iter::successors(self.get(id).map(|_| id), move |&current| {
            self.parent(current)
        })
    }

    /// Total number of channels in one frame
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Number of channels declared by one joint
    pub fn joint_channel_count(&self, id: JointId) -> Result<usize> {
        self.get(id)
            .map(Joint::channel_count)
            .ok_or_else(|| joint_index_error(id, self.len()))
    }

    /// Index of a `(joint, channel)` pair inside a frame
    pub fn channel_index(&self, id: JointId, kind: ChannelKind) -> Result<usize> {
        let joint = self.get(id).ok_or_else(|| joint_index_error(id, self.len()))?;
        joint
            .channel_slot(kind)
            .map(|slot| joint.channel_offset + slot)
            .ok_or_else(|| {
                BvhError::IndexError(format!("joint '{}' has no {kind} channel", joint.name))
            })
    }

    /// Every `(joint, channel)` pair in frame order
    pub fn channel_layout(&self) -> impl Iterator<Item = (JointId, ChannelKind)> + '_ {
        self.iter().flat_map(|(id, joint)| {
            joint.channels.iter().map(move |&kind| (id, kind))
        })
    }

    /// Rename a joint, keeping names unique
    pub fn rename(&mut self, id: JointId, new_name: &str) -> Result<()> {
        validate_name(new_name)?;
        let len = self.len();
        let current = self.get(id).ok_or_else(|| joint_index_error(id, len))?;
        if current.name == new_name {
            return Ok(());
        }
        if self.contains(new_name) {
            return Err(BvhError::DuplicateNameError(new_name.to_string()));
        }
        log::debug!("Renaming joint '{}' to '{}'", current.name, new_name);
        self.joints[id.0].name = new_name.to_string();
        Ok(())
    }

    /// Rename several joints at once
    ///
    /// The mapping is validated as a whole: every old name must exist and the
    /// resulting names must be unique, otherwise nothing is renamed. Returns the
    /// number of joints whose name changed.
    pub fn rename_joints(&mut self, mapping: &BTreeMap<String, String>) -> Result<usize> {
        let mut names: Vec<String> = self.joints.iter().map(|j| j.name.clone()).collect();
        for (old, new) in mapping {
            validate_name(new)?;
            let id = self.find(old)?;
            names[id.0].clone_from(new);
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(BvhError::DuplicateNameError(name.clone()));
            }
        }

        let mut changed = 0;
        for (joint, name) in self.joints.iter_mut().zip(names) {
            if joint.name != name {
                joint.name = name;
                changed += 1;
            }
        }
        log::debug!("Renamed {changed} joints");
        Ok(changed)
    }

    /// Flatten back into records (pre-order, parents by name)
    pub fn to_records(&self) -> Vec<JointRecord> {
        self.joints
            .iter()
            .map(|joint| JointRecord {
                name: joint.name.clone(),
                parent: joint.parent.map(|p| self.joints[p.0].name.clone()),
                offset: joint.offset,
                channels: joint.channels.clone(),
                end_site: joint.is_end_site,
            })
            .collect()
    }

    /// Multiply every static offset, end sites included
    pub(crate) fn scale_offsets(&mut self, factor: f64) {
        for joint in &mut self.joints {
            joint.offset *= factor;
        }
    }
}

impl Index<JointId> for Skeleton {
    type Output = Joint;

    fn index(&self, id: JointId) -> &Self::Output {
        &self.joints[id.0]
    }
}

fn joint_index_error(id: JointId, len: usize) -> BvhError {
    BvhError::IndexError(format!(
        "joint {id} out of range for a skeleton of {len} joints"
    ))
}

/// Non-empty words without braces, separated by single spaces
fn is_valid_name(name: &str) -> bool {
    !name.contains(['{', '}'])
        && name
            .split(' ')
            .all(|word| !word.is_empty() && !word.contains(char::is_whitespace))
}

fn validate_name(name: &str) -> Result<()> {
    if !is_valid_name(name) {
        return Err(BvhError::ValueError(format!(
            "'{name}' is not a valid joint name"
        )));
    }
    Ok(())
}

type ChannelAnalysis = (Option<[usize; 3]>, Option<[usize; 3]>, Option<AxisOrder>);

/// Check the channel set of a single record
pub(crate) fn check_channels(record: &JointRecord) -> Result<()> {
    analyze_channels(record).map(|_| ())
}

/// Work out position slots, rotation slots and rotation order of a record
fn analyze_channels(record: &JointRecord) -> Result<ChannelAnalysis> {
    let channels = &record.channels;
    if record.end_site {
        if !channels.is_empty() {
            return Err(BvhError::ValidationError(format!(
                "end site '{}' cannot declare channels",
                record.name
            )));
        }
        return Ok((None, None, None));
    }
    if channels.len() != 3 && channels.len() != 6 {
        return Err(BvhError::ValidationError(format!(
            "joint '{}' declares {} channels, expected 3 or 6",
            record.name,
            channels.len()
        )));
    }

    let positions: Vec<(usize, Axis)> = channels
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_position())
        .map(|(slot, c)| (slot, c.axis()))
        .collect();
    let rotations: Vec<(usize, Axis)> = channels
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_rotation())
        .map(|(slot, c)| (slot, c.axis()))
        .collect();

    let position_slots = match positions.as_slice() {
        [] => None,
        [_, _, _] => {
            let mut slots = [usize::MAX; 3];
            for &(slot, axis) in &positions {
                slots[axis.index()] = slot;
            }
            if slots.contains(&usize::MAX) {
                return Err(bad_channel_set(record));
            }
            Some(slots)
        }
        _ => return Err(bad_channel_set(record)),
    };

    let (rotation_slots, rotation_order) = match rotations.as_slice() {
        [] => (None, None),
        [(s0, a0), (s1, a1), (s2, a2)] => {
            let order =
                AxisOrder::from_axes([*a0, *a1, *a2]).map_err(|_| bad_channel_set(record))?;
            (Some([*s0, *s1, *s2]), Some(order))
        }
        _ => return Err(bad_channel_set(record)),
    };

    Ok((position_slots, rotation_slots, rotation_order))
}

fn bad_channel_set(record: &JointRecord) -> BvhError {
    let names: Vec<&str> = record.channels.iter().map(|c| c.name()).collect();
    BvhError::ValidationError(format!(
        "joint '{}' must declare each axis at most once per channel type, got {}",
        record.name,
        names.join(" ")
    ))
}
