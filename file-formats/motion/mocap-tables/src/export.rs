//! Building tables from a parsed document

use glam::DVec3;
use mocap_bvh::math::prune;
use mocap_bvh::{Axis, Bvh};

use crate::error::Result;
use crate::table::{FrameTable, HierarchyRow, TableSet, column_name};

/// Options for [`export_tables`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct ExportOptions {
    /// Factor applied to offsets and world positions
    pub scale: f64,
    /// Include end sites in the position table
    pub end_sites: bool,
    /// Snap derived positions within this distance of zero to zero
    pub prune_epsilon: Option<f64>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            end_sites: true,
            prune_epsilon: None,
        }
    }
}

impl ExportOptions {
    fn finish(&self, v: DVec3) -> DVec3 {
        let v = v * self.scale;
        match self.prune_epsilon {
            Some(epsilon) => prune(v, epsilon),
            None => v,
        }
    }
}

/// One row per joint and end site in pre-order, with scaled offsets
pub fn hierarchy_table(bvh: &Bvh, options: &ExportOptions) -> Vec<HierarchyRow> {
    let skeleton = bvh.skeleton();
    skeleton
        .iter()
        .map(|(_, joint)| {
            let parent = joint.parent().map(|p| skeleton[p].name());
            HierarchyRow::new(joint.name(), parent, options.finish(joint.offset()))
        })
        .collect()
}

/// Raw rotation channel values, one column per rotation channel in channel order
pub fn rotation_table(bvh: &Bvh) -> Result<FrameTable> {
    let skeleton = bvh.skeleton();
    let motion = bvh.motion();

    let mut columns = Vec::new();
    let mut slots = Vec::new();
    for (id, kind) in skeleton.channel_layout() {
        if kind.is_rotation() {
            columns.push(column_name(skeleton[id].name(), kind.axis()));
            slots.push(skeleton.channel_index(id, kind)?);
        }
    }

    let mut table = FrameTable::new(columns)?;
    let mut row = Vec::with_capacity(slots.len());
    for (index, frame) in motion.frames().enumerate() {
        row.clear();
        row.extend(slots.iter().map(|&slot| frame[slot]));
        table.push_row(motion.time_of(index), &row)?;
    }
    log::debug!(
        "Rotation table: {} columns, {} rows",
        table.columns().len(),
        table.len()
    );
    Ok(table)
}

/// World positions of every joint per frame
pub fn position_table(bvh: &Bvh, options: &ExportOptions) -> Result<FrameTable> {
    let skeleton = bvh.skeleton();
    let joints: Vec<_> = skeleton
        .iter()
        .filter(|(_, joint)| options.end_sites || !joint.is_end_site())
        .map(|(id, _)| id)
        .collect();

    let columns = joints
        .iter()
        .flat_map(|&id| [Axis::X, Axis::Y, Axis::Z].map(|axis| column_name(skeleton[id].name(), axis)))
        .collect();
    let mut table = FrameTable::new(columns)?;

    let mut row = Vec::with_capacity(joints.len() * 3);
    for pose in bvh.world_poses()? {
        row.clear();
        for &id in &joints {
            row.extend_from_slice(&options.finish(pose[id].position()).to_array());
        }
        table.push_row(bvh.motion().time_of(pose.frame()), &row)?;
    }
    log::debug!(
        "Position table: {} joints, {} rows",
        joints.len(),
        table.len()
    );
    Ok(table)
}

/// Build all three tables
pub fn export_tables(bvh: &Bvh, options: &ExportOptions) -> Result<TableSet> {
    Ok(TableSet {
        hierarchy: hierarchy_table(bvh, options),
        rotations: rotation_table(bvh)?,
        positions: position_table(bvh, options)?,
    })
}
