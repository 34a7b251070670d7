//! Rebuilding a document from hierarchy, position and rotation tables
//!
//! The hierarchy rows give the tree and the static offsets. Joints get their
//! rotation channels from the rotation table, in column order; the root also
//! gets position channels when the position table carries its world position.
//! A row without children and without rotation columns becomes an end site.
//!
//! Other joints get `Xposition Yposition Zposition` channels ahead of their
//! rotations when the position table shows them away from their offset in
//! some frame. Their local translation is the parent-to-child world vector
//! taken back into the parent's frame.

use std::collections::{BTreeMap, HashMap};

use glam::DVec3;
use mocap_bvh::{Axis, Bvh, BvhError, ChannelKind, JointId, JointRecord, Motion, Skeleton};

use crate::error::{Result, TableError};
use crate::table::{FrameTable, HierarchyRow, TableSet, column_name, split_column};

/// Options for [`reconstruct`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct ImportOptions {
    /// Factor applied to offsets and positions
    pub scale: f64,
    /// Frame duration; derived from the time column when `None`
    pub frame_time: Option<f64>,
}

/// Relative distance from the offset below which a joint is treated as fixed
const TRANSLATION_TOLERANCE: f64 = 1e-6;

/// Local translations per frame of the joints that move off their offset
type Translations = BTreeMap<String, Vec<DVec3>>;

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            frame_time: None,
        }
    }
}

/// Rotation axes per joint, in column order
fn rotation_axes(rotations: &FrameTable) -> Result<BTreeMap<&str, Vec<Axis>>> {
    let mut axes: BTreeMap<&str, Vec<Axis>> = BTreeMap::new();
    for column in rotations.columns() {
        let (joint, axis) = split_column(column)?;
        axes.entry(joint).or_default().push(axis);
    }
    Ok(axes)
}

/// Position axes of the root, in column order
fn root_position_axes(positions: &FrameTable, root: &str) -> Result<Vec<Axis>> {
    let mut axes = Vec::new();
    for column in positions.columns() {
        let (joint, axis) = split_column(column)?;
        if joint == root {
            axes.push(axis);
        }
    }
    if !axes.is_empty() {
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            if !axes.contains(&axis) {
                return Err(TableError::MissingColumnError(column_name(root, axis)));
            }
        }
    }
    Ok(axes)
}

fn build_skeleton(
    hierarchy: &[HierarchyRow],
    root_positions: &[Axis],
    rotations: &BTreeMap<&str, Vec<Axis>>,
    translated: &Translations,
    scale: f64,
) -> Result<Skeleton> {
    let mut child_count: HashMap<&str, usize> = HashMap::new();
    for row in hierarchy {
        if let Some(parent) = &row.parent {
            *child_count.entry(parent.as_str()).or_default() += 1;
        }
    }

    let mut records = Vec::with_capacity(hierarchy.len());
    for row in hierarchy {
        let offset = row.offset * scale;
        let has_children = child_count.contains_key(row.joint.as_str());
        let rotation = rotations.get(row.joint.as_str());
        let mut channels: Vec<ChannelKind> = rotation
            .into_iter()
            .flatten()
            .map(|&axis| ChannelKind::rotation(axis))
            .collect();

        match &row.parent {
            None => {
                if rotation.is_none() {
                    return Err(TableError::MissingRotationError(row.joint.clone()));
                }
                let mut root_channels: Vec<ChannelKind> =
                    root_positions.iter().map(|&axis| ChannelKind::position(axis)).collect();
                root_channels.append(&mut channels);
                records.push(JointRecord::root(&row.joint, offset, root_channels));
            }
            Some(parent) if rotation.is_some() => {
                if translated.contains_key(&row.joint) {
                    let mut moving: Vec<ChannelKind> =
                        [Axis::X, Axis::Y, Axis::Z].map(ChannelKind::position).to_vec();
                    moving.append(&mut channels);
                    channels = moving;
                }
                records.push(JointRecord::joint(&row.joint, parent, offset, channels));
            }
            Some(_) if has_children => {
                return Err(TableError::MissingRotationError(row.joint.clone()));
            }
            Some(parent) => records.push(JointRecord::end_site(&row.joint, parent, offset)),
        }
    }

    for joint in rotations.keys() {
        if !hierarchy.iter().any(|row| row.joint == *joint) {
            return Err(BvhError::NotFoundError(format!(
                "joint '{joint}' of the rotation table"
            ))
            .into());
        }
    }

    Ok(Skeleton::from_records(records)?)
}

/// World position columns of a joint, when all three are present
fn position_columns(positions: &FrameTable, joint: &str) -> Option<[usize; 3]> {
    let [x, y, z] = [Axis::X, Axis::Y, Axis::Z]
        .map(|axis| positions.column_index(&column_name(joint, axis)));
    Some([x?, y?, z?])
}

/// Local translations of the non-root joints that leave their offset
///
/// `base` carries the rotations only, so its world rotations are final while
/// its world positions are not; positions come from the table instead.
fn recover_translations(base: &Bvh, positions: &FrameTable, scale: f64) -> Result<Translations> {
    let skeleton = base.skeleton();
    let candidates: Vec<(JointId, JointId, [usize; 3], [usize; 3])> = skeleton
        .animated_joints()
        .filter_map(|(id, joint)| {
            let parent = joint.parent()?;
            let columns = position_columns(positions, joint.name())?;
            let parent_columns = position_columns(positions, skeleton[parent].name())?;
            Some((id, parent, columns, parent_columns))
        })
        .collect();
    if candidates.is_empty() {
        return Ok(Translations::new());
    }
    if positions.len() != base.motion().frame_count() {
        return Err(TableError::FrameCountError {
            positions: positions.len(),
            rotations: base.motion().frame_count(),
        });
    }

    let poses = base.world_poses()?;
    let mut translated = Translations::new();
    for (id, parent, columns, parent_columns) in candidates {
        let offset = skeleton[id].offset();
        let tolerance = TRANSLATION_TOLERANCE * offset.length().max(1.0);
        let mut moved = false;
        let locals: Vec<DVec3> = poses
            .iter()
            .zip(positions.rows())
            .map(|(pose, (_, row))| {
                let at = |[x, y, z]: [usize; 3]| DVec3::new(row[x], row[y], row[z]) * scale;
                let local =
                    pose[parent].rotation().inverse() * (at(columns) - at(parent_columns));
                moved |= local.distance(offset) > tolerance;
                local
            })
            .collect();
        if moved {
            log::debug!(
                "Joint '{}' moves off its offset, adding position channels",
                skeleton[id].name()
            );
            translated.insert(skeleton[id].name().to_string(), locals);
        }
    }
    Ok(translated)
}

/// Where the value of one channel comes from
enum Source<'a> {
    Rotation(usize),
    RootPosition(usize),
    Translation(&'a [DVec3], Axis),
}

/// Fill the motion of `skeleton` from the tables
fn assemble(
    skeleton: Skeleton,
    positions: &FrameTable,
    rotations: &FrameTable,
    translated: &Translations,
    scale: f64,
    frame_time: f64,
) -> Result<Bvh> {
    let mut sources = Vec::with_capacity(skeleton.channel_count());
    for (id, kind) in skeleton.channel_layout() {
        let joint = &skeleton[id];
        let name = column_name(joint.name(), kind.axis());
        let source = if kind.is_rotation() {
            Source::Rotation(
                rotations
                    .column_index(&name)
                    .ok_or(TableError::MissingColumnError(name))?,
            )
        } else if joint.is_root() {
            Source::RootPosition(
                positions
                    .column_index(&name)
                    .ok_or(TableError::MissingColumnError(name))?,
            )
        } else {
            let locals = translated
                .get(joint.name())
                .ok_or(TableError::MissingColumnError(name))?;
            Source::Translation(locals.as_slice(), kind.axis())
        };
        sources.push(source);
    }

    let mut motion = Motion::new(frame_time, skeleton.channel_count())?;
    let mut frame = vec![0.0; sources.len()];
    for (index, (_, rotation_row)) in rotations.rows().enumerate() {
        let position_row = positions.row(index).unwrap_or_default();
        for (value, source) in frame.iter_mut().zip(&sources) {
            *value = match *source {
                Source::Rotation(column) => rotation_row[column],
                Source::RootPosition(column) => position_row[column] * scale,
                Source::Translation(locals, axis) => locals[index][axis.index()],
            };
        }
        motion.push_frame(&frame)?;
    }
    Ok(Bvh::new(skeleton, motion)?)
}

/// Rebuild a document from its three tables
pub fn reconstruct(
    hierarchy: &[HierarchyRow],
    positions: &FrameTable,
    rotations: &FrameTable,
    options: &ImportOptions,
) -> Result<Bvh> {
    if !options.scale.is_finite() || options.scale <= 0.0 {
        return Err(BvhError::ValueError(format!(
            "scale factor must be positive, got {}",
            options.scale
        ))
        .into());
    }

    let root = hierarchy
        .iter()
        .find(|row| row.parent.is_none())
        .map(|row| row.joint.as_str())
        .ok_or_else(|| BvhError::ValidationError("hierarchy has no root".to_string()))?;
    let root_positions = root_position_axes(positions, root)?;
    if !root_positions.is_empty() && positions.len() != rotations.len() {
        return Err(TableError::FrameCountError {
            positions: positions.len(),
            rotations: rotations.len(),
        });
    }

    let axes = rotation_axes(rotations)?;
    let fixed = Translations::new();
    let skeleton = build_skeleton(hierarchy, &root_positions, &axes, &fixed, options.scale)?;
    let frame_time = match options.frame_time {
        Some(frame_time) => frame_time,
        None => rotations.frame_time()?,
    };
    let base = assemble(skeleton, positions, rotations, &fixed, options.scale, frame_time)?;

    let translated = recover_translations(&base, positions, options.scale)?;
    let bvh = if translated.is_empty() {
        base
    } else {
        let skeleton =
            build_skeleton(hierarchy, &root_positions, &axes, &translated, options.scale)?;
        assemble(skeleton, positions, rotations, &translated, options.scale, frame_time)?
    };

    log::debug!(
        "Reconstructed {} joints and {} frames from tables",
        bvh.skeleton().len(),
        bvh.motion().frame_count()
    );
    Ok(bvh)
}

/// Rebuild a document from a [`TableSet`]
pub fn reconstruct_tables(tables: &TableSet, options: &ImportOptions) -> Result<Bvh> {
    reconstruct(&tables.hierarchy, &tables.positions, &tables.rotations, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn hierarchy() -> Vec<HierarchyRow> {
        vec![
            HierarchyRow::new("Hips", None, DVec3::ZERO),
            HierarchyRow::new("Spine", Some("Hips"), DVec3::new(0.0, 1.0, 0.0)),
            HierarchyRow::new("Head", Some("Spine"), DVec3::new(0.0, 1.0, 0.0)),
        ]
    }

    fn rotations(columns: &[&str], rows: &[&[f64]]) -> FrameTable {
        let mut table = FrameTable::new(columns.iter().map(|c| c.to_string()).collect()).unwrap();
        for (i, row) in rows.iter().enumerate() {
            table.push_row(i as f64 * 0.25, row).unwrap();
        }
        table
    }

    #[test]
    fn test_leaf_without_rotation_is_end_site() {
        let rot = rotations(
            &["Hips.z", "Hips.x", "Hips.y", "Spine.y", "Spine.x", "Spine.z"],
            &[&[0.0; 6], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]],
        );
        let positions = FrameTable::new(Vec::new()).unwrap();
        let bvh = reconstruct(&hierarchy(), &positions, &rot, &ImportOptions::default()).unwrap();

        let skeleton = bvh.skeleton();
        assert_eq!(skeleton.channel_count(), 6);
        assert!(skeleton[skeleton.find("Head").unwrap()].is_end_site());
        assert_eq!(
            skeleton[skeleton.find("Spine").unwrap()].rotation_order().unwrap().to_string(),
            "YXZ"
        );
        assert_eq!(bvh.motion().frame_time(), 0.25);
        assert_eq!(bvh.value(1, "Spine", ChannelKind::Zrotation).unwrap(), 6.0);
    }

    #[test]
    fn test_missing_rotation_for_inner_joint() {
        let rot = rotations(&["Hips.z", "Hips.x", "Hips.y"], &[&[0.0; 3], &[0.0; 3]]);
        let positions = FrameTable::new(Vec::new()).unwrap();
        let err = reconstruct(&hierarchy(), &positions, &rot, &ImportOptions::default()).unwrap_err();
        assert!(matches!(err, TableError::MissingRotationError(name) if name == "Spine"));
    }

    #[test]
    fn test_partial_root_position() {
        let rot = rotations(
            &["Hips.z", "Hips.x", "Hips.y", "Spine.z", "Spine.x", "Spine.y"],
            &[&[0.0; 6], &[0.0; 6]],
        );
        let mut positions = FrameTable::new(vec!["Hips.x".to_string(), "Hips.y".to_string()]).unwrap();
        positions.push_row(0.0, &[0.0, 0.0]).unwrap();
        positions.push_row(0.25, &[0.0, 0.0]).unwrap();
        assert!(matches!(
            reconstruct(&hierarchy(), &positions, &rot, &ImportOptions::default()),
            Err(TableError::MissingColumnError(name)) if name == "Hips.z"
        ));
    }

    #[test]
    fn test_joint_off_its_offset_gets_position_channels() {
        let rot = rotations(
            &["Hips.z", "Hips.x", "Hips.y", "Spine.z", "Spine.x", "Spine.y"],
            &[&[0.0; 6], &[0.0; 6]],
        );
        let columns = ["Hips.x", "Hips.y", "Hips.z", "Spine.x", "Spine.y", "Spine.z"];
        let mut positions = FrameTable::new(columns.iter().map(|c| c.to_string()).collect()).unwrap();
        positions.push_row(0.0, &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0]).unwrap();
        positions.push_row(0.25, &[0.0, 0.0, 0.0, 5.0, 20.0, 0.0]).unwrap();
        let bvh = reconstruct(&hierarchy(), &positions, &rot, &ImportOptions::default()).unwrap();

        let skeleton = bvh.skeleton();
        let spine = &skeleton[skeleton.find("Spine").unwrap()];
        assert_eq!(spine.channel_count(), 6);
        assert!(spine.has_position_channels());
        assert_eq!(spine.offset(), DVec3::new(0.0, 1.0, 0.0));
        assert!((bvh.value(0, "Spine", ChannelKind::Yposition).unwrap() - 1.0).abs() < 1e-12);
        assert!((bvh.value(1, "Spine", ChannelKind::Xposition).unwrap() - 5.0).abs() < 1e-12);
        assert!((bvh.value(1, "Spine", ChannelKind::Yposition).unwrap() - 20.0).abs() < 1e-12);
        let pose = bvh.world_pose(1).unwrap();
        assert!((pose[skeleton.find("Head").unwrap()].position() - DVec3::new(5.0, 21.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_rotation_for_unknown_joint() {
        let rot = rotations(
            &["Hips.z", "Hips.x", "Hips.y", "Spine.z", "Spine.x", "Spine.y", "Tail.x", "Tail.y", "Tail.z"],
            &[&[0.0; 9], &[0.0; 9]],
        );
        let positions = FrameTable::new(Vec::new()).unwrap();
        assert!(matches!(
            reconstruct(&hierarchy(), &positions, &rot, &ImportOptions::default()),
            Err(TableError::BvhError(BvhError::NotFoundError(_)))
        ));
    }
}
