//! Motion editing: rotation offsets and uniform scaling
//!
//! Every operation validates its whole input before touching any data, so a
//! failed call leaves the skeleton and motion unchanged.

use std::collections::BTreeMap;

use crate::error::{BvhError, Result};
use crate::math::AxisOrder;
use crate::motion::Motion;
use crate::skeleton::Skeleton;

/// Per-joint Euler deltas in degrees, listed in each joint's own channel order
pub type RotationOffsets = BTreeMap<String, [f64; 3]>;

/// How a rotation offset is combined with the existing channel values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OffsetMode {
    /// Add the delta to each Euler angle
    #[default]
    Additive,
    /// Post-multiply the joint rotation by the delta rotation and decompose
    /// the result back into the joint's axis order
    Composed,
}

struct OffsetTarget {
    /// Absolute frame indices of the rotation channels, in axis order
    channels: [usize; 3],
    order: AxisOrder,
    delta: [f64; 3],
}

/// Apply rotation offsets to every frame
///
/// Fails with [`BvhError::NotFoundError`] if a named joint does not exist or
/// has no rotation channels. An empty offset map is a no-op.
pub fn apply_rotation_offsets(
    skeleton: &Skeleton,
    motion: &mut Motion,
    offsets: &RotationOffsets,
    mode: OffsetMode,
) -> Result<()> {
    motion.check_layout(skeleton)?;
    if offsets.is_empty() {
        log::warn!("No rotation offsets given, motion left unchanged");
        return Ok(());
    }

    let mut targets = Vec::with_capacity(offsets.len());
    for (name, delta) in offsets {
        let joint = &skeleton[skeleton.find(name)?];
        let (slots, order) = joint
            .rotation_slots()
            .zip(joint.rotation_order())
            .ok_or_else(|| {
                BvhError::NotFoundError(format!("rotation channels of joint '{name}'"))
            })?;
        if delta.iter().any(|d| !d.is_finite()) {
            return Err(BvhError::ValueError(format!(
                "rotation offset for joint '{name}' is not finite: {delta:?}"
            )));
        }
        targets.push(OffsetTarget {
            channels: slots.map(|slot| joint.channel_offset() + slot),
            order,
            delta: *delta,
        });
    }

    for frame in motion.frames_mut() {
        for target in &targets {
            let current = target.channels.map(|channel| frame[channel]);
            let updated = match mode {
                OffsetMode::Additive => [
                    current[0] + target.delta[0],
                    current[1] + target.delta[1],
                    current[2] + target.delta[2],
                ],
                OffsetMode::Composed => {
                    let q = target.order.to_quat(current) * target.order.to_quat(target.delta);
                    target.order.euler_from_quat(q)
                }
            };
            for (channel, value) in target.channels.into_iter().zip(updated) {
                frame[channel] = value;
            }
        }
    }

    log::debug!(
        "Applied {:?} rotation offsets to {} joints over {} frames",
        mode,
        targets.len(),
        motion.frame_count()
    );
    Ok(())
}

/// Multiply all offsets (end sites included) and every position channel by `factor`
///
/// Rotations are left untouched. `factor` must be positive and finite.
pub fn scale(skeleton: &mut Skeleton, motion: &mut Motion, factor: f64) -> Result<()> {
    motion.check_layout(skeleton)?;
    if !factor.is_finite() || factor <= 0.0 {
        return Err(BvhError::ValueError(format!(
            "scale factor must be positive and finite, got {factor}"
        )));
    }

    let position_channels: Vec<usize> = skeleton
        .channel_layout()
        .enumerate()
        .filter(|(_, (_, kind))| kind.is_position())
        .map(|(channel, _)| channel)
        .collect();

    skeleton.scale_offsets(factor);
    motion.scale_channels(&position_channels, factor);
    log::debug!(
        "Scaled skeleton and {} position channels by {factor}",
        position_channels.len()
    );
    Ok(())
}
