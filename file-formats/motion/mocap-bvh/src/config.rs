//! Declarative edit configuration
//!
//! An [`EditConfig`] bundles the edits a batch job applies to a document.
//! With the `serde` feature it can be loaded from JSON, and with the `yaml`
//! feature from YAML:
//!
//! ```yaml
//! scale: 0.01
//! frame_range: { start: 1, end: 10 }
//! rotation_offsets:
//!   LeftArm: [0.0, 0.0, -30.0]
//! offset_mode: composed
//! renames:
//!   mixamorig:Hips: Hips
//! ```

use std::collections::BTreeMap;

use crate::document::Bvh;
use crate::edit::{OffsetMode, RotationOffsets};
use crate::error::{BvhError, Result};

/// 1-based inclusive range of frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameRange {
    /// First frame (1-based)
    pub start: usize,
    /// Last frame (1-based, inclusive)
    pub end: usize,
}

impl FrameRange {
    /// Create a range, rejecting `start == 0` and `start > end`
    pub fn new(start: usize, end: usize) -> Result<Self> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    /// Number of frames covered
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.end - self.start + 1
        }
    }

    /// Always `false` for a valid range
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    fn validate(&self) -> Result<()> {
        if self.start == 0 || self.start > self.end {
            return Err(BvhError::ValueError(format!(
                "frame range [{}, {}] must satisfy 1 <= start <= end",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

/// Edits applied by [`EditConfig::apply`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct EditConfig {
    /// Uniform scale factor for offsets and position channels
    pub scale: f64,
    /// Frames to remove
    pub frame_range: Option<FrameRange>,
    /// Per-joint rotation offsets in degrees
    pub rotation_offsets: RotationOffsets,
    /// How rotation offsets combine with existing values
    pub offset_mode: OffsetMode,
    /// Joint renames, old name to new name
    pub renames: BTreeMap<String, String>,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            frame_range: None,
            rotation_offsets: RotationOffsets::new(),
            offset_mode: OffsetMode::default(),
            renames: BTreeMap::new(),
        }
    }
}

impl EditConfig {
    /// Check values that do not depend on a document
    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(BvhError::ValueError(format!(
                "scale must be positive and finite, got {}",
                self.scale
            )));
        }
        if let Some(range) = &self.frame_range {
            range.validate()?;
        }
        for (name, delta) in &self.rotation_offsets {
            if delta.iter().any(|d| !d.is_finite()) {
                return Err(BvhError::ValueError(format!(
                    "rotation offset for joint '{name}' is not finite"
                )));
            }
        }
        Ok(())
    }

    /// Whether applying the configuration would change nothing
    pub fn is_noop(&self) -> bool {
        self.scale == 1.0
            && self.frame_range.is_none()
            && self.rotation_offsets.is_empty()
            && self.renames.is_empty()
    }

    /// Apply renames, frame removal, rotation offsets and scaling, in that order
    ///
    /// Rotation offsets refer to joints by their names after renaming. The
    /// document is only replaced once every step succeeded.
    pub fn apply(&self, bvh: &mut Bvh) -> Result<()> {
        self.validate()?;
        if self.is_noop() {
            log::debug!("Edit configuration is empty, nothing to apply");
            return Ok(());
        }

        let mut staged = bvh.clone();
        if !self.renames.is_empty() {
            staged.rename_joints(&self.renames)?;
        }
        if let Some(range) = self.frame_range {
            staged.remove_frames(range.start, range.end)?;
        }
        if !self.rotation_offsets.is_empty() {
            staged.apply_rotation_offsets(&self.rotation_offsets, self.offset_mode)?;
        }
        if self.scale != 1.0 {
            staged.scale(self.scale)?;
        }

        *bvh = staged;
        Ok(())
    }

    /// Load a configuration from JSON
    #[cfg(feature = "serde")]
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| BvhError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty-printed JSON
    #[cfg(feature = "serde")]
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| BvhError::ConfigError(e.to_string()))
    }

    /// Load a configuration from YAML
    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self =
            serde_yaml_ng::from_str(text).map_err(|e| BvhError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
