//! A parsed BVH document: one skeleton plus its motion

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

use crate::edit::{self, OffsetMode, RotationOffsets};
use crate::error::{BvhError, Result};
use crate::kinematics::{self, WorldPose};
use crate::motion::Motion;
use crate::parser::BvhParser;
use crate::skeleton::{ChannelKind, JointId, Skeleton};
use crate::writer::BvhWriter;

/// Skeleton and motion whose channel layouts are guaranteed to agree
#[derive(Debug, Clone, PartialEq)]
pub struct Bvh {
    skeleton: Skeleton,
    motion: Motion,
}

impl Bvh {
    /// Pair a skeleton with motion data
    pub fn new(skeleton: Skeleton, motion: Motion) -> Result<Self> {
        motion.check_layout(&skeleton)?;
        Ok(Self { skeleton, motion })
    }

    /// Parse a document from text
    pub fn parse(text: &str) -> Result<Self> {
        BvhParser::new().parse(text)
    }

    /// Parse a document from a reader
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        BvhParser::new().parse_reader(reader)
    }

    /// Parse a document from a file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        log::debug!("Reading BVH file {}", path.as_ref().display());
        Self::from_reader(&mut BufReader::new(file))
    }

    /// Write the document to a file in canonical layout
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        log::debug!("Writing BVH file {}", path.as_ref().display());
        self.write_to(BufWriter::new(file))
    }

    /// Write the document in canonical layout
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        BvhWriter::new(writer).write(self)
    }

    /// Canonical text form
    pub fn to_bvh_string(&self) -> Result<String> {
        let mut writer = BvhWriter::new(Vec::new());
        writer.write(self)?;
        String::from_utf8(writer.into_inner())
            .map_err(|e| BvhError::ConsistencyError(format!("written text is not UTF-8: {e}")))
    }

    /// The skeleton
    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// The motion data
    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    /// Split into skeleton and motion
    pub fn into_parts(self) -> (Skeleton, Motion) {
        (self.skeleton, self.motion)
    }

    /// Look up a joint by name
    pub fn joint(&self, name: &str) -> Result<JointId> {
        self.skeleton.find(name)
    }

    /// Value of a named joint's channel in a 0-based frame
    pub fn value(&self, frame: usize, joint: &str, kind: ChannelKind) -> Result<f64> {
        let id = self.skeleton.find(joint)?;
        self.motion.joint_value(&self.skeleton, frame, id, kind)
    }

    /// Overwrite a named joint's channel in a 0-based frame
    pub fn set_value(&mut self, frame: usize, joint: &str, kind: ChannelKind, value: f64) -> Result<()> {
        let id = self.skeleton.find(joint)?;
        self.motion
            .set_joint_value(&self.skeleton, frame, id, kind, value)
    }

    /// All channel values of a named joint in a 0-based frame
    pub fn joint_values(&self, frame: usize, joint: &str) -> Result<&[f64]> {
        let id = self.skeleton.find(joint)?;
        self.motion.joint_values(&self.skeleton, frame, id)
    }

    /// One channel of a named joint across all frames
    pub fn channel_column(&self, joint: &str, kind: ChannelKind) -> Result<Vec<f64>> {
        let id = self.skeleton.find(joint)?;
        let channel = self.skeleton.channel_index(id, kind)?;
        self.motion.channel_column(channel)
    }

    /// Append a frame of channel values
    pub fn push_frame(&mut self, values: &[f64]) -> Result<()> {
        self.motion.push_frame(values)
    }

    /// Change the frame duration
    pub fn set_frame_time(&mut self, frame_time: f64) -> Result<()> {
        self.motion.set_frame_time(frame_time)
    }

    /// World transforms of every joint in a 0-based frame
    pub fn world_pose(&self, frame: usize) -> Result<WorldPose> {
        kinematics::forward_kinematics(&self.skeleton, &self.motion, frame)
    }

    /// World transforms of every joint in every frame
    pub fn world_poses(&self) -> Result<Vec<WorldPose>> {
        #[cfg(feature = "parallel")]
        {
            kinematics::par_world_poses(&self.skeleton, &self.motion)
        }
        #[cfg(not(feature = "parallel"))]
        {
            kinematics::world_poses(&self.skeleton, &self.motion)
        }
    }

    /// Remove the 1-based inclusive frame range `[start, end]`
    pub fn remove_frames(&mut self, start: usize, end: usize) -> Result<()> {
        self.motion.remove_frames(start, end)
    }

    /// Add per-joint Euler offsets to the rotation channels of every frame
    pub fn apply_rotation_offsets(&mut self, offsets: &RotationOffsets, mode: OffsetMode) -> Result<()> {
        edit::apply_rotation_offsets(&self.skeleton, &mut self.motion, offsets, mode)
    }

    /// Uniformly scale offsets and position channels
    pub fn scale(&mut self, factor: f64) -> Result<()> {
        edit::scale(&mut self.skeleton, &mut self.motion, factor)
    }

    /// Rename one joint
    pub fn rename_joint(&mut self, old: &str, new: &str) -> Result<()> {
        let id = self.skeleton.find(old)?;
        self.skeleton.rename(id, new)
    }

    /// Rename several joints at once, all or nothing
    pub fn rename_joints(&mut self, mapping: &BTreeMap<String, String>) -> Result<usize> {
        self.skeleton.rename_joints(mapping)
    }
}

impl FromStr for Bvh {
    type Err = BvhError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Bvh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_bvh_string().map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}
