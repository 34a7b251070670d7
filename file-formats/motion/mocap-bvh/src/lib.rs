//! Reading, editing and writing BVH (Biovision Hierarchy) motion capture files.
//!
//! A BVH document describes one skeleton (a tree of joints with rest-pose
//! offsets and animated channels) and a motion: a fixed frame time and one row
//! of channel values per frame.
//!
//! # Examples
//!
//! ```
//! use mocap_bvh::{Bvh, ChannelKind};
//!
//! let text = "\
//! HIERARCHY
//! ROOT Hips
//! {
//!   OFFSET 0 0 0
//!   CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
//!   End Site
//!   {
//!     OFFSET 0 10 0
//!   }
//! }
//! MOTION
//! Frames: 1
//! Frame Time: 0.0333333
//! 1 2 3 0 0 90
//! ";
//!
//! let bvh: Bvh = text.parse()?;
//! assert_eq!(bvh.value(0, "Hips", ChannelKind::Yrotation)?, 90.0);
//!
//! let pose = bvh.world_pose(0)?;
//! let tip = pose.position(bvh.joint("Hips_End")?).unwrap();
//! assert!((tip.y - 12.0).abs() < 1e-9);
//! # Ok::<(), mocap_bvh::BvhError>(())
//! ```

#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod document;
pub mod edit;
pub mod error;
pub mod kinematics;
pub mod math;
pub mod motion;
pub mod parser;
pub mod skeleton;
pub mod writer;

pub use config::{EditConfig, FrameRange};
pub use document::Bvh;
pub use edit::{OffsetMode, RotationOffsets};
pub use error::{BvhError, Result};
pub use kinematics::{JointPose, WorldPose, forward_kinematics};
pub use math::{Axis, AxisOrder, Transform};
pub use motion::Motion;
pub use parser::BvhParser;
pub use skeleton::{ChannelKind, Joint, JointId, JointRecord, Skeleton};
pub use writer::BvhWriter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
