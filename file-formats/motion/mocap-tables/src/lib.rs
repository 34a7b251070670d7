//! Tabular views of BVH motion capture data.
//!
//! A document is split into three tables: the hierarchy (one row per joint
//! with its parent and offset), the raw rotation channel values per frame, and
//! the world position of every joint per frame. The hierarchy and rotation
//! tables, together with the root's world position, are enough to rebuild the
//! document.
//!
//! # Examples
//!
//! ```
//! use mocap_bvh::Bvh;
//! use mocap_tables::{ExportOptions, ImportOptions, export_tables, reconstruct_tables};
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
//! Frames: 2
//! Frame Time: 0.5
//! 0 90 0 0 0 0
//! 1 90 0 0 0 45
//! ";
//!
//! let bvh: Bvh = text.parse()?;
//! let tables = export_tables(&bvh, &ExportOptions::default())?;
//! assert_eq!(tables.rotations.header(), ["time", "Hips.z", "Hips.x", "Hips.y"]);
//!
//! let rebuilt = reconstruct_tables(&tables, &ImportOptions::default())?;
//! assert_eq!(rebuilt.motion().frame_count(), 2);
//! # Ok::<(), mocap_tables::TableError>(())
//! ```

#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod export;
pub mod reconstruct;
pub mod table;

pub use error::{Result, TableError};
pub use export::{ExportOptions, export_tables, hierarchy_table, position_table, rotation_table};
pub use reconstruct::{ImportOptions, reconstruct, reconstruct_tables};
pub use table::{FrameTable, HierarchyRow, TIME_COLUMN, TableSet, column_name, split_column};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
