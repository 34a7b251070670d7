//! In-memory table types

use std::collections::HashSet;

use glam::DVec3;
use mocap_bvh::Axis;

use crate::error::{Result, TableError};

/// Name of the leading time column
pub const TIME_COLUMN: &str = "time";

/// One joint of the hierarchy table
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HierarchyRow {
    /// Joint (or end site) name
    pub joint: String,
    /// Parent name, `None` for the root
    pub parent: Option<String>,
    /// Offset from the parent
    pub offset: DVec3,
}

impl HierarchyRow {
    /// Create a row
    pub fn new(joint: impl Into<String>, parent: Option<&str>, offset: DVec3) -> Self {
        Self {
            joint: joint.into(),
            parent: parent.map(str::to_string),
            offset,
        }
    }

    /// Column names of the hierarchy table
    pub fn header() -> [&'static str; 5] {
        ["joint", "parent", "offset.x", "offset.y", "offset.z"]
    }
}

/// Column name for one axis of a joint, e.g. `Hips.x`
pub fn column_name(joint: &str, axis: Axis) -> String {
    format!("{joint}.{}", axis.letter().to_ascii_lowercase())
}

/// Split a `<joint>.<axis>` column name
///
/// The joint part may itself contain dots; the axis is the part after the last one.
pub fn split_column(name: &str) -> Result<(&str, Axis)> {
    let (joint, axis) = name
        .rsplit_once('.')
        .ok_or_else(|| TableError::ColumnNameError(name.to_string()))?;
    let mut letters = axis.chars();
    match (letters.next().and_then(Axis::from_letter), letters.next()) {
        (Some(axis), None) if !joint.is_empty() => Ok((joint, axis)),
        _ => Err(TableError::ColumnNameError(name.to_string())),
    }
}

/// Time-indexed table with one row per frame
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameTable {
    columns: Vec<String>,
    times: Vec<f64>,
    values: Vec<f64>,
}

impl FrameTable {
    /// Create an empty table; the time column is implicit
    pub fn new(columns: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if column == TIME_COLUMN || !seen.insert(column.as_str()) {
                return Err(TableError::DuplicateColumnError(column.clone()));
            }
        }
        Ok(Self {
            columns,
            times: Vec::new(),
            values: Vec::new(),
        })
    }

    /// Append a row
    pub fn push_row(&mut self, time: f64, values: &[f64]) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(TableError::RowWidthError {
                row: self.times.len(),
                found: values.len(),
                expected: self.columns.len(),
            });
        }
        self.times.push(time);
        self.values.extend_from_slice(values);
        Ok(())
    }

    /// Data columns, without the time column
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Full header: `time` followed by the data columns
    pub fn header(&self) -> Vec<&str> {
        std::iter::once(TIME_COLUMN)
            .chain(self.columns.iter().map(String::as_str))
            .collect()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The time column
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Data values of one row
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        let width = self.columns.len();
        (index < self.len()).then(|| &self.values[index * width..(index + 1) * width])
    }

    /// `(time, values)` pairs
    pub fn rows(&self) -> impl ExactSizeIterator<Item = (f64, &[f64])> + '_ {
        let width = self.columns.len();
        self.times
            .iter()
            .enumerate()
            .map(move |(i, &time)| (time, &self.values[i * width..(i + 1) * width]))
    }

    /// Index of a data column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one data column
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let index = self
            .column_index(name)
            .ok_or_else(|| TableError::MissingColumnError(name.to_string()))?;
        Ok(self.rows().map(|(_, row)| row[index]).collect())
    }

    /// Average frame duration: last timestamp over the number of intervals
    pub fn frame_time(&self) -> Result<f64> {
        let intervals = self.len().saturating_sub(1);
        let last = self.times.last().copied().unwrap_or_default();
        if intervals == 0 {
            return Err(TableError::FrameTimeError(format!(
                "{} rows are not enough to measure a frame interval",
                self.len()
            )));
        }
        let frame_time = last / intervals as f64;
        if !frame_time.is_finite() || frame_time <= 0.0 {
            return Err(TableError::FrameTimeError(format!(
                "time column ends at {last}"
            )));
        }
        Ok(frame_time)
    }
}

/// The three tables describing one document
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableSet {
    /// One row per joint and end site, in pre-order
    pub hierarchy: Vec<HierarchyRow>,
    /// Raw rotation channel values per frame
    pub rotations: FrameTable,
    /// World positions per frame
    pub positions: FrameTable,
}
