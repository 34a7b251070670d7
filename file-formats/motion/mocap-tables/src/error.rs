//! Error types for table export and reconstruction

use mocap_bvh::BvhError;
use thiserror::Error;

/// Errors that can occur when building or reading motion tables
#[derive(Debug, Error)]
pub enum TableError {
    /// Error from the underlying BVH model
    #[error(transparent)]
    BvhError(#[from] BvhError),

    /// A required column is absent
    #[error("Missing column: {0}")]
    MissingColumnError(String),

    /// A column name does not have the form `<joint>.<axis>`
    #[error("Malformed column name '{0}': expected <joint>.<x|y|z>")]
    ColumnNameError(String),

    /// The same column appears twice in one table
    #[error("Duplicate column: {0}")]
    DuplicateColumnError(String),

    /// A row does not have one value per column
    #[error("Row {row} has {found} values, expected {expected}")]
    RowWidthError {
        /// 0-based row index
        row: usize,
        /// Values supplied
        found: usize,
        /// Number of columns
        expected: usize,
    },

    /// Position and rotation tables disagree on the number of frames
    #[error("Frame count mismatch: {positions} position rows, {rotations} rotation rows")]
    FrameCountError {
        /// Rows in the position table
        positions: usize,
        /// Rows in the rotation table
        rotations: usize,
    },

    /// Joints that need rotation channels have no rotation columns
    #[error("No rotation data for joints: {0}")]
    MissingRotationError(String),

    /// The frame time cannot be derived from the time column
    #[error("Cannot derive frame time: {0}")]
    FrameTimeError(String),
}

/// Type alias for Results from table operations
pub type Result<T> = std::result::Result<T, TableError>;
