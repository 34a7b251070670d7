//! Error handling for BVH parsing, editing and kinematics

use std::io;
use thiserror::Error;

/// Errors that can occur when working with BVH motion capture data
#[derive(Debug, Error)]
pub enum BvhError {
    /// An I/O error occurred while reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed or inconsistent input text
    #[error("Parse error at line {line}: {message}")]
    ParseError {
        /// 1-based line number the problem was detected on
        line: usize,
        /// Description of the problem
        message: String,
    },

    /// A joint name is already used by another joint of the skeleton
    #[error("Duplicate joint name: '{0}'")]
    DuplicateNameError(String),

    /// A joint (or a joint with the requested channels) does not exist
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// A 1-based inclusive frame range that does not fit the motion
    #[error("Invalid frame range [{start}, {end}] for a motion with {frame_count} frames")]
    RangeError {
        /// First frame of the range (1-based)
        start: usize,
        /// Last frame of the range (1-based, inclusive)
        end: usize,
        /// Number of frames in the motion
        frame_count: usize,
    },

    /// Out-of-bounds frame, joint or channel access
    #[error("Index out of range: {0}")]
    IndexError(String),

    /// Channel layout of the motion does not match the skeleton
    #[error("Consistency error: {0}")]
    ConsistencyError(String),

    /// Invalid configuration value
    #[error("Invalid value: {0}")]
    ValueError(String),

    /// Invalid rotation axis order specifier
    #[error("Math error: {0}")]
    MathError(String),

    /// Structural violation found while building a skeleton
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A configuration document could not be deserialized
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl BvhError {
    /// Shorthand for a [`BvhError::ParseError`] at `line`
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }
}

/// Type alias for Results from BVH operations
pub type Result<T> = std::result::Result<T, BvhError>;
