//! Rotation and rigid transform math
//!
//! Euler triples are expressed in degrees and listed in the axis order of the
//! joint they belong to, exactly as they appear in the motion data. Radians are
//! only used internally.
//!
//! An [`AxisOrder`] of `ZXY` means the rotation matrix is `Rz(a) * Rx(b) * Ry(c)`,
//! i.e. intrinsic rotations applied in channel order. This matches how BVH
//! rotation channels are composed.

use std::fmt;
use std::str::FromStr;

use glam::{DAffine3, DMat3, DQuat, DVec3};

use crate::error::{BvhError, Result};

/// Threshold below which derived values are snapped to zero by [`prune`]
pub const DEFAULT_PRUNE_EPSILON: f64 = 1e-8;

/// `cos(b)` below this is treated as gimbal lock during decomposition
const GIMBAL_EPSILON: f64 = 1e-10;

/// Cartesian axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    /// X axis
    X,
    /// Y axis
    Y,
    /// Z axis
    Z,
}

impl Axis {
    /// Component index of this axis in an (x, y, z) triple
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Unit vector along this axis
    pub fn unit(self) -> DVec3 {
        match self {
            Axis::X => DVec3::X,
            Axis::Y => DVec3::Y,
            Axis::Z => DVec3::Z,
        }
    }

    /// Upper-case axis letter
    pub fn letter(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
        }
    }

    /// Parse an axis letter (case-insensitive)
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'X' => Some(Axis::X),
            'Y' => Some(Axis::Y),
            'Z' => Some(Axis::Z),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Order in which three rotation channels are composed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(clippy::upper_case_acronyms)]
pub enum AxisOrder {
    /// `Rx * Ry * Rz`
    XYZ,
    /// `Rx * Rz * Ry`
    XZY,
    /// `Ry * Rx * Rz`
    YXZ,
    /// `Ry * Rz * Rx`
    YZX,
    /// `Rz * Rx * Ry`
    ZXY,
    /// `Rz * Ry * Rx`
    ZYX,
}

impl AxisOrder {
    /// All six orders
    pub const ALL: [AxisOrder; 6] = [
        AxisOrder::XYZ,
        AxisOrder::XZY,
        AxisOrder::YXZ,
        AxisOrder::YZX,
        AxisOrder::ZXY,
        AxisOrder::ZYX,
    ];

    /// The three axes in composition order
    pub fn axes(self) -> [Axis; 3] {
        match self {
            AxisOrder::XYZ => [Axis::X, Axis::Y, Axis::Z],
            AxisOrder::XZY => [Axis::X, Axis::Z, Axis::Y],
            AxisOrder::YXZ => [Axis::Y, Axis::X, Axis::Z],
            AxisOrder::YZX => [Axis::Y, Axis::Z, Axis::X],
            AxisOrder::ZXY => [Axis::Z, Axis::X, Axis::Y],
            AxisOrder::ZYX => [Axis::Z, Axis::Y, Axis::X],
        }
    }

    /// Build an order from three axes, which must all be distinct
    pub fn from_axes(axes: [Axis; 3]) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|order| order.axes() == axes)
            .ok_or_else(|| {
                BvhError::MathError(format!(
                    "axis order must name X, Y and Z exactly once, got {}{}{}",
                    axes[0], axes[1], axes[2]
                ))
            })
    }

    /// Whether the order is a cyclic permutation of XYZ
    pub fn is_cyclic(self) -> bool {
        matches!(self, AxisOrder::XYZ | AxisOrder::YZX | AxisOrder::ZXY)
    }

    /// Pick the components of an (x, y, z) triple in this order
    pub fn reorder(self, xyz: DVec3) -> [f64; 3] {
        self.axes().map(|axis| xyz[axis.index()])
    }

    /// Inverse of [`AxisOrder::reorder`]
    pub fn to_xyz(self, ordered: [f64; 3]) -> DVec3 {
        let mut xyz = DVec3::ZERO;
        for (axis, value) in self.axes().into_iter().zip(ordered) {
            xyz[axis.index()] = value;
        }
        xyz
    }

    /// Quaternion for an Euler triple given in degrees, in this order
    pub fn to_quat(self, angles: [f64; 3]) -> DQuat {
        self.axes()
            .into_iter()
            .zip(angles)
            .fold(DQuat::IDENTITY, |q, (axis, degrees)| {
                q * DQuat::from_axis_angle(axis.unit(), degrees.to_radians())
            })
    }

    /// Rotation matrix for an Euler triple given in degrees, in this order
    pub fn to_mat3(self, angles: [f64; 3]) -> DMat3 {
        self.axes()
            .into_iter()
            .zip(angles)
            .fold(DMat3::IDENTITY, |m, (axis, degrees)| {
                m * DMat3::from_axis_angle(axis.unit(), degrees.to_radians())
            })
    }

    /// Decompose a rotation matrix into an Euler triple in degrees, in this order
    ///
    /// The middle angle lies in `[-90, 90]`. At gimbal lock the last angle is
    /// reported as zero and folded into the first.
    pub fn euler_from_mat3(self, m: &DMat3) -> [f64; 3] {
        let [i, j, k] = self.axes().map(Axis::index);
        let s = if self.is_cyclic() { 1.0 } else { -1.0 };
        let el = |row: usize, col: usize| m.col(col)[row];

        let cos_b = el(i, i).hypot(el(i, j));
        let b = (s * el(i, k)).atan2(cos_b);
        let (a, c) = if cos_b > GIMBAL_EPSILON {
            (
                (-s * el(j, k)).atan2(el(k, k)),
                (-s * el(i, j)).atan2(el(i, i)),
            )
        } else {
            ((s * el(k, j)).atan2(el(j, j)), 0.0)
        };

        [a.to_degrees(), b.to_degrees(), c.to_degrees()]
    }

    /// Decompose a quaternion into an Euler triple in degrees, in this order
    pub fn euler_from_quat(self, q: DQuat) -> [f64; 3] {
        self.euler_from_mat3(&DMat3::from_quat(q))
    }
}

impl fmt::Display for AxisOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in self.axes() {
            write!(f, "{axis}")?;
        }
        Ok(())
    }
}

impl FromStr for AxisOrder {
    type Err = BvhError;

    fn from_str(s: &str) -> Result<Self> {
        let letters: Vec<char> = s.trim().chars().collect();
        let axes = match letters.as_slice() {
            [a, b, c] => [a, b, c].map(|letter| Axis::from_letter(*letter)),
            _ => {
                return Err(BvhError::MathError(format!(
                    "axis order '{s}' must have exactly three letters"
                )));
            }
        };
        match axes {
            [Some(a), Some(b), Some(c)] => Self::from_axes([a, b, c]),
            _ => Err(BvhError::MathError(format!(
                "axis order '{s}' contains a letter other than X, Y or Z"
            ))),
        }
    }
}

/// Rigid transform: rotation followed by translation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    /// Rotation part
    pub rotation: DQuat,
    /// Translation part
    pub translation: DVec3,
}

impl Transform {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        rotation: DQuat::IDENTITY,
        translation: DVec3::ZERO,
    };

    /// Create a transform from its parts
    pub fn new(rotation: DQuat, translation: DVec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Pure translation
    pub fn from_translation(translation: DVec3) -> Self {
        Self::new(DQuat::IDENTITY, translation)
    }

    /// `self ∘ local`: `local` is expressed in the coordinate frame of `self`
    pub fn compose(&self, local: &Self) -> Self {
        Self {
            rotation: self.rotation * local.rotation,
            translation: self.translation + self.rotation * local.translation,
        }
    }

    /// Apply the transform to a point
    pub fn transform_point(&self, p: DVec3) -> DVec3 {
        self.rotation * p + self.translation
    }

    /// Rotation part as a 3x3 matrix
    pub fn rotation_matrix(&self) -> DMat3 {
        DMat3::from_quat(self.rotation)
    }

    /// Full transform as an affine matrix
    pub fn to_affine(&self) -> DAffine3 {
        DAffine3::from_rotation_translation(self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std::ops::Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Self) -> Self::Output {
        self.compose(&rhs)
    }
}

/// Snap components whose magnitude is below `epsilon` to zero
pub fn prune(v: DVec3, epsilon: f64) -> DVec3 {
    DVec3::select(v.abs().cmplt(DVec3::splat(epsilon)), DVec3::ZERO, v)
}
