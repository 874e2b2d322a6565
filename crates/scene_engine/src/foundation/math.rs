//! Math utilities and types
//!
//! Provides the value types attributes and config values are built from.

use serde::{Deserialize, Serialize};

pub use nalgebra::{Matrix3, Matrix3x4, Matrix4, Quaternion, UnitQuaternion, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 3x4 matrix type (affine transform without the projective row)
pub type Mat3x4 = Matrix3x4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// RGBA color with floating point channels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
    /// Alpha channel
    pub a: f32,
}

impl Color {
    /// Opaque white
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Create a color from its four channels
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Integer rectangle given by its edges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRect {
    /// Left edge
    pub left: i32,
    /// Top edge
    pub top: i32,
    /// Right edge
    pub right: i32,
    /// Bottom edge
    pub bottom: i32,
}

impl IntRect {
    /// Create a rectangle from its edges
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }
}

/// Integer 2D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntVector2 {
    /// X component
    pub x: i32,
    /// Y component
    pub y: i32,
}

impl IntVector2 {
    /// Create a new integer vector
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Integer point, used by UI-facing attributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

impl Point {
    /// Create a new point
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Transform stored as position, euler rotation in degrees and scale
///
/// This is the layout placeable attributes carry on the wire, so rotation is
/// kept as euler angles rather than a quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position in 3D space
    pub pos: Vec3,

    /// Rotation as euler angles in degrees (x, y, z)
    pub rot: Vec3,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            pos: Vec3::zeros(),
            rot: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(pos: Vec3) -> Self {
        Self {
            pos,
            ..Default::default()
        }
    }

    /// Create a transform from all three parts
    pub const fn new(pos: Vec3, rot: Vec3, scale: Vec3) -> Self {
        Self { pos, rot, scale }
    }

    /// The nine floats of this transform in wire order
    #[rustfmt::skip]
    pub fn to_array(&self) -> [f32; 9] {
        [
            self.pos.x, self.pos.y, self.pos.z,
            self.rot.x, self.rot.y, self.rot.z,
            self.scale.x, self.scale.y, self.scale.z,
        ]
    }

    /// Build a transform from nine floats in wire order
    pub fn from_array(v: [f32; 9]) -> Self {
        Self {
            pos: Vec3::new(v[0], v[1], v[2]),
            rot: Vec3::new(v[3], v[4], v[5]),
            scale: Vec3::new(v[6], v[7], v[8]),
        }
    }
}
