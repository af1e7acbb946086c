//! Container types: Color, Transform, Aabb

use glam::{Affine3A, Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Linear RGBA color
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
    /// Opaque black, written by `clear`
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    /// Opaque white
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    /// Transparent black, returned for out-of-bounds samples
    pub const CLEAR: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    /// Create a color from its four channels
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { r, g, b, a }
    }

    /// Create an opaque color
    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Color { r, g, b, a: 1.0 }
    }

    /// Channels as a vector (r, g, b, a)
    #[inline(always)]
    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(self.r, self.g, self.b, self.a)
    }

    /// Build from a vector (r, g, b, a)
    #[inline(always)]
    pub fn from_vec4(v: Vec4) -> Self {
        Color::new(v.x, v.y, v.z, v.w)
    }

    /// Unclamped linear interpolation
    #[inline(always)]
    pub fn lerp(self, other: Color, t: f32) -> Color {
        Color::from_vec4(self.to_vec4().lerp(other.to_vec4(), t))
    }

    /// Fold `sample` into a running mean that already holds `count` samples
    #[inline(always)]
    pub fn running_mean(self, sample: Color, count: u32) -> Color {
        let n = count as f32;
        Color::from_vec4((self.to_vec4() * n + sample.to_vec4()) / (n + 1.0))
    }

    /// Mean absolute difference over the RGB channels
    #[inline]
    pub fn rgb_distance(self, other: Color) -> f32 {
        ((self.r - other.r).abs() + (self.g - other.g).abs() + (self.b - other.b).abs()) / 3.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::CLEAR
    }
}

/// Rigid placement of an object: position, rotation and (possibly non-uniform) scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// World position
    pub position: Vec3,
    /// World rotation
    pub rotation: Quat,
    /// Local scale
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Transform with a translation only
    pub fn from_position(position: Vec3) -> Self {
        Transform {
            position,
            ..Transform::IDENTITY
        }
    }

    /// Builder: replace the rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder: replace the scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Local-to-world matrix
    #[inline]
    pub fn matrix(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// World-to-local matrix
    #[inline]
    pub fn inverse_matrix(&self) -> Affine3A {
        self.matrix().inverse()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::IDENTITY
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB
    #[inline]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Aabb { min, max }
    }

    /// Create an empty (inverted) AABB
    #[inline]
    pub fn empty() -> Self {
        Aabb {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    /// Create from center and half-extents
    pub fn from_center_extents(center: Vec3, half_extents: Vec3) -> Self {
        Aabb {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Bounds of a point set, `None` when empty
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut aabb = Aabb::empty();
        let mut any = false;
        for p in points {
            aabb.expand_point(p);
            any = true;
        }
        any.then_some(aabb)
    }

    /// Expand to include a point
    #[inline]
    pub fn expand_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Get center point
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get size
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Get half-extents
    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Product of the extents
    #[inline]
    pub fn volume(&self) -> f32 {
        let s = self.size().max(Vec3::ZERO);
        s.x * s.y * s.z
    }

    /// Check if point is inside (boundary inclusive)
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Squared distance from a point to the box, zero inside
    #[inline(always)]
    pub fn distance_squared(&self, point: Vec3) -> f32 {
        let d = (self.min - point).max(point - self.max).max(Vec3::ZERO);
        d.length_squared()
    }
}
