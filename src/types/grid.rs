//! Grid extents with the hard per-axis cap

use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

/// Extents of a voxel grid, each axis clamped to `[1, GridSize::MAX_AXIS]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    x: usize,
    y: usize,
    z: usize,
}

impl GridSize {
    /// Hard cap on cells per axis
    pub const MAX_AXIS: usize = 64;

    /// Create a grid size, clamping every axis into `[1, MAX_AXIS]`
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        GridSize {
            x: clamp_axis(x),
            y: clamp_axis(y),
            z: clamp_axis(z),
        }
    }

    /// Cube-shaped grid
    pub fn cubic(n: i32) -> Self {
        GridSize::new(n, n, n)
    }

    /// Cells along X
    #[inline(always)]
    pub fn x(&self) -> usize {
        self.x
    }

    /// Cells along Y
    #[inline(always)]
    pub fn y(&self) -> usize {
        self.y
    }

    /// Cells along Z
    #[inline(always)]
    pub fn z(&self) -> usize {
        self.z
    }

    /// Extents as an integer vector
    pub fn as_ivec3(&self) -> IVec3 {
        IVec3::new(self.x as i32, self.y as i32, self.z as i32)
    }

    /// Total number of cells
    #[inline]
    pub fn volume(&self) -> usize {
        self.x * self.y * self.z
    }

    /// Cells in one X slab (a full YZ plane)
    #[inline(always)]
    pub fn slab_len(&self) -> usize {
        self.y * self.z
    }

    /// Cell-space center, `(size - 1) / 2` per axis
    #[inline]
    pub fn center(&self) -> Vec3 {
        Vec3::new(
            (self.x as f32 - 1.0) * 0.5,
            (self.y as f32 - 1.0) * 0.5,
            (self.z as f32 - 1.0) * 0.5,
        )
    }

    /// Whether a signed cell coordinate lies inside the grid
    #[inline(always)]
    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as usize) < self.x
            && (y as usize) < self.y
            && (z as usize) < self.z
    }

    /// Flat index of an in-bounds cell (X-major, Z fastest)
    #[inline(always)]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (x * self.y + y) * self.z + z
    }

    /// Flat index of a signed coordinate, `None` outside the grid
    #[inline(always)]
    pub fn checked_index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        self.contains(x, y, z)
            .then(|| self.index(x as usize, y as usize, z as usize))
    }
}

impl Default for GridSize {
    fn default() -> Self {
        GridSize::cubic(16)
    }
}

#[inline]
fn clamp_axis(v: i32) -> usize {
    v.clamp(1, GridSize::MAX_AXIS as i32) as usize
}
