//! Dense density + color storage shared by the field and the scan buffer

use crate::types::{Color, GridSize};

/// A dense density/color grid
///
/// Both arrays are always exactly `size.volume()` long; every resize swaps
/// them together.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    size: GridSize,
    density: Vec<f32>,
    color: Vec<Color>,
}

impl VoxelGrid {
    /// Allocate a grid of zero density and transparent color
    pub fn new(size: GridSize) -> Self {
        VoxelGrid {
            size,
            density: vec![0.0; size.volume()],
            color: vec![Color::CLEAR; size.volume()],
        }
    }

    /// Grid extents
    #[inline(always)]
    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Flat density array (X-major, Z fastest)
    #[inline]
    pub fn densities(&self) -> &[f32] {
        &self.density
    }

    /// Flat color array, same layout as [`densities`](Self::densities)
    #[inline]
    pub fn colors(&self) -> &[Color] {
        &self.color
    }

    /// Both arrays, mutably, for slab-partitioned writers
    #[inline]
    pub fn split_mut(&mut self) -> (&mut [f32], &mut [Color]) {
        (&mut self.density, &mut self.color)
    }

    /// Reallocate to new extents
    ///
    /// With `preserve`, the region overlapping the old extents keeps its
    /// contents; everything else starts at zero density and transparent color.
    pub fn resize(&mut self, size: GridSize, preserve: bool) {
        if size == self.size && preserve {
            return;
        }

        let mut resized = VoxelGrid::new(size);
        if preserve {
            let nx = size.x().min(self.size.x());
            let ny = size.y().min(self.size.y());
            let nz = size.z().min(self.size.z());
            for x in 0..nx {
                for y in 0..ny {
                    let src = self.size.index(x, y, 0);
                    let dst = size.index(x, y, 0);
                    resized.density[dst..dst + nz].copy_from_slice(&self.density[src..src + nz]);
                    resized.color[dst..dst + nz].copy_from_slice(&self.color[src..src + nz]);
                }
            }
        }
        *self = resized;
    }

    /// Set every cell to the same density and color
    pub fn fill(&mut self, density: f32, color: Color) {
        self.density.fill(density);
        self.color.fill(color);
    }

    /// Safe density read: 0 outside the grid
    #[inline(always)]
    pub fn density(&self, x: i32, y: i32, z: i32) -> f32 {
        match self.size.checked_index(x, y, z) {
            Some(i) => self.density[i],
            None => 0.0,
        }
    }

    /// Safe color read: transparent black outside the grid
    #[inline(always)]
    pub fn color(&self, x: i32, y: i32, z: i32) -> Color {
        match self.size.checked_index(x, y, z) {
            Some(i) => self.color[i],
            None => Color::CLEAR,
        }
    }

    /// Density of an in-bounds cell
    #[inline(always)]
    pub(crate) fn density_at(&self, x: usize, y: usize, z: usize) -> f32 {
        self.density[self.size.index(x, y, z)]
    }

    /// Color of an in-bounds cell
    #[inline(always)]
    pub(crate) fn color_at(&self, x: usize, y: usize, z: usize) -> Color {
        self.color[self.size.index(x, y, z)]
    }

    /// Write one cell; returns `false` (and writes nothing) outside the grid
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, z: i32, density: f32, color: Color) -> bool {
        match self.size.checked_index(x, y, z) {
            Some(i) => {
                self.density[i] = density;
                self.color[i] = color;
                true
            }
            None => false,
        }
    }

    /// Overwrite only the color of one cell
    #[inline]
    pub fn set_color(&mut self, x: i32, y: i32, z: i32, color: Color) -> bool {
        match self.size.checked_index(x, y, z) {
            Some(i) => {
                self.color[i] = color;
                true
            }
            None => false,
        }
    }

    /// Number of cells at or above `threshold`
    pub fn filled_count(&self, threshold: f32) -> usize {
        self.density.iter().filter(|&&d| d >= threshold).count()
    }

    /// Copy density and color from a grid of identical extents
    ///
    /// Returns `false` without copying when the extents differ.
    pub fn copy_from(&mut self, other: &VoxelGrid) -> bool {
        if other.size != self.size {
            return false;
        }
        self.density.copy_from_slice(&other.density);
        self.color.copy_from_slice(&other.color);
        true
    }

    /// Copy only colors from a grid of identical extents
    pub fn copy_colors_from(&mut self, other: &VoxelGrid) -> bool {
        if other.size != self.size {
            return false;
        }
        self.color.copy_from_slice(&other.color);
        true
    }
}
