//! Voxel density field
//!
//! [`VoxelField`] owns the sculptable density + color grid together with the
//! settings that give it a physical size (voxel size) and a surface (iso
//! level). [`ScanBuffer`] is the same storage used as the destination of
//! mesh scans.
//!
//! Every coordinate-taking accessor is safe for any `i32`: reads outside the
//! grid return 0 / transparent black and writes there are ignored. The
//! mesher relies on this when it probes one cell past each border.

mod grid;
mod sample;

pub use grid::VoxelGrid;

use glam::Vec3;

use crate::types::{Color, GridSize};

/// Destination grid of the most recent scan
pub type ScanBuffer = VoxelGrid;

/// Smallest accepted voxel size
pub const MIN_VOXEL_SIZE: f32 = 0.01;

/// Sculptable density/color grid with physical scale and surface threshold
#[derive(Debug, Clone)]
pub struct VoxelField {
    grid: VoxelGrid,
    voxel_size: f32,
    iso_level: f32,
    fill_color: Color,
}

impl VoxelField {
    /// Create a cleared field
    ///
    /// `voxel_size` and `iso_level` are clamped like their setters.
    pub fn new(size: GridSize, voxel_size: f32, iso_level: f32) -> Self {
        let mut field = VoxelField {
            grid: VoxelGrid::new(size),
            voxel_size: MIN_VOXEL_SIZE,
            iso_level: 0.0,
            fill_color: Color::WHITE,
        };
        field.set_voxel_size(voxel_size);
        field.set_iso_level(iso_level);
        field.clear();
        field
    }

    /// Grid extents
    #[inline]
    pub fn size(&self) -> GridSize {
        self.grid.size()
    }

    /// World units per cell
    #[inline]
    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// Set the voxel size, clamped to at least [`MIN_VOXEL_SIZE`]
    pub fn set_voxel_size(&mut self, voxel_size: f32) {
        self.voxel_size = if voxel_size.is_finite() {
            voxel_size.max(MIN_VOXEL_SIZE)
        } else {
            MIN_VOXEL_SIZE
        };
    }

    /// Surface threshold
    #[inline]
    pub fn iso_level(&self) -> f32 {
        self.iso_level
    }

    /// Set the surface threshold, clamped to `[0, 1]`
    pub fn set_iso_level(&mut self, iso_level: f32) {
        self.iso_level = if iso_level.is_nan() { 0.0 } else { iso_level.clamp(0.0, 1.0) };
    }

    /// Color written by fills and filled `set_voxel`
    #[inline]
    pub fn fill_color(&self) -> Color {
        self.fill_color
    }

    /// Set the fill color
    pub fn set_fill_color(&mut self, color: Color) {
        self.fill_color = color;
    }

    /// Underlying storage
    #[inline]
    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    /// Underlying storage, mutably
    #[inline]
    pub fn grid_mut(&mut self) -> &mut VoxelGrid {
        &mut self.grid
    }

    /// Cell-space center, `(size - 1) / 2`
    #[inline]
    pub fn grid_center(&self) -> Vec3 {
        self.size().center()
    }

    /// Local-space position of a cell-space point
    #[inline]
    pub fn cell_to_local(&self, cell: Vec3) -> Vec3 {
        (cell - self.grid_center()) * self.voxel_size
    }

    /// Cell-space position of a local-space point
    #[inline]
    pub fn local_to_cell(&self, local: Vec3) -> Vec3 {
        local / self.voxel_size + self.grid_center()
    }

    /// Reallocate to `size` (clamped per axis to `[1, 64]`)
    ///
    /// `clear` zeroes density and paints every cell black; otherwise the
    /// region shared with the old extents is kept.
    pub fn resize(&mut self, size: GridSize, clear: bool) {
        self.grid.resize(size, !clear);
        if clear {
            self.clear();
        }
    }

    /// Zero density, black color everywhere
    pub fn clear(&mut self) {
        self.grid.fill(0.0, Color::BLACK);
    }

    /// Set every cell to `value` painted with the fill color
    pub fn fill_uniform(&mut self, value: f32) {
        let color = self.fill_color;
        self.grid.fill(value, color);
    }

    /// Radial falloff inside the sphere inscribed in the grid
    ///
    /// Inside: `clamp01(1 - d / r) * value` with the fill color; outside:
    /// 0 and black.
    pub fn fill_sphere(&mut self, value: f32) {
        let size = self.size();
        let center = self.grid_center();
        let radius = (size.x().min(size.y()).min(size.z()) as f32 - 1.0) * 0.5;
        let safe_radius = radius.max(1e-4);
        let radius_sq = radius * radius;
        let fill = self.fill_color;

        let (density, color) = self.grid.split_mut();
        for x in 0..size.x() {
            for y in 0..size.y() {
                for z in 0..size.z() {
                    let i = size.index(x, y, z);
                    let offset = Vec3::new(x as f32, y as f32, z as f32) - center;
                    let dist_sq = offset.length_squared();
                    if dist_sq <= radius_sq {
                        let falloff = (1.0 - dist_sq.sqrt() / safe_radius).clamp(0.0, 1.0);
                        density[i] = falloff * value;
                        color[i] = fill;
                    } else {
                        density[i] = 0.0;
                        color[i] = Color::BLACK;
                    }
                }
            }
        }
    }

    /// Whether a cell holds any density; `false` outside the grid
    #[inline]
    pub fn get_voxel(&self, x: i32, y: i32, z: i32) -> bool {
        self.grid.density(x, y, z) > 0.0
    }

    /// Density of a cell, 0 outside the grid
    #[inline]
    pub fn density(&self, x: i32, y: i32, z: i32) -> f32 {
        self.grid.density(x, y, z)
    }

    /// Color of a cell, transparent black outside the grid
    #[inline]
    pub fn color(&self, x: i32, y: i32, z: i32) -> Color {
        self.grid.color(x, y, z)
    }

    /// Fill (density 1, fill color) or empty (0, black) one cell
    pub fn set_voxel(&mut self, x: i32, y: i32, z: i32, filled: bool) -> bool {
        if filled {
            let color = self.fill_color;
            self.grid.set(x, y, z, 1.0, color)
        } else {
            self.grid.set(x, y, z, 0.0, Color::BLACK)
        }
    }

    /// Write a density (clamped to `[0, 1]`) and color to one cell
    pub fn set_voxel_value(&mut self, x: i32, y: i32, z: i32, value: f32, color: Color) -> bool {
        self.grid.set(x, y, z, value.clamp(0.0, 1.0), color)
    }

    /// Cells at or above the iso level
    pub fn filled_count(&self) -> usize {
        self.grid.filled_count(self.iso_level)
    }
}

impl Default for VoxelField {
    fn default() -> Self {
        VoxelField::new(GridSize::default(), 1.0, 0.25)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_cleared() {
        let field = VoxelField::new(GridSize::cubic(3), 1.0, 0.5);
        assert_eq!(field.grid().densities().len(), 27);
        assert!(field.grid().densities().iter().all(|&d| d == 0.0));
        assert!(field.grid().colors().iter().all(|&c| c == Color::BLACK));
    }

    #[test]
    fn test_settings_are_clamped() {
        let mut field = VoxelField::default();
        field.set_voxel_size(-3.0);
        assert_eq!(field.voxel_size(), MIN_VOXEL_SIZE);
        field.set_iso_level(1.7);
        assert_eq!(field.iso_level(), 1.0);
        field.set_iso_level(-0.2);
        assert_eq!(field.iso_level(), 0.0);
    }

    #[test]
    fn test_fill_sphere_profile() {
        let mut field = VoxelField::new(GridSize::cubic(5), 1.0, 0.5);
        field.fill_sphere(1.0);
        assert!((field.density(2, 2, 2) - 1.0).abs() < 1e-6);
        assert!((field.density(3, 2, 2) - 0.5).abs() < 1e-6);
        assert_eq!(field.color(2, 2, 2), Color::WHITE);
        // Corners lie outside the inscribed sphere
        assert_eq!(field.density(0, 0, 0), 0.0);
        assert_eq!(field.color(0, 0, 0), Color::BLACK);
    }

    #[test]
    fn test_set_voxel_variants() {
        let mut field = VoxelField::new(GridSize::cubic(2), 1.0, 0.5);
        field.set_fill_color(Color::rgb(0.2, 0.4, 0.6));
        assert!(field.set_voxel(1, 0, 1, true));
        assert!(field.get_voxel(1, 0, 1));
        assert_eq!(field.color(1, 0, 1), Color::rgb(0.2, 0.4, 0.6));
        assert!(field.set_voxel_value(0, 0, 0, 3.0, Color::WHITE));
        assert_eq!(field.density(0, 0, 0), 1.0);
        assert!(!field.set_voxel(2, 0, 0, true));
        assert!(!field.get_voxel(-1, 0, 0));
        assert!(field.set_voxel(1, 0, 1, false));
        assert!(!field.get_voxel(1, 0, 1));
    }

    #[test]
    fn test_cell_local_mapping() {
        let field = VoxelField::new(GridSize::cubic(5), 0.5, 0.5);
        assert_eq!(field.cell_to_local(Vec3::splat(2.0)), Vec3::ZERO);
        assert_eq!(field.cell_to_local(Vec3::new(4.0, 2.0, 2.0)), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(field.local_to_cell(Vec3::new(1.0, 0.0, 0.0)), Vec3::new(4.0, 2.0, 2.0));
    }
}
