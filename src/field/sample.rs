//! Continuous sampling of a voxel grid (Deep Fried Edition)
//!
//! All positions here are in cell space: `(0,0,0)` is the first cell and
//! `size - 1` the last one on each axis.
//!
//! # Deep Fried Optimizations
//! - **Shared corner fetch**: density and color sampling reuse one
//!   `TrilinearCell` (8 flat indices + fractional weights).
//! - **Forced Inlining**: `#[inline(always)]` on the per-vertex helpers.

use glam::{Vec3, Vec4};

use super::VoxelGrid;
use crate::types::Color;

/// Step used for the central-difference gradient, in cells
const GRADIENT_STEP: f32 = 0.5;

/// Eight corner indices and the fractional position inside their cube
struct TrilinearCell {
    /// c000, c100, c010, c110, c001, c101, c011, c111
    idx: [usize; 8],
    t: Vec3,
}

impl TrilinearCell {
    /// Locate `p`, which must already lie in `[0, size - 1]` on every axis
    #[inline(always)]
    fn locate(grid: &VoxelGrid, p: Vec3) -> Self {
        let size = grid.size();
        let x0 = p.x.floor() as usize;
        let y0 = p.y.floor() as usize;
        let z0 = p.z.floor() as usize;
        let x1 = (x0 + 1).min(size.x() - 1);
        let y1 = (y0 + 1).min(size.y() - 1);
        let z1 = (z0 + 1).min(size.z() - 1);
        let t = Vec3::new(p.x - x0 as f32, p.y - y0 as f32, p.z - z0 as f32);

        TrilinearCell {
            idx: [
                size.index(x0, y0, z0),
                size.index(x1, y0, z0),
                size.index(x0, y1, z0),
                size.index(x1, y1, z0),
                size.index(x0, y0, z1),
                size.index(x1, y0, z1),
                size.index(x0, y1, z1),
                size.index(x1, y1, z1),
            ],
            t,
        }
    }

    /// Trilinear weight of each corner
    #[inline(always)]
    fn weights(&self) -> [f32; 8] {
        let Vec3 { x: tx, y: ty, z: tz } = self.t;
        let (sx, sy, sz) = (1.0 - tx, 1.0 - ty, 1.0 - tz);
        [
            sx * sy * sz,
            tx * sy * sz,
            sx * ty * sz,
            tx * ty * sz,
            sx * sy * tz,
            tx * sy * tz,
            sx * ty * tz,
            tx * ty * tz,
        ]
    }

    #[inline(always)]
    fn density(&self, grid: &VoxelGrid) -> f32 {
        let d = grid.densities();
        let w = self.weights();
        (0..8).map(|i| d[self.idx[i]] * w[i]).sum()
    }

    #[inline(always)]
    fn color(&self, grid: &VoxelGrid) -> Color {
        let c = grid.colors();
        let w = self.weights();
        let sum: Vec4 = (0..8).map(|i| c[self.idx[i]].to_vec4() * w[i]).sum();
        Color::from_vec4(sum)
    }
}

impl VoxelGrid {
    #[inline(always)]
    fn max_coord(&self) -> Vec3 {
        let s = self.size();
        Vec3::new(s.x() as f32 - 1.0, s.y() as f32 - 1.0, s.z() as f32 - 1.0)
    }

    /// Trilinear density, 0 when `p` lies outside `[0, size - 1]`
    #[inline]
    pub fn sample_density(&self, p: Vec3) -> f32 {
        if p.cmplt(Vec3::ZERO).any() || p.cmpgt(self.max_coord()).any() {
            return 0.0;
        }
        TrilinearCell::locate(self, p).density(self)
    }

    /// Trilinear density with `p` clamped onto the grid
    #[inline]
    pub fn sample_density_clamped(&self, p: Vec3) -> f32 {
        let p = p.clamp(Vec3::ZERO, self.max_coord());
        TrilinearCell::locate(self, p).density(self)
    }

    /// Trilinear color with `p` clamped onto the grid
    #[inline]
    pub fn sample_color(&self, p: Vec3) -> Color {
        let p = p.clamp(Vec3::ZERO, self.max_coord());
        TrilinearCell::locate(self, p).color(self)
    }

    /// Color biased toward the corners that lie above `iso`
    ///
    /// Each corner contributes its trilinear weight times `max(0, d - iso)`.
    /// When no corner is above the iso level this is plain [`sample_color`](Self::sample_color).
    pub fn sample_color_by_density(&self, p: Vec3, iso: f32) -> Color {
        let p = p.clamp(Vec3::ZERO, self.max_coord());
        let cell = TrilinearCell::locate(self, p);
        let w = cell.weights();
        let d = self.densities();
        let c = self.colors();

        let mut total = 0.0;
        let mut acc = Vec4::ZERO;
        for i in 0..8 {
            let wi = w[i] * (d[cell.idx[i]] - iso).max(0.0);
            total += wi;
            acc += c[cell.idx[i]].to_vec4() * wi;
        }

        if total <= 0.0 {
            return cell.color(self);
        }
        Color::from_vec4(acc / total)
    }

    /// Surface normal estimate at a cell-space position
    ///
    /// Central differences of the trilinear density at ±0.5 cells, switching
    /// to clamped sampling on any axis whose probes leave the grid. The result
    /// points from dense to empty; near-zero gradients yield `Vec3::Y`.
    pub fn gradient_normal(&self, p: Vec3) -> Vec3 {
        let max = self.max_coord();
        let mut g = [0.0f32; 3];
        for (axis, slot) in g.iter_mut().enumerate() {
            let mut step = Vec3::ZERO;
            step[axis] = GRADIENT_STEP;
            let crosses = p[axis] - GRADIENT_STEP < 0.0 || p[axis] + GRADIENT_STEP > max[axis];
            *slot = if crosses {
                self.sample_density_clamped(p + step) - self.sample_density_clamped(p - step)
            } else {
                self.sample_density(p + step) - self.sample_density(p - step)
            };
        }

        let n = Vec3::from_array(g);
        if n.length_squared() < 1e-6 {
            return Vec3::Y;
        }
        -n.normalize()
    }
}
