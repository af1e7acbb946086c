//! Grid similarity scoring and the assimilation check
//!
//! Two scores are available:
//! - **Filled count** (default): `1 - |filled(field) - filled(scan)| / cells`,
//!   cheap and blind to placement, rotation and color.
//! - **Voxel-wise**: mean per-cell density difference, optionally with RGB
//!   difference, searched over rotations about the vertical axis and,
//!   optionally, uniform scales and vertical offsets.
//!
//! Scores are clamped to `[0, 1]`; higher is more similar. Neither grid is
//! modified.

use glam::{Quat, Vec3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::field::VoxelGrid;
use crate::types::Aabb;

/// Which score [`compare`] computes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimilarityMode {
    /// Compare filled-cell counts only
    #[default]
    FilledCount,
    /// Compare cell by cell with an alignment search
    VoxelWise,
}

/// Comparison settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityOptions {
    /// Score to compute
    pub mode: SimilarityMode,
    /// Add RGB differences to the voxel-wise error
    pub include_colors: bool,
    /// Evenly spaced rotations about Y to try (at least 1)
    pub rotation_steps: u32,
    /// Uniform scales to try, spread over `1 ± scale_range` (at least 1)
    pub scale_steps: u32,
    /// Half-width of the scale search, in `[0, 0.9]`
    pub scale_range: f32,
    /// Vertical offsets to try, spread over `±y_offset_range` cells (at least 1)
    pub y_offset_steps: u32,
    /// Half-width of the vertical offset search, in cells
    pub y_offset_range: u32,
    /// Minimum score for a target to count as assimilable
    pub assimilation_threshold: f32,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        SimilarityOptions {
            mode: SimilarityMode::FilledCount,
            include_colors: false,
            rotation_steps: 1,
            scale_steps: 1,
            scale_range: 0.0,
            y_offset_steps: 1,
            y_offset_range: 0,
            assimilation_threshold: 0.8,
        }
    }
}

impl SimilarityOptions {
    /// Voxel-wise comparison searching `rotation_steps` angles
    pub fn voxel_wise(rotation_steps: u32, include_colors: bool) -> Self {
        SimilarityOptions {
            mode: SimilarityMode::VoxelWise,
            include_colors,
            rotation_steps: rotation_steps.max(1),
            ..Default::default()
        }
    }

    /// Clamp every setting into its legal range
    pub fn sanitize(&mut self) {
        self.rotation_steps = self.rotation_steps.max(1);
        self.scale_steps = self.scale_steps.max(1);
        self.y_offset_steps = self.y_offset_steps.max(1);
        self.scale_range = if self.scale_range.is_finite() {
            self.scale_range.clamp(0.0, 0.9)
        } else {
            0.0
        };
        self.assimilation_threshold = if self.assimilation_threshold.is_finite() {
            self.assimilation_threshold.clamp(0.0, 1.0)
        } else {
            0.8
        };
    }

    fn rotations(&self) -> Vec<f32> {
        let steps = self.rotation_steps.max(1);
        (0..steps).map(|i| 360.0 * i as f32 / steps as f32).collect()
    }

    fn scales(&self) -> Vec<f32> {
        let range = self.scale_range.clamp(0.0, 0.9);
        if self.scale_steps <= 1 || range <= 0.0 {
            return vec![1.0];
        }
        spread(self.scale_steps)
            .map(|t| 1.0 - range + 2.0 * range * t)
            .collect()
    }

    fn y_offsets(&self) -> Vec<i32> {
        let range = self.y_offset_range as f32;
        if self.y_offset_steps <= 1 || self.y_offset_range == 0 {
            return vec![0];
        }
        let mut offsets: Vec<i32> = spread(self.y_offset_steps)
            .map(|t| (-range + 2.0 * range * t).round() as i32)
            .collect();
        offsets.dedup();
        offsets
    }
}

/// `steps` evenly spaced values from 0 to 1 inclusive
fn spread(steps: u32) -> impl Iterator<Item = f32> {
    let last = (steps.max(2) - 1) as f32;
    (0..steps).map(move |i| i as f32 / last)
}

/// Best alignment found by [`compare`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityResult {
    /// Score in `[0, 1]`
    pub score: f32,
    /// Rotation about Y applied to the scan, degrees
    pub rotation_degrees: f32,
    /// Uniform scale applied to the scan
    pub scale: f32,
    /// Vertical offset applied to the scan, in cells
    pub y_offset: i32,
}

impl SimilarityResult {
    fn unaligned(score: f32) -> Self {
        SimilarityResult {
            score,
            rotation_degrees: 0.0,
            scale: 1.0,
            y_offset: 0,
        }
    }
}

/// Filled-count score of two grids
///
/// Uses `field`'s cell count as the denominator; an empty field scores 0.
pub fn baseline_score(field: &VoxelGrid, scan: &VoxelGrid, iso_level: f32) -> f32 {
    let total = field.size().volume();
    if total == 0 {
        return 0.0;
    }
    let a = field.filled_count(iso_level) as f32;
    let b = scan.filled_count(iso_level) as f32;
    (1.0 - (a - b).abs() / total as f32).clamp(0.0, 1.0)
}

/// Score `scan` against `field` as configured by `options`
pub fn compare(field: &VoxelGrid, scan: &VoxelGrid, iso_level: f32, options: &SimilarityOptions) -> SimilarityResult {
    match options.mode {
        SimilarityMode::FilledCount => SimilarityResult::unaligned(baseline_score(field, scan, iso_level)),
        SimilarityMode::VoxelWise => best_alignment(field, scan, options),
    }
}

fn best_alignment(field: &VoxelGrid, scan: &VoxelGrid, options: &SimilarityOptions) -> SimilarityResult {
    if field.size().volume() == 0 {
        return SimilarityResult::unaligned(0.0);
    }

    let mut candidates = Vec::new();
    for &rotation in &options.rotations() {
        for &scale in &options.scales() {
            for &y_offset in &options.y_offsets() {
                candidates.push(SimilarityResult {
                    score: 0.0,
                    rotation_degrees: rotation,
                    scale,
                    y_offset,
                });
            }
        }
    }

    let scored: Vec<SimilarityResult> = candidates
        .into_par_iter()
        .map(|c| SimilarityResult {
            score: voxel_wise_score(field, scan, &c, options.include_colors),
            ..c
        })
        .collect();

    let mut best = scored[0];
    for candidate in &scored[1..] {
        if candidate.score > best.score {
            best = *candidate;
        }
    }

    log::debug!(
        "voxel-wise similarity {:.4} at {:.1} deg, scale {:.3}, y offset {} ({} candidates)",
        best.score,
        best.rotation_degrees,
        best.scale,
        best.y_offset,
        scored.len()
    );
    best
}

/// Mean agreement of `field` with `scan` under one alignment
///
/// Each field cell is mapped into the scan by the inverse alignment and
/// compared with the nearest scan cell; cells mapped outside the scan read
/// as empty.
fn voxel_wise_score(field: &VoxelGrid, scan: &VoxelGrid, align: &SimilarityResult, include_colors: bool) -> f32 {
    let size = field.size();
    let center = size.center();
    let inverse = Quat::from_rotation_y(-align.rotation_degrees.to_radians());
    let inv_scale = 1.0 / align.scale;
    let shift = Vec3::new(0.0, align.y_offset as f32, 0.0);

    let mut error = 0.0f64;
    for x in 0..size.x() {
        for y in 0..size.y() {
            for z in 0..size.z() {
                let p = Vec3::new(x as f32, y as f32, z as f32) - center;
                let q = (inverse * p) * inv_scale + center - shift;
                let (qx, qy, qz) = (q.x.round() as i32, q.y.round() as i32, q.z.round() as i32);

                let mut cell = (field.density_at(x, y, z) - scan.density(qx, qy, qz)).abs();
                if include_colors {
                    let rgb = field.color_at(x, y, z).rgb_distance(scan.color(qx, qy, qz));
                    cell = (cell + rgb) * 0.5;
                }
                error += cell as f64;
            }
        }
    }

    (1.0 - (error / size.volume() as f64) as f32).clamp(0.0, 1.0)
}

/// Outcome of the assimilation check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assimilation {
    /// Similarity score that was tested
    pub score: f32,
    /// Estimated target volume
    pub volume: f32,
    /// Whether the score reached the threshold
    pub qualifies: bool,
}

/// Volume estimate of a target: product of its bounding-box extents
pub fn estimate_volume(bounds: Option<&Aabb>) -> f32 {
    bounds.map_or(0.0, |b| b.volume().abs())
}

/// Decide whether a scanned target is assimilable
pub fn assess(score: f32, bounds: Option<&Aabb>, threshold: f32) -> Assimilation {
    Assimilation {
        score,
        volume: estimate_volume(bounds),
        qualifies: score >= threshold,
    }
}
