//! Blob configuration
//!
//! Plain serde data grouped by concern. Every value has a legal range;
//! [`BlobConfig::sanitize`] clamps out-of-range values instead of rejecting
//! them, and loading always sanitizes.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::field::MIN_VOXEL_SIZE;
use crate::mesh::MarchingCubesConfig;
use crate::scanline::ScanlineShape;
use crate::similarity::SimilarityOptions;
use crate::types::{Color, GridSize};

/// Grid extents, scale and surface threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Cells per axis, each clamped to `[1, 64]`
    pub size: [i32; 3],
    /// World units per cell, at least 0.01
    pub voxel_size: f32,
    /// Surface threshold in `[0, 1]`
    pub iso_level: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            size: [16, 16, 16],
            voxel_size: 1.0,
            iso_level: 0.25,
        }
    }
}

impl GridConfig {
    /// Clamped grid extents
    pub fn grid_size(&self) -> GridSize {
        GridSize::new(self.size[0], self.size[1], self.size[2])
    }
}

/// Start-up generation and meshing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Generate content and a mesh when the blob is created
    pub generate_on_start: bool,
    /// Start from a filled sphere rather than an empty grid
    pub fill_on_start: bool,
    /// Regenerate when a re-applied config changes the grid size
    pub regenerate_on_validate: bool,
    /// Color painted by fills and the scanline reveal
    pub fill_color: Color,
    /// Mesher settings
    pub mesher: MarchingCubesConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            generate_on_start: true,
            fill_on_start: true,
            regenerate_on_validate: true,
            fill_color: Color::WHITE,
            mesher: MarchingCubesConfig::default(),
        }
    }
}

/// Layer-by-layer reveal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanlineConfig {
    /// Reveal rate, at least 0.01 layers per second
    pub layers_per_second: f32,
    /// Cross-section painted into each layer
    pub shape: ScanlineShape,
    /// Cross-section scale along X in `[0, 1]`
    pub scale_x: f32,
    /// Cross-section scale along Z in `[0, 1]`
    pub scale_z: f32,
    /// Cross-section rotation about the layer's up axis, in degrees
    pub rotation_degrees: f32,
    /// Scale change per unit of pointer movement
    pub pointer_scale_sensitivity: f32,
    /// Scale change per unit of scroll
    pub scroll_scale_sensitivity: f32,
    /// Seconds of hold-to-pause available per run
    pub pause_budget_seconds: f32,
}

impl Default for ScanlineConfig {
    fn default() -> Self {
        ScanlineConfig {
            layers_per_second: 2.0,
            shape: ScanlineShape::Ellipse,
            scale_x: 1.0,
            scale_z: 1.0,
            rotation_degrees: 0.0,
            pointer_scale_sensitivity: 0.002,
            scroll_scale_sensitivity: 0.001,
            pause_budget_seconds: 5.0,
        }
    }
}

/// Target scanning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Distance that maps to a full density swing, at least 0.01
    pub distance_max: f32,
    /// Prefer the mesh even when a collider is available
    pub use_mesh_distance: bool,
    /// Classify by shell rasterization + flood fill instead of ray parity
    pub use_surface_voxelization: bool,
    /// Use collider probes plus a ray toward the collider center
    pub use_raycast_to_center: bool,
    /// Dilation radius applied to the voxelized shell
    pub surface_seal_voxels: u32,
    /// Shell thickness as a fraction of a voxel, clamped to `[0.05, 1]` at use
    pub surface_thickness: f32,
    /// Evaluate the mesh-distance path on the rayon pool
    pub use_parallel: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            distance_max: 2.0,
            use_mesh_distance: false,
            use_surface_voxelization: false,
            use_raycast_to_center: false,
            surface_seal_voxels: 0,
            surface_thickness: 0.25,
            use_parallel: true,
        }
    }
}

/// Complete blob configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
    /// Grid extents, scale and iso level
    pub grid: GridConfig,
    /// Start-up generation and meshing
    pub generation: GenerationConfig,
    /// Scanline reveal
    pub scanline: ScanlineConfig,
    /// Target scanning
    pub scan: ScanConfig,
    /// Scan comparison
    pub similarity: SimilarityOptions,
}

#[inline]
fn finite_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}

impl BlobConfig {
    /// Clamp every setting into its legal range
    pub fn sanitize(&mut self) {
        let size = self.grid.grid_size();
        self.grid.size = [size.x() as i32, size.y() as i32, size.z() as i32];
        self.grid.voxel_size = finite_or(self.grid.voxel_size, 1.0).max(MIN_VOXEL_SIZE);
        self.grid.iso_level = finite_or(self.grid.iso_level, 0.25).clamp(0.0, 1.0);

        let s = &mut self.scanline;
        s.layers_per_second = finite_or(s.layers_per_second, 2.0).max(0.01);
        s.scale_x = finite_or(s.scale_x, 1.0).clamp(0.0, 1.0);
        s.scale_z = finite_or(s.scale_z, 1.0).clamp(0.0, 1.0);
        s.rotation_degrees = finite_or(s.rotation_degrees, 0.0);
        s.pointer_scale_sensitivity = finite_or(s.pointer_scale_sensitivity, 0.0).max(0.0);
        s.scroll_scale_sensitivity = finite_or(s.scroll_scale_sensitivity, 0.0).max(0.0);
        s.pause_budget_seconds = finite_or(s.pause_budget_seconds, 0.0).max(0.0);

        self.scan.distance_max = finite_or(self.scan.distance_max, 2.0).max(0.01);
        self.scan.surface_thickness = finite_or(self.scan.surface_thickness, 0.25);

        self.similarity.sanitize();
    }

    /// Sanitized copy
    pub fn sanitized(mut self) -> Self {
        self.sanitize();
        self
    }

    /// Parse JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: BlobConfig = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    /// Serialize to pretty JSON
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a `.json` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        check_extension(path)?;
        let reader = BufReader::new(File::open(path)?);
        let config: BlobConfig = serde_json::from_reader(reader)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config.sanitized())
    }

    /// Save to a `.json` file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        check_extension(path)?;
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

fn check_extension(path: &Path) -> Result<(), ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(()),
        _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
    }
}
