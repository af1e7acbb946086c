//! # voxel-blob
//!
//! An editable voxel density field that is continuously re-triangulated,
//! plus a scanner that rasterizes external geometry into the same kind of
//! grid so the two can be merged and compared.
//!
//! ## Features
//!
//! - **Field**: dense density + color grid (up to 64 cells per axis) with
//!   safe out-of-range access, fills, and trilinear sampling
//! - **Meshing**: table-driven marching cubes with vertex welding, running-mean
//!   colors, and gradient or face normals
//! - **Scanning**: signed-distance sampling of a target mesh through a
//!   uniform-grid spatial index, surface voxelization with flood fill, or an
//!   occupancy oracle; optionally parallel on rayon
//! - **Scanline reveal**: a pollable, pausable layer-by-layer fill
//! - **Similarity**: filled-count or voxel-wise scores with alignment search
//! - **Config**: serde-backed settings with JSON load/save
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use voxel_blob::prelude::*;
//!
//! // A 9x9x9 field, nothing generated yet
//! let mut config = BlobConfig::default();
//! config.grid.size = [9, 9, 9];
//! config.grid.iso_level = 0.5;
//! config.generation.generate_on_start = false;
//! config.scan.use_mesh_distance = true;
//! config.scan.distance_max = 1.0;
//! let mut blob = Blob::new(config);
//!
//! // Scan a box into the scan buffer and adopt it
//! let target_mesh = Arc::new(TargetMesh::cuboid(Vec3::splat(2.3)));
//! let target = ScanTarget::new(Transform::IDENTITY).with_mesh(&target_mesh);
//! assert!(blob.scan_object_to_grid(&target).is_some());
//! assert!(blob.apply_scan_grid_to_mesh());
//!
//! assert_eq!(blob.field().filled_count(), 125);
//! assert!(blob.mesh().triangle_count() > 0);
//! ```

#![warn(missing_docs)]

pub mod blob;
pub mod config;
pub mod error;
pub mod field;
pub mod mesh;
pub mod scan;
pub mod scanline;
pub mod similarity;
pub mod types;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude - commonly used types and functions
pub mod prelude {
    pub use crate::blob::{Blob, BlobInput};
    pub use crate::config::{BlobConfig, GenerationConfig, GridConfig, ScanConfig, ScanlineConfig};
    pub use crate::error::ConfigError;
    pub use crate::field::{ScanBuffer, VoxelField, VoxelGrid};
    pub use crate::mesh::{EdgeColorMode, MarchingCubesConfig, MarchingCubesMesher, Mesh, Vertex};
    pub use crate::scan::{
        select_strategy, BoxCollider, OccupancyOracle, Penetration, ProbeSphere, ScanStrategy,
        ScanTarget, Scanner, SphereCollider, TargetMesh, TriangleSpatialIndex, VisitScratch,
    };
    pub use crate::scanline::{
        ScanlinePreview, ScanlineRevealer, ScanlineShape, ScanlineState, ScanlineStep,
    };
    pub use crate::similarity::{
        assess, baseline_score, compare, Assimilation, SimilarityMode, SimilarityOptions,
        SimilarityResult,
    };
    pub use crate::types::{Aabb, Color, GridSize, Transform};
    pub use glam::{Quat, Vec2, Vec3};
}

// Re-exports for convenience
pub use blob::Blob;
pub use config::BlobConfig;
pub use field::VoxelField;
pub use mesh::{MarchingCubesMesher, Mesh};
pub use scan::Scanner;
