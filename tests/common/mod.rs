//! Common test helpers for voxel-blob integration tests

#![allow(dead_code)]

use std::sync::Arc;

use voxel_blob::prelude::*;

// ============================================================================
// Standard fields and targets
// ============================================================================

/// Cleared cubic field
pub fn test_field(n: i32, voxel_size: f32, iso_level: f32) -> VoxelField {
    VoxelField::new(GridSize::cubic(n), voxel_size, iso_level)
}

/// Field with an inclusive block of cells set to density 1
pub fn block_field(n: i32, lo: i32, hi: i32, iso_level: f32) -> VoxelField {
    let mut field = test_field(n, 1.0, iso_level);
    for x in lo..=hi {
        for y in lo..=hi {
            for z in lo..=hi {
                field.set_voxel(x, y, z, true);
            }
        }
    }
    field
}

/// Box target mesh shared the way a host would share it
pub fn box_target(half: f32) -> Arc<TargetMesh> {
    Arc::new(TargetMesh::cuboid(Vec3::splat(half)))
}

/// Mesh-distance scan settings with a one-unit distance scale
pub fn mesh_scan_config(parallel: bool) -> ScanConfig {
    ScanConfig {
        distance_max: 1.0,
        use_mesh_distance: true,
        use_parallel: parallel,
        ..ScanConfig::default()
    }
}

/// Blob config for a cubic grid with nothing generated at start-up
pub fn empty_blob_config(n: i32) -> BlobConfig {
    let mut config = BlobConfig::default();
    config.grid.size = [n, n, n];
    config.grid.iso_level = 0.5;
    config.generation.generate_on_start = false;
    config
}

// ============================================================================
// Assertion helpers
// ============================================================================

/// Assert two f32 values are close within tolerance
pub fn assert_close(a: f32, b: f32, tol: f32, msg: &str) {
    assert!(
        (a - b).abs() < tol,
        "{}: {} vs {} (diff={}, tol={})",
        msg,
        a,
        b,
        (a - b).abs(),
        tol
    );
}

/// Assert every vertex normal points away from the mesh centroid
pub fn assert_normals_outward(mesh: &Mesh) {
    let bounds = mesh.bounds().expect("mesh should not be empty");
    let center = bounds.center();
    for (i, v) in mesh.vertices.iter().enumerate() {
        assert!(
            v.normal.dot(v.position - center) > 0.0,
            "vertex {} at {:?} has inward normal {:?}",
            i,
            v.position,
            v.normal
        );
    }
}
