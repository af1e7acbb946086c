//! Integration tests: marching cubes topology
//!
//! Verifies vertex welding, closure at the grid border, winding, and the
//! color/normal attributes of extracted meshes.

mod common;

use std::collections::HashSet;

use common::*;
use voxel_blob::mesh::VertexKey;
use voxel_blob::prelude::*;

// ============================================================================
// Closure and welding
// ============================================================================

#[test]
fn full_block_is_closed_and_welded() {
    let mut field = test_field(4, 1.0, 0.5);
    field.fill_uniform(1.0);

    let mesh = MarchingCubesMesher::new(MarchingCubesConfig::default()).extract(&field);

    assert_eq!(mesh.vertex_count(), 96);
    assert_eq!(mesh.triangle_count(), 188);
    assert!(mesh.indices_valid());
    assert!(mesh.is_closed(), "border probing should close the surface");
    assert_normals_outward(&mesh);
}

#[test]
fn single_voxel_in_corner_is_closed() {
    let mut field = test_field(3, 1.0, 0.5);
    field.set_voxel(0, 0, 0, true);

    let mesh = MarchingCubesMesher::new(MarchingCubesConfig::default()).extract(&field);
    assert_eq!(mesh.vertex_count(), 6);
    assert_eq!(mesh.triangle_count(), 8);
    assert!(mesh.is_closed());
}

#[test]
fn flat_slab_on_non_cubic_grid_is_closed() {
    let mut field = VoxelField::new(GridSize::new(3, 5, 2), 1.0, 0.5);
    field.fill_uniform(0.8);

    let mesh = MarchingCubesMesher::new(MarchingCubesConfig::default()).extract(&field);
    assert!(mesh.is_closed());
    assert!(mesh.indices_valid());
}

#[test]
fn no_crossing_means_empty_mesh() {
    let mut field = test_field(6, 1.0, 0.5);
    let mut mesher = MarchingCubesMesher::new(MarchingCubesConfig::default());
    assert!(mesher.extract(&field).is_empty());

    field.fill_uniform(0.3);
    let mesh = mesher.extract(&field);
    assert_eq!(mesh.vertex_count(), 0);
    assert_eq!(mesh.indices.len(), 0);
}

#[test]
fn rebuild_replaces_previous_mesh() {
    let mut field = test_field(4, 1.0, 0.5);
    field.fill_uniform(1.0);
    let mut mesher = MarchingCubesMesher::new(MarchingCubesConfig::default());
    let mut mesh = mesher.extract(&field);
    assert!(!mesh.is_empty());

    field.clear();
    mesher.extract_into(&field, &mut mesh);
    assert!(mesh.is_empty());
}

// ============================================================================
// Attributes
// ============================================================================

#[test]
fn vertices_live_in_centered_local_space() {
    let mut field = VoxelField::new(GridSize::cubic(4), 2.0, 0.5);
    field.fill_uniform(1.0);
    let mesh = MarchingCubesMesher::new(MarchingCubesConfig::default()).extract(&field);

    let bounds = mesh.bounds().unwrap();
    // crossings sit half a cell outside the outermost cells: ±(1.5 + 0.5) * 2
    assert_close(bounds.min.x, -4.0, 1e-5, "min x");
    assert_close(bounds.max.y, 4.0, 1e-5, "max y");
    assert_close(bounds.center().length(), 0.0, 1e-5, "centered");
}

#[test]
fn colors_come_from_the_dense_side() {
    let red = Color::rgb(0.9, 0.2, 0.1);
    let mut field = test_field(6, 1.0, 0.5);
    for x in 1..=4 {
        for y in 1..=4 {
            for z in 1..=4 {
                field.set_voxel_value(x, y, z, 1.0, red);
            }
        }
    }

    for mode in [EdgeColorMode::ByDensity, EdgeColorMode::CornerLerp] {
        let config = MarchingCubesConfig {
            color_mode: mode,
            ..Default::default()
        };
        let mesh = MarchingCubesMesher::new(config).extract(&field);
        assert!(!mesh.is_empty());
        for v in &mesh.vertices {
            match mode {
                // only the filled corner carries weight
                EdgeColorMode::ByDensity => {
                    assert_close(v.color.r, 0.9, 1e-5, "red");
                    assert_close(v.color.g, 0.2, 1e-5, "green");
                }
                // halfway between the fill and the black empty cells
                EdgeColorMode::CornerLerp => {
                    assert_close(v.color.r, 0.45, 1e-5, "lerped red");
                    assert_close(v.color.a, 1.0, 1e-5, "opaque");
                }
            }
        }
    }
}

#[test]
fn sphere_normals_are_unit_and_outward() {
    for use_gradient_normals in [false, true] {
        let mut field = test_field(12, 1.0, 0.25);
        field.fill_sphere(1.0);
        let config = MarchingCubesConfig {
            use_gradient_normals,
            ..Default::default()
        };
        let mesh = MarchingCubesMesher::new(config).extract(&field);

        assert!(mesh.triangle_count() > 50);
        for v in &mesh.vertices {
            assert_close(v.normal.length(), 1.0, 1e-4, "unit normal");
        }
        assert_normals_outward(&mesh);
    }
}

#[test]
fn welded_vertices_are_unique() {
    let mut field = test_field(10, 0.5, 0.25);
    field.fill_sphere(1.0);
    let mesh = MarchingCubesMesher::new(MarchingCubesConfig::default()).extract(&field);

    let keys: HashSet<VertexKey> = mesh.vertices.iter().map(|v| VertexKey::quantize(v.position)).collect();
    assert_eq!(keys.len(), mesh.vertex_count());
}

#[test]
fn reused_mesher_repeats_its_output() {
    let mut sphere = test_field(10, 1.0, 0.25);
    sphere.fill_sphere(1.0);
    let other = block_field(10, 2, 5, 0.25);
    let config = MarchingCubesConfig {
        use_gradient_normals: true,
        ..Default::default()
    };
    let mut mesher = MarchingCubesMesher::new(config);

    let first = mesher.extract(&sphere);
    let second = mesher.extract(&sphere);
    assert!(!first.is_empty());
    assert_eq!(first.vertices, second.vertices);
    assert_eq!(first.indices, second.indices);

    // an unrelated extraction in between leaves nothing behind
    mesher.extract(&other);
    let mut third = Mesh::new();
    mesher.extract_into(&sphere, &mut third);
    assert_eq!(first.vertices, third.vertices);
    assert_eq!(first.indices, third.indices);
}
