//! Benchmarks for target scanning and similarity scoring

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use voxel_blob::prelude::*;

/// Latitude/longitude sphere, closed and outward-wound
fn uv_sphere(radius: f32, rings: u32, segments: u32) -> TargetMesh {
    let mut vertices = Vec::new();
    for r in 0..=rings {
        let theta = std::f32::consts::PI * r as f32 / rings as f32;
        for s in 0..segments {
            let phi = std::f32::consts::TAU * s as f32 / segments as f32;
            vertices.push(Vec3::new(
                radius * theta.sin() * phi.cos(),
                radius * theta.cos(),
                radius * theta.sin() * phi.sin(),
            ));
        }
    }

    let mut indices = Vec::new();
    for r in 0..rings {
        for s in 0..segments {
            let a = r * segments + s;
            let b = r * segments + (s + 1) % segments;
            let c = a + segments;
            let d = b + segments;
            indices.extend_from_slice(&[a, b, c, b, d, c]);
        }
    }
    TargetMesh::new(vertices, indices)
}

fn bench_index_build(c: &mut Criterion) {
    let mesh = uv_sphere(10.0, 48, 96);
    c.bench_function("index_build_9k_tris", |b| {
        b.iter(|| TriangleSpatialIndex::build(black_box(&mesh.vertices), black_box(&mesh.indices), 1.0))
    });
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_32");
    group.sample_size(20);

    let field = VoxelField::new(GridSize::cubic(32), 1.0, 0.5);
    let mesh = Arc::new(uv_sphere(12.0, 24, 48));
    let collider = SphereCollider::new(Vec3::ZERO, 12.0);
    let mesh_target = ScanTarget::new(Transform::IDENTITY).with_mesh(&mesh);
    let collider_target = ScanTarget::new(Transform::IDENTITY).with_collider(&collider);

    let base = ScanConfig {
        distance_max: 2.0,
        use_mesh_distance: true,
        ..ScanConfig::default()
    };
    let cases = [
        ("mesh_serial", ScanConfig { use_parallel: false, ..base }, &mesh_target),
        ("mesh_parallel", base, &mesh_target),
        ("voxelize", ScanConfig { use_surface_voxelization: true, ..base }, &mesh_target),
        ("oracle", ScanConfig::default(), &collider_target),
        ("raycast_to_center", ScanConfig { use_raycast_to_center: true, ..ScanConfig::default() }, &collider_target),
    ];

    for (name, config, target) in cases {
        group.bench_function(name, |b| {
            // the index is built once and reused across iterations
            let mut scanner = Scanner::new();
            let mut buffer = ScanBuffer::new(field.size());
            b.iter(|| scanner.scan(&field, &Transform::IDENTITY, target, &config, &mut buffer))
        });
    }

    group.finish();
}

fn bench_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("similarity_24");

    let mut field = VoxelField::new(GridSize::cubic(24), 1.0, 0.5);
    field.fill_sphere(1.0);
    let scan = field.grid().clone();

    group.bench_function("baseline", |b| {
        b.iter(|| baseline_score(black_box(field.grid()), black_box(&scan), 0.5))
    });

    for steps in [1u32, 8, 32] {
        let options = SimilarityOptions::voxel_wise(steps, true);
        group.bench_with_input(BenchmarkId::new("voxel_wise", steps), &options, |b, options| {
            b.iter(|| compare(black_box(field.grid()), black_box(&scan), 0.5, options))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_index_build, bench_strategies, bench_similarity);
criterion_main!(benches);
