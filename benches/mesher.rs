//! Benchmarks for marching-cubes extraction

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use voxel_blob::prelude::*;

fn sphere_field(n: i32) -> VoxelField {
    let mut field = VoxelField::new(GridSize::cubic(n), 1.0, 0.25);
    field.fill_sphere(1.0);
    field
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_sphere");

    for n in [16, 32, 64] {
        let field = sphere_field(n);
        group.throughput(Throughput::Elements(field.size().volume() as u64));

        group.bench_with_input(BenchmarkId::new("face_normals", n), &field, |b, field| {
            let mut mesher = MarchingCubesMesher::new(MarchingCubesConfig::default());
            let mut mesh = Mesh::new();
            b.iter(|| {
                mesher.extract_into(black_box(field), &mut mesh);
                mesh.triangle_count()
            })
        });

        group.bench_with_input(BenchmarkId::new("gradient_normals", n), &field, |b, field| {
            let mut mesher = MarchingCubesMesher::new(MarchingCubesConfig {
                use_gradient_normals: true,
                ..MarchingCubesConfig::default()
            });
            let mut mesh = Mesh::new();
            b.iter(|| {
                mesher.extract_into(black_box(field), &mut mesh);
                mesh.triangle_count()
            })
        });
    }

    group.finish();
}

fn bench_colors(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_colors");
    let field = sphere_field(32);

    for mode in [EdgeColorMode::CornerLerp, EdgeColorMode::ByDensity] {
        let name = format!("{:?}", mode);
        group.bench_function(name, |b| {
            let mut mesher = MarchingCubesMesher::new(MarchingCubesConfig {
                color_mode: mode,
                ..MarchingCubesConfig::default()
            });
            let mut mesh = Mesh::new();
            b.iter(|| mesher.extract_into(black_box(&field), &mut mesh))
        });
    }

    group.finish();
}

fn bench_scanline(c: &mut Criterion) {
    c.bench_function("scanline_full_reveal_32", |b| {
        let config = ScanlineConfig {
            layers_per_second: 1000.0,
            ..ScanlineConfig::default()
        };
        let mut field = VoxelField::new(GridSize::cubic(32), 1.0, 0.25);
        b.iter(|| {
            let mut revealer = ScanlineRevealer::new(config);
            revealer.start();
            while revealer.step(1.0, false, &mut field) != ScanlineStep::Completed {}
        })
    });
}

criterion_group!(benches, bench_extract, bench_colors, bench_scanline);
criterion_main!(benches);
