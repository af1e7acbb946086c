//! voxel-blob CLI
//!
//! Command-line driver for the blob: generate, scan, reveal, and export.

#![allow(
    clippy::uninlined_format_args,
    clippy::needless_pass_by_value,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use voxel_blob::prelude::*;

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand, ValueEnum};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "voxel-blob")]
#[command(version = voxel_blob::VERSION)]
#[command(about = "Sculptable voxel blob: meshing, scanning and scanline reveal", long_about = None)]
struct Cli {
    /// Blob configuration (.json); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Clone, Copy, ValueEnum)]
enum TargetShape {
    /// Axis-aligned box mesh
    Box,
    /// Analytic sphere collider
    Sphere,
}

#[cfg(feature = "cli")]
#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    /// Pick from the available geometry
    Auto,
    /// Spatial-index distance and ray parity
    Mesh,
    /// Shell rasterization and flood fill
    Voxelize,
    /// Collider probes plus a ray toward the center
    Raycast,
}

#[cfg(feature = "cli")]
#[derive(Clone, Copy, ValueEnum)]
enum Shape {
    /// Binary rectangle cross-section
    Rectangle,
    /// Radial ellipse cross-section
    Ellipse,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Generate the start-up sphere and export its mesh
    Demo {
        /// Cells per axis (overrides the config)
        #[arg(short, long)]
        size: Option<i32>,
        /// Output OBJ file
        #[arg(short, long, default_value = "blob.obj")]
        output: PathBuf,
    },

    /// Scan a target into the blob, adopt it and score the match
    Scan {
        /// Target geometry
        #[arg(short, long, value_enum, default_value = "box")]
        target: TargetShape,
        /// Box half extent or sphere radius, in world units
        #[arg(short, long, default_value = "3.0")]
        extent: f32,
        /// Sampling strategy
        #[arg(long, value_enum, default_value = "auto")]
        strategy: Strategy,
        /// Search this many rotations with the voxel-wise score
        #[arg(long)]
        rotations: Option<u32>,
        /// Output OBJ file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the scanline reveal on an empty grid
    Reveal {
        /// Cross-section shape
        #[arg(long, value_enum, default_value = "ellipse")]
        shape: Shape,
        /// Simulated frame time in seconds
        #[arg(long, default_value = "0.1")]
        dt: f32,
        /// Output OBJ file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the default configuration as JSON
    InitConfig {
        /// Output file
        #[arg(short, long, default_value = "blob.json")]
        output: PathBuf,
    },
}

#[cfg(feature = "cli")]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match BlobConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error: {}", e);
                std::process::exit(1);
            }
        },
        None => BlobConfig::default(),
    };

    match cli.command {
        Commands::Demo { size, output } => cmd_demo(config, size, output),
        Commands::Scan {
            target,
            extent,
            strategy,
            rotations,
            output,
        } => cmd_scan(config, target, extent, strategy, rotations, output),
        Commands::Reveal { shape, dt, output } => cmd_reveal(config, shape, dt, output),
        Commands::InitConfig { output } => cmd_init_config(config, output),
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI not enabled. Build with --features cli");
    std::process::exit(1);
}

#[cfg(feature = "cli")]
fn cmd_demo(mut config: BlobConfig, size: Option<i32>, output: PathBuf) {
    if let Some(n) = size {
        config.grid.size = [n, n, n];
    }
    config.generation.generate_on_start = true;
    config.generation.fill_on_start = true;

    let start = std::time::Instant::now();
    let blob = Blob::new(config);
    let elapsed = start.elapsed();

    print_stats(&blob);
    println!("  Generated in {:.2?}", elapsed);
    write_obj_or_exit(blob.mesh(), &output);
}

#[cfg(feature = "cli")]
fn cmd_scan(
    mut config: BlobConfig,
    target: TargetShape,
    extent: f32,
    strategy: Strategy,
    rotations: Option<u32>,
    output: Option<PathBuf>,
) {
    config.generation.generate_on_start = true;
    config.scan.use_mesh_distance = matches!(strategy, Strategy::Mesh | Strategy::Voxelize);
    config.scan.use_surface_voxelization = matches!(strategy, Strategy::Voxelize);
    config.scan.use_raycast_to_center = matches!(strategy, Strategy::Raycast);
    if let Some(steps) = rotations {
        config.similarity = SimilarityOptions {
            assimilation_threshold: config.similarity.assimilation_threshold,
            ..SimilarityOptions::voxel_wise(steps, true)
        };
    }

    let mut blob = Blob::new(config);
    let extent = extent.abs().max(0.01);
    let mesh = Arc::new(TargetMesh::cuboid(Vec3::splat(extent)));
    let box_collider = BoxCollider::new(Vec3::ZERO, Vec3::splat(extent));
    let sphere = SphereCollider::new(Vec3::ZERO, extent);

    let mut scan_target = ScanTarget::new(Transform::IDENTITY);
    match target {
        TargetShape::Box => {
            scan_target = scan_target.with_mesh(&mesh);
            if matches!(strategy, Strategy::Raycast) {
                scan_target = scan_target.with_collider(&box_collider);
            }
        }
        TargetShape::Sphere => scan_target = scan_target.with_collider(&sphere),
    }

    let start = std::time::Instant::now();
    let Some(check) = blob.assess_target(&scan_target) else {
        eprintln!("Scan failed: the target offers no usable geometry for this strategy");
        std::process::exit(1);
    };
    let elapsed = start.elapsed();

    let result = blob.compare_to_scan_grid();
    println!("Scanned in {:.2?}", elapsed);
    println!("  Score:      {:.4} (rotation {:.1} deg)", result.score, result.rotation_degrees);
    println!("  Volume:     {:.3}", check.volume);
    println!("  Assimilable: {}", check.qualifies);

    blob.apply_scan_grid_to_mesh();
    print_stats(&blob);
    if let Some(path) = output {
        write_obj_or_exit(blob.mesh(), &path);
    }
}

#[cfg(feature = "cli")]
fn cmd_reveal(mut config: BlobConfig, shape: Shape, dt: f32, output: Option<PathBuf>) {
    config.generation.generate_on_start = false;
    config.scanline.shape = match shape {
        Shape::Rectangle => ScanlineShape::Rectangle,
        Shape::Ellipse => ScanlineShape::Ellipse,
    };

    let mut blob = Blob::new(config);
    let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.1 };
    let input = BlobInput::default();

    blob.start_scanline();
    let mut elapsed = 0.0f32;
    loop {
        let step = blob.step(dt, &input);
        match step {
            ScanlineStep::LayerRevealed(y) => println!(
                "  t={:6.2}s  layer {:2}  {} triangles",
                elapsed,
                y,
                blob.mesh().triangle_count()
            ),
            ScanlineStep::Completed => break,
            _ => {}
        }
        elapsed += dt;
    }

    println!("Reveal completed after {:.2}s", elapsed);
    print_stats(&blob);
    if let Some(path) = output {
        write_obj_or_exit(blob.mesh(), &path);
    }
}

#[cfg(feature = "cli")]
fn cmd_init_config(config: BlobConfig, output: PathBuf) {
    match config.save(&output) {
        Ok(()) => println!("Wrote {}", output.display()),
        Err(e) => {
            eprintln!("Save error: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "cli")]
fn print_stats(blob: &Blob) {
    let size = blob.field().size();
    println!("Blob {}x{}x{}", size.x(), size.y(), size.z());
    println!("  Filled cells: {}", blob.field().filled_count());
    println!("  Vertices:     {}", blob.mesh().vertex_count());
    println!("  Triangles:    {}", blob.mesh().triangle_count());
}

#[cfg(feature = "cli")]
fn write_obj_or_exit(mesh: &Mesh, path: &Path) {
    match std::fs::write(path, to_obj(mesh)) {
        Ok(()) => println!("Saved {}", path.display()),
        Err(e) => {
            eprintln!("Write error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Wavefront OBJ with per-vertex colors and normals
#[cfg(feature = "cli")]
fn to_obj(mesh: &Mesh) -> String {
    let mut obj = String::new();
    obj.push_str("# Generated by voxel-blob\n");
    obj.push_str(&format!("# Vertices: {}\n", mesh.vertex_count()));
    obj.push_str(&format!("# Triangles: {}\n\n", mesh.triangle_count()));

    for v in &mesh.vertices {
        obj.push_str(&format!(
            "v {} {} {} {} {} {}\n",
            v.position.x, v.position.y, v.position.z, v.color.r, v.color.g, v.color.b
        ));
    }
    for v in &mesh.vertices {
        obj.push_str(&format!("vn {} {} {}\n", v.normal.x, v.normal.y, v.normal.z));
    }
    for tri in mesh.indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] + 1, tri[1] + 1, tri[2] + 1);
        obj.push_str(&format!("f {}//{} {}//{} {}//{}\n", a, a, b, b, c, c));
    }
    obj
}
