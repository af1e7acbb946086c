//! Scanning external targets into a voxel grid (Deep Fried Edition)
//!
//! A [`Scanner`] converts a target, a triangle mesh and/or an
//! [`OccupancyOracle`], into per-cell density and color in a
//! [`ScanBuffer`]. Signed distance `d` maps to density as
//! `clamp01(iso - d / (2 * distance_max))`, so the surface lands on the iso
//! level, deep interior saturates to 1 and far exterior to 0.
//!
//! The target is sampled as if moved onto the field's origin (keeping its
//! own rotation and scale), so scans capture shape, not placement.
//!
//! # Strategies
//! - **Mesh distance**: [`TriangleSpatialIndex`] nearest distance + ray parity,
//!   serial or X-slab parallel.
//! - **Surface voxelization**: shell rasterization, seal dilation and
//!   boundary flood fill; robust for open meshes.
//! - **Occupancy oracle**: closest point + probe penetration per cell.
//! - **Ray to center**: offset penetration probes plus one ray toward the
//!   collider's center; intended for convex colliders.
//!
//! # Deep Fried Optimizations
//! - **Cached index**: world vertices and the spatial index survive across
//!   scans until the mesh, its transform or the voxel size changes.
//! - **Worker-local scratch**: `for_each_init` hands every rayon worker its
//!   own [`VisitScratch`]; output slabs are disjoint so nothing is locked.

pub mod geometry;
pub mod oracle;
pub mod spatial_index;
pub mod voxelize;

pub use geometry::TriangleRecord;
pub use oracle::{BoxCollider, OccupancyOracle, Penetration, ProbeSphere, SphereCollider};
pub use spatial_index::{TriangleSpatialIndex, VisitScratch};
pub use voxelize::VoxelizeParams;

use std::sync::Arc;

use glam::{Affine3A, Vec3};
use rayon::prelude::*;

use crate::config::ScanConfig;
use crate::field::{ScanBuffer, VoxelField};
use crate::types::{Aabb, Color, Transform};

/// Probes within this distance of the surface count as inside
const SURFACE_CONTACT: f32 = 1e-4;

/// Geometry of a scan target in its own local space
#[derive(Debug, Clone, Default)]
pub struct TargetMesh {
    /// Local-space vertex positions
    pub vertices: Vec<Vec3>,
    /// Triangle list, three indices per triangle
    pub indices: Vec<u32>,
    /// Optional per-vertex colors
    pub colors: Option<Vec<Color>>,
}

impl TargetMesh {
    /// Uncolored mesh
    pub fn new(vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        TargetMesh {
            vertices,
            indices,
            colors: None,
        }
    }

    /// Builder: attach per-vertex colors
    pub fn with_colors(mut self, colors: Vec<Color>) -> Self {
        self.colors = Some(colors);
        self
    }

    /// Closed axis-aligned box centered on the origin, wound outward
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents.abs();
        let vertices = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1, 0, 3, 2,
            4, 5, 6, 4, 6, 7,
            0, 1, 5, 0, 5, 4,
            3, 6, 2, 3, 7, 6,
            0, 4, 7, 0, 7, 3,
            1, 2, 6, 1, 6, 5,
        ];
        TargetMesh::new(vertices, indices)
    }

    /// At least one complete triangle
    pub fn has_triangles(&self) -> bool {
        self.indices.len() >= 3 && !self.vertices.is_empty()
    }

    /// Vertex colors, only when there is exactly one per vertex
    pub fn vertex_colors(&self) -> Option<&[Color]> {
        self.colors
            .as_deref()
            .filter(|c| !c.is_empty() && c.len() == self.vertices.len())
    }
}

/// Something to scan: placement plus whatever geometry it exposes
#[derive(Clone, Copy)]
pub struct ScanTarget<'a> {
    /// World placement of the target
    pub transform: Transform,
    /// Triangle mesh, if readable
    pub mesh: Option<&'a Arc<TargetMesh>>,
    /// Closest-point / penetration oracle, if any
    pub collider: Option<&'a dyn OccupancyOracle>,
    /// Color used when the mesh carries no vertex colors
    pub material_color: Color,
}

impl<'a> ScanTarget<'a> {
    /// Target with no geometry yet
    pub fn new(transform: Transform) -> Self {
        ScanTarget {
            transform,
            mesh: None,
            collider: None,
            material_color: Color::WHITE,
        }
    }

    /// Builder: attach a mesh
    pub fn with_mesh(mut self, mesh: &'a Arc<TargetMesh>) -> Self {
        self.mesh = Some(mesh);
        self
    }

    /// Builder: attach an oracle
    pub fn with_collider(mut self, collider: &'a dyn OccupancyOracle) -> Self {
        self.collider = Some(collider);
        self
    }

    /// Builder: set the fallback color
    pub fn with_material_color(mut self, color: Color) -> Self {
        self.material_color = color;
        self
    }

    /// World bounds of the target: its transformed mesh, else its collider
    pub fn world_bounds(&self) -> Option<Aabb> {
        if let Some(mesh) = self.usable_mesh() {
            let matrix = self.transform.matrix();
            return Aabb::from_points(mesh.vertices.iter().map(|&v| matrix.transform_point3(v)));
        }
        self.collider.map(|c| c.bounds())
    }

    fn usable_mesh(&self) -> Option<&'a Arc<TargetMesh>> {
        self.mesh.filter(|m| m.has_triangles())
    }
}

/// Which sampling path a scan took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStrategy {
    /// Spatial-index distance and parity, one thread
    MeshDistance,
    /// Spatial-index distance and parity on the rayon pool
    MeshDistanceParallel,
    /// Shell rasterization and flood fill
    SurfaceVoxelization,
    /// Closest-point and penetration probes
    OccupancyOracle,
    /// Offset probes and a ray toward the collider center
    RaycastToCenter,
}

/// Pick the strategy for a target, `None` when nothing usable is available
///
/// The mesh is used when requested and present, or automatically when
/// there is a mesh but no collider. Ray-to-center needs a collider and wins
/// when enabled.
pub fn select_strategy(config: &ScanConfig, target: &ScanTarget<'_>) -> Option<ScanStrategy> {
    let can_mesh = target.usable_mesh().is_some();
    let can_collider = target.collider.is_some();
    let use_mesh = if config.use_mesh_distance {
        can_mesh
    } else {
        !can_collider && can_mesh
    };

    if !use_mesh && !can_collider {
        return None;
    }
    if config.use_raycast_to_center {
        return can_collider.then_some(ScanStrategy::RaycastToCenter);
    }
    if use_mesh && config.use_surface_voxelization {
        return Some(ScanStrategy::SurfaceVoxelization);
    }
    if use_mesh {
        return Some(if config.use_parallel {
            ScanStrategy::MeshDistanceParallel
        } else {
            ScanStrategy::MeshDistance
        });
    }
    Some(ScanStrategy::OccupancyOracle)
}

/// Grid-to-world mapping shared by all strategies
struct ScanFrame {
    field_to_world: Affine3A,
    world_to_field: Affine3A,
    scan_offset: Vec3,
    center: Vec3,
    voxel_size: f32,
    iso_level: f32,
    distance_max: f32,
}

impl ScanFrame {
    fn new(field: &VoxelField, field_transform: &Transform, target: &Transform, distance_max: f32) -> Self {
        ScanFrame {
            field_to_world: field_transform.matrix(),
            world_to_field: field_transform.inverse_matrix(),
            scan_offset: target.position - field_transform.position,
            center: field.grid_center(),
            voxel_size: field.voxel_size(),
            iso_level: field.iso_level(),
            distance_max: distance_max.max(0.01),
        }
    }

    /// World-space sample point of a cell, relative to the target's placement
    #[inline(always)]
    fn cell_world(&self, x: usize, y: usize, z: usize) -> Vec3 {
        let local = (Vec3::new(x as f32, y as f32, z as f32) - self.center) * self.voxel_size;
        self.field_to_world.transform_point3(local) + self.scan_offset
    }

    /// Field-local position of a target world point
    #[inline(always)]
    fn world_to_local(&self, world: Vec3) -> Vec3 {
        self.world_to_field.transform_point3(world - self.scan_offset)
    }

    #[inline(always)]
    fn density(&self, signed_distance: f32) -> f32 {
        (self.iso_level - signed_distance / (2.0 * self.distance_max)).clamp(0.0, 1.0)
    }
}

/// Nearest-vertex color lookup in the target's local space
struct ColorSampler<'a> {
    vertices: &'a [Vec3],
    colors: Option<&'a [Color]>,
    fallback: Color,
    world_to_target: Affine3A,
}

impl<'a> ColorSampler<'a> {
    fn new(target: &ScanTarget<'a>) -> Self {
        let mesh = target.usable_mesh();
        ColorSampler {
            vertices: mesh.map(|m| m.vertices.as_slice()).unwrap_or(&[]),
            colors: mesh.and_then(|m| m.vertex_colors()),
            fallback: target.material_color,
            world_to_target: target.transform.inverse_matrix(),
        }
    }

    #[inline]
    fn sample(&self, world: Vec3) -> Color {
        let Some(colors) = self.colors else {
            return self.fallback;
        };
        let local = self.world_to_target.transform_point3(world);
        let mut best = f32::INFINITY;
        let mut color = self.fallback;
        for (v, c) in self.vertices.iter().zip(colors) {
            let d = (*v - local).length_squared();
            if d < best {
                best = d;
                color = *c;
            }
        }
        color
    }
}

/// World-space copy of the target mesh and its spatial index
#[derive(Debug)]
struct IndexCache {
    mesh: Arc<TargetMesh>,
    transform: Transform,
    voxel_size: f32,
    index: TriangleSpatialIndex,
}

impl IndexCache {
    fn matches(&self, mesh: &Arc<TargetMesh>, transform: &Transform, voxel_size: f32) -> bool {
        Arc::ptr_eq(&self.mesh, mesh)
            && self.transform == *transform
            && (self.voxel_size - voxel_size).abs() <= f32::EPSILON * voxel_size.abs().max(1.0)
    }
}

/// Samples scan targets into a [`ScanBuffer`]
#[derive(Debug, Default)]
pub struct Scanner {
    cache: Option<IndexCache>,
    builds: u64,
}

impl Scanner {
    /// Create a scanner with an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the cached spatial index
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Spatial index from the last mesh-based scan
    pub fn cached_index(&self) -> Option<&TriangleSpatialIndex> {
        self.cache.as_ref().map(|c| &c.index)
    }

    /// How many times a spatial index has been built
    pub fn index_builds(&self) -> u64 {
        self.builds
    }

    /// Scan `target` into `buffer`
    ///
    /// `buffer` is resized to the field's extents if needed and then fully
    /// overwritten. When the target offers nothing usable the buffer is left
    /// untouched and `None` is returned.
    ///
    /// # Arguments
    /// * `field` - Supplies extents, voxel size and iso level
    /// * `field_transform` - World placement of the field
    /// * `target` - Geometry to scan
    /// * `config` - Strategy switches and distance scale
    /// * `buffer` - Destination grid
    pub fn scan(
        &mut self,
        field: &VoxelField,
        field_transform: &Transform,
        target: &ScanTarget<'_>,
        config: &ScanConfig,
        buffer: &mut ScanBuffer,
    ) -> Option<ScanStrategy> {
        let Some(strategy) = select_strategy(config, target) else {
            log::warn!("scan skipped: target has no readable mesh and no collider");
            return None;
        };

        let frame = ScanFrame::new(field, field_transform, &target.transform, config.distance_max);
        let colors = ColorSampler::new(target);

        let cache = match (strategy, target.usable_mesh()) {
            (ScanStrategy::RaycastToCenter | ScanStrategy::OccupancyOracle, _) => None,
            (_, Some(mesh)) => match self.ensure_cache(mesh, &target.transform, frame.voxel_size) {
                Some(cache) => Some(cache),
                None => {
                    log::warn!("scan skipped: mesh has no triangle with valid vertex indices");
                    return None;
                }
            },
            (_, None) => return None,
        };

        if buffer.size() != field.size() {
            buffer.resize(field.size(), false);
        }

        match (strategy, target.collider, cache) {
            (ScanStrategy::RaycastToCenter, Some(oracle), _) => {
                scan_raycast_to_center(&frame, oracle, &colors, buffer);
            }
            (ScanStrategy::OccupancyOracle, Some(oracle), _) => {
                scan_oracle(&frame, oracle, &colors, buffer);
            }
            (ScanStrategy::SurfaceVoxelization, _, Some(cache)) => {
                scan_voxelized(&frame, cache, &colors, config, buffer);
            }
            (ScanStrategy::MeshDistance, _, Some(cache)) => {
                scan_mesh_distance(&frame, &cache.index, &colors, false, buffer);
            }
            (ScanStrategy::MeshDistanceParallel, _, Some(cache)) => {
                scan_mesh_distance(&frame, &cache.index, &colors, true, buffer);
            }
            _ => return None,
        }

        log::debug!(
            "scanned target with {:?}: {} of {} cells at or above iso",
            strategy,
            buffer.filled_count(frame.iso_level),
            buffer.size().volume()
        );
        Some(strategy)
    }

    fn ensure_cache(&mut self, mesh: &Arc<TargetMesh>, transform: &Transform, voxel_size: f32) -> Option<&IndexCache> {
        let fresh = self
            .cache
            .as_ref()
            .is_some_and(|c| c.matches(mesh, transform, voxel_size));

        if !fresh {
            self.cache = None;
            let matrix = transform.matrix();
            let world_vertices: Vec<Vec3> =
                mesh.vertices.iter().map(|&v| matrix.transform_point3(v)).collect();
            let index = TriangleSpatialIndex::build(&world_vertices, &mesh.indices, voxel_size)?;
            self.builds += 1;
            self.cache = Some(IndexCache {
                mesh: Arc::clone(mesh),
                transform: *transform,
                voxel_size,
                index,
            });
        }

        self.cache.as_ref()
    }
}

/// Write every cell in X-major order on the calling thread
fn fill_serial<F>(buffer: &mut ScanBuffer, mut sample: F)
where
    F: FnMut(usize, usize, usize) -> (f32, Color),
{
    let size = buffer.size();
    let (density, color) = buffer.split_mut();
    let mut i = 0;
    for x in 0..size.x() {
        for y in 0..size.y() {
            for z in 0..size.z() {
                let (d, c) = sample(x, y, z);
                density[i] = d;
                color[i] = c;
                i += 1;
            }
        }
    }
}

/// Write every cell with one rayon task per X slab
///
/// `init` builds worker-local state, handed mutably to each `sample` call.
fn fill_parallel<T, I, F>(buffer: &mut ScanBuffer, init: I, sample: F)
where
    I: Fn() -> T + Sync + Send,
    F: Fn(&mut T, usize, usize, usize) -> (f32, Color) + Sync + Send,
{
    let size = buffer.size();
    let slab = size.slab_len();
    let depth = size.z();
    let (density, color) = buffer.split_mut();

    density
        .par_chunks_mut(slab)
        .zip(color.par_chunks_mut(slab))
        .enumerate()
        .for_each_init(init, |state, (x, (densities, colors))| {
            for (j, (d, c)) in densities.iter_mut().zip(colors.iter_mut()).enumerate() {
                let (dv, cv) = sample(state, x, j / depth, j % depth);
                *d = dv;
                *c = cv;
            }
        });
}

fn scan_mesh_distance(
    frame: &ScanFrame,
    index: &TriangleSpatialIndex,
    colors: &ColorSampler<'_>,
    parallel: bool,
    buffer: &mut ScanBuffer,
) {
    let bounds = index.bounds();
    let reach_sq = frame.distance_max * frame.distance_max;
    let sample = |scratch: &mut VisitScratch, x: usize, y: usize, z: usize| {
        let world = frame.cell_world(x, y, z);
        if bounds.distance_squared(world) > reach_sq {
            return (0.0, colors.fallback);
        }
        let sd = index.signed_distance(world, scratch);
        (frame.density(sd), colors.sample(world))
    };

    if parallel {
        fill_parallel(buffer, || index.scratch(), sample);
    } else {
        let mut scratch = index.scratch();
        fill_serial(buffer, |x, y, z| sample(&mut scratch, x, y, z));
    }
}

fn scan_voxelized(
    frame: &ScanFrame,
    cache: &IndexCache,
    colors: &ColorSampler<'_>,
    config: &ScanConfig,
    buffer: &mut ScanBuffer,
) {
    let local: Vec<TriangleRecord> = cache
        .index
        .triangles()
        .iter()
        .map(|t| {
            TriangleRecord::new(
                frame.world_to_local(t.a),
                frame.world_to_local(t.b),
                frame.world_to_local(t.c),
            )
        })
        .collect();

    let size = buffer.size();
    let params = VoxelizeParams {
        thickness: config.surface_thickness,
        seal_voxels: config.surface_seal_voxels,
    };
    let solid = voxelize::solid_mask(size, frame.voxel_size, &local, params);

    fill_serial(buffer, |x, y, z| {
        if solid[size.index(x, y, z)] {
            (1.0, colors.sample(frame.cell_world(x, y, z)))
        } else {
            (0.0, colors.fallback)
        }
    });
}

fn scan_oracle(
    frame: &ScanFrame,
    oracle: &dyn OccupancyOracle,
    colors: &ColorSampler<'_>,
    buffer: &mut ScanBuffer,
) {
    let probe_radius = (frame.voxel_size * 0.001).max(1e-4);
    let half_voxel = frame.voxel_size * 0.5;

    fill_serial(buffer, |x, y, z| {
        let world = frame.cell_world(x, y, z);
        let distance = (world - oracle.closest_point(world)).length();
        let penetration = oracle.compute_penetration(&ProbeSphere::new(world, probe_radius));

        let sd = match penetration {
            Some(p) => -p.depth,
            None if distance <= SURFACE_CONTACT => -distance.max(half_voxel),
            None => distance,
        };
        (frame.density(sd), colors.sample(world))
    });
}

fn scan_raycast_to_center(
    frame: &ScanFrame,
    oracle: &dyn OccupancyOracle,
    colors: &ColorSampler<'_>,
    buffer: &mut ScanBuffer,
) {
    let bounds = oracle.bounds();
    let center = bounds.center();
    let voxel = frame.voxel_size;
    let eps = (voxel * 0.05).max(1e-4);
    let max_ray = frame.distance_max.max(bounds.half_extents().length()) * 2.0;
    let probe_radius = eps.max(voxel * 0.15);
    let o = voxel * 0.25;
    let offsets = [
        Vec3::ZERO,
        Vec3::new(o, 0.0, 0.0),
        Vec3::new(-o, 0.0, 0.0),
        Vec3::new(0.0, o, 0.0),
        Vec3::new(0.0, -o, 0.0),
        Vec3::new(0.0, 0.0, o),
        Vec3::new(0.0, 0.0, -o),
    ];

    fill_serial(buffer, |x, y, z| {
        let world = frame.cell_world(x, y, z);
        let depth = offsets.iter().find_map(|offset| {
            oracle
                .compute_penetration(&ProbeSphere::new(world + *offset, probe_radius))
                .map(|p| p.depth)
        });

        let to_center = center - world;
        let d = to_center.length();
        let surface = if d <= eps {
            0.0
        } else {
            let limit = max_ray.min(d + max_ray * 0.5);
            oracle.raycast(world, to_center / d, limit).unwrap_or(max_ray)
        }
        .min(frame.distance_max);

        let sd = match depth {
            Some(depth) => -surface.max(depth),
            None => surface,
        };
        (frame.density(sd), colors.sample(world))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GridSize;
    use glam::Quat;

    fn field(n: i32) -> VoxelField {
        VoxelField::new(GridSize::cubic(n), 1.0, 0.5)
    }

    fn mesh_config() -> ScanConfig {
        ScanConfig {
            distance_max: 1.0,
            use_mesh_distance: true,
            use_parallel: false,
            ..ScanConfig::default()
        }
    }

    #[test]
    fn test_strategy_selection() {
        let mesh = Arc::new(TargetMesh::cuboid(Vec3::ONE));
        let empty = Arc::new(TargetMesh::default());
        let sphere = SphereCollider::new(Vec3::ZERO, 1.0);
        let base = ScanTarget::new(Transform::IDENTITY);
        let config = ScanConfig::default();

        assert_eq!(select_strategy(&config, &base), None);
        assert_eq!(select_strategy(&config, &base.with_mesh(&empty)), None);
        assert_eq!(
            select_strategy(&config, &base.with_mesh(&mesh)),
            Some(ScanStrategy::MeshDistanceParallel)
        );
        assert_eq!(
            select_strategy(&config, &base.with_mesh(&mesh).with_collider(&sphere)),
            Some(ScanStrategy::OccupancyOracle)
        );

        let prefer_mesh = ScanConfig {
            use_mesh_distance: true,
            use_parallel: false,
            ..config
        };
        assert_eq!(
            select_strategy(&prefer_mesh, &base.with_mesh(&mesh).with_collider(&sphere)),
            Some(ScanStrategy::MeshDistance)
        );
        assert_eq!(
            select_strategy(&prefer_mesh, &base.with_collider(&sphere)),
            Some(ScanStrategy::OccupancyOracle)
        );

        let voxelize = ScanConfig {
            use_surface_voxelization: true,
            ..prefer_mesh
        };
        assert_eq!(
            select_strategy(&voxelize, &base.with_mesh(&mesh)),
            Some(ScanStrategy::SurfaceVoxelization)
        );

        let ray = ScanConfig {
            use_raycast_to_center: true,
            ..voxelize
        };
        assert_eq!(select_strategy(&ray, &base.with_mesh(&mesh)), None);
        assert_eq!(
            select_strategy(&ray, &base.with_mesh(&mesh).with_collider(&sphere)),
            Some(ScanStrategy::RaycastToCenter)
        );
    }

    #[test]
    fn test_world_bounds() {
        let mesh = Arc::new(TargetMesh::cuboid(Vec3::ONE));
        let sphere = SphereCollider::new(Vec3::new(0.0, 5.0, 0.0), 1.0);
        let transform = Transform::from_position(Vec3::X).with_scale(Vec3::splat(2.0));

        let bounds = ScanTarget::new(transform).with_mesh(&mesh).world_bounds().unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, -2.0));
        assert_eq!(bounds.max, Vec3::new(3.0, 2.0, 2.0));

        let bounds = ScanTarget::new(transform).with_collider(&sphere).world_bounds().unwrap();
        assert_eq!(bounds.center(), Vec3::new(0.0, 5.0, 0.0));
        assert!(ScanTarget::new(transform).world_bounds().is_none());
    }

    #[test]
    fn test_no_geometry_leaves_buffer_untouched() {
        let f = field(4);
        let mut buffer = ScanBuffer::new(GridSize::cubic(2));
        buffer.fill(0.7, Color::WHITE);

        let mut scanner = Scanner::new();
        let target = ScanTarget::new(Transform::IDENTITY);
        let result = scanner.scan(&f, &Transform::IDENTITY, &target, &ScanConfig::default(), &mut buffer);

        assert_eq!(result, None);
        assert_eq!(buffer.size(), GridSize::cubic(2));
        assert!(buffer.densities().iter().all(|&d| d == 0.7));
    }

    #[test]
    fn test_mesh_scan_inside_outside() {
        let f = field(9);
        let mesh = Arc::new(TargetMesh::cuboid(Vec3::splat(2.3)));
        let target = ScanTarget::new(Transform::IDENTITY).with_mesh(&mesh);
        let mut buffer = ScanBuffer::new(GridSize::cubic(1));

        let mut scanner = Scanner::new();
        let used = scanner.scan(&f, &Transform::IDENTITY, &target, &mesh_config(), &mut buffer);

        assert_eq!(used, Some(ScanStrategy::MeshDistance));
        assert_eq!(buffer.size(), f.size());
        // center cell is 2.3 deep: 0.5 + 2.3 / 2 saturates
        assert_eq!(buffer.density(4, 4, 4), 1.0);
        // corner cell is far outside
        assert_eq!(buffer.density(0, 0, 0), 0.0);
        // cells within the cube sit above iso, cells outside below
        assert!(buffer.density(6, 4, 4) > 0.5);
        assert!(buffer.density(7, 4, 4) < 0.5);
        assert_eq!(buffer.filled_count(0.5), 125);
        assert_eq!(buffer.color(4, 4, 4), Color::WHITE);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let f = VoxelField::new(GridSize::new(7, 9, 5), 0.5, 0.5);
        let mesh = Arc::new(TargetMesh::cuboid(Vec3::new(1.1, 1.7, 0.8)));
        let transform = Transform::from_position(Vec3::new(3.0, -2.0, 1.0))
            .with_rotation(Quat::from_rotation_y(0.4));
        let target = ScanTarget::new(transform).with_mesh(&mesh);

        let mut serial = ScanBuffer::new(f.size());
        let mut parallel = ScanBuffer::new(f.size());
        let mut scanner = Scanner::new();

        scanner.scan(&f, &Transform::IDENTITY, &target, &mesh_config(), &mut serial);
        let config = ScanConfig {
            use_parallel: true,
            ..mesh_config()
        };
        let used = scanner.scan(&f, &Transform::IDENTITY, &target, &config, &mut parallel);

        assert_eq!(used, Some(ScanStrategy::MeshDistanceParallel));
        assert_eq!(serial.densities(), parallel.densities());
        assert!(serial.filled_count(0.5) > 0);
    }

    #[test]
    fn test_scan_ignores_target_position() {
        let f = field(9);
        let mesh = Arc::new(TargetMesh::cuboid(Vec3::splat(2.3)));
        let config = mesh_config();
        let mut scanner = Scanner::new();

        let mut here = ScanBuffer::new(f.size());
        let target = ScanTarget::new(Transform::IDENTITY).with_mesh(&mesh);
        scanner.scan(&f, &Transform::IDENTITY, &target, &config, &mut here);

        let mut there = ScanBuffer::new(f.size());
        let moved = ScanTarget::new(Transform::from_position(Vec3::new(40.0, 5.0, -12.0))).with_mesh(&mesh);
        scanner.scan(&f, &Transform::from_position(Vec3::new(-3.0, 0.0, 0.0)), &moved, &config, &mut there);

        assert_eq!(here.filled_count(0.5), there.filled_count(0.5));
        assert_eq!(there.density(4, 4, 4), 1.0);
    }

    #[test]
    fn test_index_cache_reuse() {
        let f = field(5);
        let mesh = Arc::new(TargetMesh::cuboid(Vec3::ONE));
        let target = ScanTarget::new(Transform::IDENTITY).with_mesh(&mesh);
        let config = mesh_config();
        let mut buffer = ScanBuffer::new(f.size());
        let mut scanner = Scanner::new();

        scanner.scan(&f, &Transform::IDENTITY, &target, &config, &mut buffer);
        scanner.scan(&f, &Transform::IDENTITY, &target, &config, &mut buffer);
        assert_eq!(scanner.index_builds(), 1);
        assert!(scanner.cached_index().is_some());

        let scaled = ScanTarget::new(Transform::IDENTITY.with_scale(Vec3::splat(2.0))).with_mesh(&mesh);
        scanner.scan(&f, &Transform::IDENTITY, &scaled, &config, &mut buffer);
        assert_eq!(scanner.index_builds(), 2);

        let copy = Arc::new(TargetMesh::cuboid(Vec3::ONE));
        let other = ScanTarget::new(Transform::IDENTITY.with_scale(Vec3::splat(2.0))).with_mesh(&copy);
        scanner.scan(&f, &Transform::IDENTITY, &other, &config, &mut buffer);
        assert_eq!(scanner.index_builds(), 3);

        scanner.invalidate();
        assert!(scanner.cached_index().is_none());
    }

    #[test]
    fn test_invalid_indices_skip_scan() {
        let f = field(4);
        let mesh = Arc::new(TargetMesh::new(vec![Vec3::ZERO], vec![0, 5, 9]));
        let target = ScanTarget::new(Transform::IDENTITY).with_mesh(&mesh);
        let mut buffer = ScanBuffer::new(GridSize::cubic(2));

        let mut scanner = Scanner::new();
        assert_eq!(scanner.scan(&f, &Transform::IDENTITY, &target, &mesh_config(), &mut buffer), None);
        assert_eq!(buffer.size(), GridSize::cubic(2));
    }

    #[test]
    fn test_surface_voxelization_cube() {
        let f = field(9);
        let mesh = Arc::new(TargetMesh::cuboid(Vec3::splat(2.0)));
        let target = ScanTarget::new(Transform::IDENTITY)
            .with_mesh(&mesh)
            .with_material_color(Color::rgb(0.2, 0.4, 0.6));
        let config = ScanConfig {
            use_surface_voxelization: true,
            ..mesh_config()
        };
        let mut buffer = ScanBuffer::new(f.size());

        let used = Scanner::new().scan(&f, &Transform::IDENTITY, &target, &config, &mut buffer);
        assert_eq!(used, Some(ScanStrategy::SurfaceVoxelization));
        assert_eq!(buffer.filled_count(0.5), 125);
        assert_eq!(buffer.density(4, 4, 4), 1.0);
        assert_eq!(buffer.density(0, 4, 4), 0.0);
        assert_eq!(buffer.color(0, 0, 0), Color::rgb(0.2, 0.4, 0.6));
    }

    #[test]
    fn test_vertex_colors_nearest() {
        let f = field(9);
        let red = Color::rgb(1.0, 0.0, 0.0);
        let blue = Color::rgb(0.0, 0.0, 1.0);
        let base = TargetMesh::cuboid(Vec3::splat(2.3));
        // -x face red, +x face blue
        let colors = base
            .vertices
            .iter()
            .map(|v| if v.x < 0.0 { red } else { blue })
            .collect();
        let mesh = Arc::new(base.with_colors(colors));
        let target = ScanTarget::new(Transform::IDENTITY).with_mesh(&mesh);
        let mut buffer = ScanBuffer::new(f.size());

        Scanner::new().scan(&f, &Transform::IDENTITY, &target, &mesh_config(), &mut buffer);
        assert_eq!(buffer.color(2, 4, 4), red);
        assert_eq!(buffer.color(6, 4, 4), blue);
    }

    #[test]
    fn test_oracle_scan_sphere() {
        let f = field(9);
        let sphere = SphereCollider::new(Vec3::ZERO, 2.5);
        let target = ScanTarget::new(Transform::IDENTITY).with_collider(&sphere);
        let config = ScanConfig {
            distance_max: 1.0,
            ..ScanConfig::default()
        };
        let mut buffer = ScanBuffer::new(f.size());

        let used = Scanner::new().scan(&f, &Transform::IDENTITY, &target, &config, &mut buffer);
        assert_eq!(used, Some(ScanStrategy::OccupancyOracle));
        assert_eq!(buffer.density(4, 4, 4), 1.0);
        assert_eq!(buffer.density(0, 0, 0), 0.0);
        assert!(buffer.density(6, 4, 4) > 0.5);
        assert!(buffer.density(8, 4, 4) < 0.5);
    }

    #[test]
    fn test_raycast_to_center_sphere() {
        let f = field(9);
        let sphere = SphereCollider::new(Vec3::ZERO, 2.5);
        let target = ScanTarget::new(Transform::IDENTITY).with_collider(&sphere);
        let config = ScanConfig {
            distance_max: 1.0,
            use_raycast_to_center: true,
            ..ScanConfig::default()
        };
        let mut buffer = ScanBuffer::new(f.size());

        let used = Scanner::new().scan(&f, &Transform::IDENTITY, &target, &config, &mut buffer);
        assert_eq!(used, Some(ScanStrategy::RaycastToCenter));
        assert_eq!(buffer.density(4, 4, 4), 1.0);
        assert_eq!(buffer.density(0, 0, 0), 0.0);
        // half a voxel outside along +x: 0.5 - 0.5 / (2 * 1)
        assert!((buffer.density(7, 4, 4) - 0.25).abs() < 1e-3);
    }
}
