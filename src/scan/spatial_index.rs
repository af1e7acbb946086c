//! Uniform-grid spatial hash over world-space triangles (Deep Fried Edition)
//!
//! Cells are bucketed CSR-style: `cell_start`/`cell_count` slice into one
//! flat `cell_triangles` array. The index is immutable once built, so any
//! number of threads may query it at once as long as each brings its own
//! [`VisitScratch`].
//!
//! # Deep Fried Optimizations
//! - **Shell search**: nearest-triangle queries walk Chebyshev rings of cells
//!   outward and stop as soon as a whole ring is farther than the best hit.
//! - **Generation marks**: de-duplication of triangles spanning several
//!   cells costs one `u32` compare per visit, never an O(n) reset.
//! - **DDA parity**: the inside test walks only the cells its ray crosses.

use glam::{IVec3, Vec3};

use super::geometry::{ray_aabb, TriangleRecord};
use crate::types::Aabb;

/// Smallest permitted cell edge
const MIN_CELL_SIZE: f32 = 1e-4;

/// Upper bound on the number of cells; matches the largest field grid
pub const MAX_CELLS: usize = 1 << 18;

/// Offset of the parity ray origin along its direction
const RAY_START_OFFSET: f32 = 1e-4;

/// Hits closer than this to the origin do not count toward parity
const RAY_HIT_EPSILON: f32 = 1e-4;

/// Cell counts covering `extent`, or `None` when they exceed [`MAX_CELLS`]
fn grid_dims(extent: Vec3, cell_size: f32) -> Option<(IVec3, usize)> {
    let cells = (extent / cell_size).ceil().max(Vec3::ONE);
    if cells.max_element() > MAX_CELLS as f32 {
        return None;
    }
    let dims = cells.as_ivec3();
    let total = (dims.x as usize)
        .checked_mul(dims.y as usize)?
        .checked_mul(dims.z as usize)?;
    (total <= MAX_CELLS).then_some((dims, total))
}

/// Fixed parity-ray direction; deliberately off every axis and diagonal
#[inline(always)]
fn parity_ray_dir() -> Vec3 {
    Vec3::new(1.0, 0.123, 0.037).normalize()
}

/// Per-query "already tested" marks, one slot per triangle
///
/// Each worker owns one; it is never shared between threads.
#[derive(Debug, Clone)]
pub struct VisitScratch {
    marks: Vec<u32>,
    generation: u32,
}

impl VisitScratch {
    /// Scratch for an index holding `triangle_count` triangles
    pub fn new(triangle_count: usize) -> Self {
        VisitScratch {
            marks: vec![0; triangle_count],
            generation: 0,
        }
    }

    /// Start a new traversal
    #[inline]
    fn begin(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.marks.fill(0);
            self.generation = 1;
        }
    }

    /// Mark a triangle; `true` the first time it is seen in this traversal
    #[inline(always)]
    fn visit(&mut self, triangle: u32) -> bool {
        let slot = &mut self.marks[triangle as usize];
        if *slot == self.generation {
            false
        } else {
            *slot = self.generation;
            true
        }
    }
}

/// Spatial hash over the triangles of one target mesh
#[derive(Debug, Clone)]
pub struct TriangleSpatialIndex {
    bounds: Aabb,
    cell_size: f32,
    dims: IVec3,
    triangles: Vec<TriangleRecord>,
    cell_start: Vec<u32>,
    cell_count: Vec<u32>,
    cell_triangles: Vec<u32>,
}

impl TriangleSpatialIndex {
    /// Build the index over world-space `vertices` and triangle `indices`
    ///
    /// Triangles referencing missing vertices are skipped; a trailing partial
    /// triangle is ignored. Returns `None` when no triangle remains.
    ///
    /// # Arguments
    /// * `vertices` - World-space vertex positions
    /// * `indices` - Triangle list, three indices per triangle
    /// * `cell_size` - Cell edge length (normally the voxel size)
    pub fn build(vertices: &[Vec3], indices: &[u32], cell_size: f32) -> Option<Self> {
        let triangles: Vec<TriangleRecord> = indices
            .chunks_exact(3)
            .filter_map(|tri| {
                let a = *vertices.get(tri[0] as usize)?;
                let b = *vertices.get(tri[1] as usize)?;
                let c = *vertices.get(tri[2] as usize)?;
                Some(TriangleRecord::new(a, b, c))
            })
            .collect();

        if triangles.is_empty() {
            return None;
        }

        let mut bounds = Aabb::empty();
        for tri in &triangles {
            bounds.expand_point(tri.aabb.min);
            bounds.expand_point(tri.aabb.max);
        }

        let extent = bounds.size();
        if !extent.is_finite() {
            return None;
        }

        let mut cell_size = if cell_size.is_finite() {
            cell_size.max(MIN_CELL_SIZE)
        } else {
            MIN_CELL_SIZE
        };
        let requested = cell_size;
        let (dims, cell_total) = loop {
            if let Some(fit) = grid_dims(extent, cell_size) {
                break fit;
            }
            cell_size *= 2.0;
        };
        if cell_size != requested {
            log::debug!(
                "spatial index: cell size {:.4} coarsened to {:.4} to stay within {} cells",
                requested,
                cell_size,
                MAX_CELLS
            );
        }

        let mut index = TriangleSpatialIndex {
            bounds,
            cell_size,
            dims,
            triangles,
            cell_start: Vec::new(),
            cell_count: Vec::new(),
            cell_triangles: Vec::new(),
        };

        let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); cell_total];
        for (t, tri) in index.triangles.iter().enumerate() {
            let lo = index.cell_coord(tri.aabb.min);
            let hi = index.cell_coord(tri.aabb.max);
            for x in lo.x..=hi.x {
                for y in lo.y..=hi.y {
                    for z in lo.z..=hi.z {
                        buckets[index.cell_index(x, y, z)].push(t as u32);
                    }
                }
            }
        }

        index.cell_start.reserve(cell_total);
        index.cell_count.reserve(cell_total);
        for bucket in &buckets {
            index.cell_start.push(index.cell_triangles.len() as u32);
            index.cell_count.push(bucket.len() as u32);
            index.cell_triangles.extend_from_slice(bucket);
        }

        log::debug!(
            "spatial index: {} triangles in {}x{}x{} cells of {:.4}",
            index.triangles.len(),
            dims.x,
            dims.y,
            dims.z,
            cell_size
        );

        Some(index)
    }

    /// World bounds of all triangles
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Cell edge length
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cell counts per axis
    pub fn dims(&self) -> IVec3 {
        self.dims
    }

    /// Number of indexed triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Indexed triangles
    pub fn triangles(&self) -> &[TriangleRecord] {
        &self.triangles
    }

    /// Fresh scratch sized for this index
    pub fn scratch(&self) -> VisitScratch {
        VisitScratch::new(self.triangles.len())
    }

    #[inline(always)]
    fn cell_index(&self, x: i32, y: i32, z: i32) -> usize {
        ((x * self.dims.y + y) * self.dims.z + z) as usize
    }

    /// Cell containing `p`, clamped into the grid
    #[inline(always)]
    fn cell_coord(&self, p: Vec3) -> IVec3 {
        let c = ((p - self.bounds.min) / self.cell_size).floor();
        IVec3::new(c.x as i32, c.y as i32, c.z as i32).clamp(IVec3::ZERO, self.dims - IVec3::ONE)
    }

    #[inline(always)]
    fn cell_bounds(&self, cell: IVec3) -> Aabb {
        let min = self.bounds.min + cell.as_vec3() * self.cell_size;
        Aabb::new(min, min + Vec3::splat(self.cell_size))
    }

    #[inline(always)]
    fn cell_members(&self, cell: IVec3) -> &[u32] {
        let i = self.cell_index(cell.x, cell.y, cell.z);
        let start = self.cell_start[i] as usize;
        &self.cell_triangles[start..start + self.cell_count[i] as usize]
    }

    /// Squared distance from `p` to the nearest triangle
    pub fn nearest_distance_squared(&self, p: Vec3, scratch: &mut VisitScratch) -> f32 {
        scratch.begin();

        let center = self.cell_coord(p);
        let max_radius = self.dims.max_element();
        let upper = self.dims - IVec3::ONE;
        let mut best = f32::INFINITY;

        for r in 0..=max_radius {
            let lo = (center - IVec3::splat(r)).max(IVec3::ZERO);
            let hi = (center + IVec3::splat(r)).min(upper);
            let mut shell_min = f32::INFINITY;

            for x in lo.x..=hi.x {
                for y in lo.y..=hi.y {
                    for z in lo.z..=hi.z {
                        let cell = IVec3::new(x, y, z);
                        let offset = (cell - center).abs();
                        if offset.max_element() != r {
                            continue;
                        }

                        let cell_dist = self.cell_bounds(cell).distance_squared(p);
                        shell_min = shell_min.min(cell_dist);
                        if cell_dist > best {
                            continue;
                        }

                        for &t in self.cell_members(cell) {
                            if scratch.visit(t) {
                                best = best.min(self.triangles[t as usize].distance_squared(p));
                            }
                        }
                    }
                }
            }

            if shell_min > best {
                break;
            }
        }

        best
    }

    /// Distance from `p` to the nearest triangle
    #[inline]
    pub fn nearest_distance(&self, p: Vec3, scratch: &mut VisitScratch) -> f32 {
        self.nearest_distance_squared(p, scratch).sqrt()
    }

    /// Ray-parity inside test
    ///
    /// Casts a fixed oblique ray from just past `p`, walks the cells it
    /// crosses, and counts each triangle hit once. Odd counts are inside.
    pub fn is_inside(&self, p: Vec3, scratch: &mut VisitScratch) -> bool {
        let dir = parity_ray_dir();
        let origin = p + dir * RAY_START_OFFSET;
        let Some((t_enter, t_exit)) = ray_aabb(origin, dir, &self.bounds) else {
            return false;
        };

        scratch.begin();

        let start = origin + dir * t_enter;
        let mut cell = self.cell_coord(start);
        let mut step = IVec3::ZERO;
        let mut t_next = Vec3::splat(f32::INFINITY);
        let mut t_delta = Vec3::splat(f32::INFINITY);
        for axis in 0..3 {
            let d = dir[axis];
            if d.abs() < 1e-6 {
                continue;
            }
            step[axis] = if d > 0.0 { 1 } else { -1 };
            let boundary_cell = if d > 0.0 { cell[axis] + 1 } else { cell[axis] };
            let boundary = self.bounds.min[axis] + boundary_cell as f32 * self.cell_size;
            t_next[axis] = (boundary - origin[axis]) / d;
            t_delta[axis] = self.cell_size / d.abs();
        }

        let mut hits = 0u32;
        loop {
            for &t in self.cell_members(cell) {
                if !scratch.visit(t) {
                    continue;
                }
                if let Some(hit_t) = self.triangles[t as usize].intersect_ray(origin, dir) {
                    if hit_t > RAY_HIT_EPSILON {
                        hits += 1;
                    }
                }
            }

            let axis = if t_next.x <= t_next.y && t_next.x <= t_next.z {
                0
            } else if t_next.y <= t_next.z {
                1
            } else {
                2
            };
            if t_next[axis] > t_exit {
                break;
            }
            cell[axis] += step[axis];
            if cell[axis] < 0 || cell[axis] >= self.dims[axis] {
                break;
            }
            t_next[axis] += t_delta[axis];
        }

        hits % 2 == 1
    }

    /// Distance to the surface, negative inside
    #[inline]
    pub fn signed_distance(&self, p: Vec3, scratch: &mut VisitScratch) -> f32 {
        let d = self.nearest_distance(p, scratch);
        if self.is_inside(p, scratch) {
            -d
        } else {
            d
        }
    }
}
