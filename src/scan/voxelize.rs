//! Surface voxelization with gap sealing and boundary flood fill
//!
//! Robust against open or non-manifold meshes where ray parity fails:
//! triangles are rasterized into a thin shell, the shell is dilated to close
//! small holes, and everything the outside cannot reach through 6-connected
//! empty cells is solid.

use std::collections::VecDeque;

use glam::{IVec3, Vec3};

use super::geometry::TriangleRecord;
use crate::types::GridSize;

/// Bounds on the shell thickness, as a fraction of the voxel size
const THICKNESS_RANGE: (f32, f32) = (0.05, 1.0);

/// Shell rasterization settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelizeParams {
    /// Shell half-thickness as a fraction of a voxel (clamped to `[0.05, 1]`)
    pub thickness: f32,
    /// Chebyshev dilation radius applied to the shell, in voxels
    pub seal_voxels: u32,
}

/// Classify every cell of a grid as solid (`true`) or outside (`false`)
///
/// `triangles` must already be in the field's local space, where cell
/// `(x, y, z)` sits at `((x, y, z) - center) * voxel_size`.
pub fn solid_mask(
    size: GridSize,
    voxel_size: f32,
    triangles: &[TriangleRecord],
    params: VoxelizeParams,
) -> Vec<bool> {
    let center = size.center();
    let thickness = voxel_size * params.thickness.clamp(THICKNESS_RANGE.0, THICKNESS_RANGE.1);
    let thickness_sq = thickness * thickness;
    let upper = size.as_ivec3() - IVec3::ONE;

    let mut shell = vec![false; size.volume()];
    for tri in triangles {
        let lo_cell = tri.aabb.min / voxel_size + center;
        let hi_cell = tri.aabb.max / voxel_size + center;
        let lo = (lo_cell.floor().as_ivec3() - IVec3::ONE).clamp(IVec3::ZERO, upper);
        let hi = (hi_cell.ceil().as_ivec3() + IVec3::ONE).clamp(IVec3::ZERO, upper);

        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                for z in lo.z..=hi.z {
                    let i = size.index(x as usize, y as usize, z as usize);
                    if shell[i] {
                        continue;
                    }
                    let local = (Vec3::new(x as f32, y as f32, z as f32) - center) * voxel_size;
                    if tri.distance_squared(local) <= thickness_sq {
                        shell[i] = true;
                    }
                }
            }
        }
    }

    let blocked = if params.seal_voxels > 0 {
        dilate(size, &shell, params.seal_voxels as i32)
    } else {
        shell
    };

    let outside = flood_from_boundary(size, &blocked);
    outside.into_iter().map(|o| !o).collect()
}

/// Cube-shaped morphological dilation
fn dilate(size: GridSize, mask: &[bool], radius: i32) -> Vec<bool> {
    let upper = size.as_ivec3() - IVec3::ONE;
    let mut out = vec![false; mask.len()];
    for x in 0..size.x() {
        for y in 0..size.y() {
            for z in 0..size.z() {
                if !mask[size.index(x, y, z)] {
                    continue;
                }
                let c = IVec3::new(x as i32, y as i32, z as i32);
                let lo = (c - IVec3::splat(radius)).max(IVec3::ZERO);
                let hi = (c + IVec3::splat(radius)).min(upper);
                for dx in lo.x..=hi.x {
                    for dy in lo.y..=hi.y {
                        for dz in lo.z..=hi.z {
                            out[size.index(dx as usize, dy as usize, dz as usize)] = true;
                        }
                    }
                }
            }
        }
    }
    out
}

/// Cells reachable from the grid boundary through unblocked 6-neighbors
fn flood_from_boundary(size: GridSize, blocked: &[bool]) -> Vec<bool> {
    let (sx, sy, sz) = (size.x(), size.y(), size.z());
    let mut outside = vec![false; blocked.len()];
    let mut queue = VecDeque::new();

    for x in 0..sx {
        for y in 0..sy {
            for z in 0..sz {
                let on_boundary =
                    x == 0 || y == 0 || z == 0 || x == sx - 1 || y == sy - 1 || z == sz - 1;
                if !on_boundary {
                    continue;
                }
                let i = size.index(x, y, z);
                if !blocked[i] && !outside[i] {
                    outside[i] = true;
                    queue.push_back((x as i32, y as i32, z as i32));
                }
            }
        }
    }

    const NEIGHBORS: [(i32, i32, i32); 6] =
        [(1, 0, 0), (-1, 0, 0), (0, 1, 0), (0, -1, 0), (0, 0, 1), (0, 0, -1)];

    while let Some((x, y, z)) = queue.pop_front() {
        for (dx, dy, dz) in NEIGHBORS {
            let (nx, ny, nz) = (x + dx, y + dy, z + dz);
            if let Some(i) = size.checked_index(nx, ny, nz) {
                if !blocked[i] && !outside[i] {
                    outside[i] = true;
                    queue.push_back((nx, ny, nz));
                }
            }
        }
    }

    outside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flood_stops_at_closed_shell() {
        let size = GridSize::cubic(5);
        let mut blocked = vec![false; size.volume()];
        // Hollow 3x3x3 shell around the center cell
        for x in 1..4 {
            for y in 1..4 {
                for z in 1..4 {
                    if (x, y, z) != (2, 2, 2) {
                        blocked[size.index(x, y, z)] = true;
                    }
                }
            }
        }
        let outside = flood_from_boundary(size, &blocked);
        assert!(!outside[size.index(2, 2, 2)]);
        assert!(outside[size.index(0, 0, 0)]);
        assert!(!outside[size.index(1, 1, 1)]);
    }

    #[test]
    fn test_dilation_closes_gap() {
        let size = GridSize::cubic(5);
        let mut mask = vec![false; size.volume()];
        mask[size.index(2, 2, 2)] = true;
        let grown = dilate(size, &mask, 1);
        assert_eq!(grown.iter().filter(|&&b| b).count(), 27);
        assert!(grown[size.index(1, 3, 1)]);
        assert!(!grown[size.index(0, 2, 2)]);
    }

    #[test]
    fn test_no_triangles_means_all_outside() {
        let size = GridSize::cubic(4);
        let mask = solid_mask(
            size,
            1.0,
            &[],
            VoxelizeParams {
                thickness: 0.25,
                seal_voxels: 0,
            },
        );
        assert!(mask.iter().all(|&s| !s));
    }
}
