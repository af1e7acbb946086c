//! Isosurface meshing for voxel fields
//!
//! [`MarchingCubesMesher`] turns a [`VoxelField`](crate::field::VoxelField)
//! into an indexed, welded, colored triangle mesh. The output replaces any
//! previous mesh wholesale; renderers read positions, normals, colors and
//! indices straight out of [`Mesh`].

mod marching_cubes;
pub mod tables;

pub use marching_cubes::{EdgeColorMode, MarchingCubesConfig, MarchingCubesMesher, VertexKey};

use std::collections::HashMap;

use glam::Vec3;

use crate::types::{Aabb, Color};

/// Vertex with position, normal and color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in the field's local space
    pub position: Vec3,
    /// Unit surface normal
    pub normal: Vec3,
    /// Vertex color
    pub color: Color,
}

impl Vertex {
    /// Create a new vertex
    pub fn new(position: Vec3, normal: Vec3, color: Color) -> Self {
        Vertex {
            position,
            normal,
            color,
        }
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Mesh vertices
    pub vertices: Vec<Vertex>,
    /// Triangle indices, three per triangle
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Mesh {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// True when there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Drop all vertices and indices, keeping the allocations
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Vertex positions as a separate stream
    pub fn positions(&self) -> Vec<Vec3> {
        self.vertices.iter().map(|v| v.position).collect()
    }

    /// Vertex normals as a separate stream
    pub fn normals(&self) -> Vec<Vec3> {
        self.vertices.iter().map(|v| v.normal).collect()
    }

    /// Vertex colors as a separate stream
    pub fn colors(&self) -> Vec<Color> {
        self.vertices.iter().map(|v| v.color).collect()
    }

    /// Bounds of all vertices, `None` for an empty mesh
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter().map(|v| v.position))
    }

    /// Every index refers to an existing vertex and the list holds whole triangles
    pub fn indices_valid(&self) -> bool {
        let n = self.vertices.len() as u32;
        self.indices.len() % 3 == 0 && self.indices.iter().all(|&i| i < n)
    }

    /// Every undirected edge is shared by exactly two triangles
    ///
    /// Empty meshes are not considered closed.
    pub fn is_closed(&self) -> bool {
        if self.indices.is_empty() {
            return false;
        }
        let mut edges: HashMap<(u32, u32), u32> = HashMap::new();
        for tri in self.indices.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                *edges.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        edges.values().all(|&count| count == 2)
    }
}
