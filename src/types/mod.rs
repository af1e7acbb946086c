//! Core value types for voxel-blob
//!
//! Colors, rigid transforms, bounding boxes and grid extents shared by the
//! field, the mesher and the scanner.

mod containers;
mod grid;

pub use containers::{Aabb, Color, Transform};
pub use grid::GridSize;
