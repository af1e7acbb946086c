//! Triangle and ray primitives for scanning
//!
//! Closest point on a triangle follows the barycentric Voronoi-region test
//! (Ericson, *Real-Time Collision Detection* §5.1.5); ray/triangle is
//! Möller–Trumbore.

use glam::Vec3;

use crate::types::Aabb;

/// Rays closer to parallel than this miss the triangle
const RAY_TRIANGLE_EPSILON: f32 = 1e-6;

/// Direction components below this are treated as parallel to the slab
const RAY_AXIS_EPSILON: f32 = 1e-6;

/// World-space triangle with its bounds
#[derive(Debug, Clone, Copy)]
pub struct TriangleRecord {
    /// First vertex
    pub a: Vec3,
    /// Second vertex
    pub b: Vec3,
    /// Third vertex
    pub c: Vec3,
    /// Axis-aligned bounds of the three vertices
    pub aabb: Aabb,
}

impl TriangleRecord {
    /// Create a triangle record
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let mut aabb = Aabb::empty();
        aabb.expand_point(a);
        aabb.expand_point(b);
        aabb.expand_point(c);
        TriangleRecord { a, b, c, aabb }
    }

    /// Squared distance from `p` to the triangle
    #[inline(always)]
    pub fn distance_squared(&self, p: Vec3) -> f32 {
        point_triangle_distance_squared(p, self.a, self.b, self.c)
    }

    /// Ray parameter of the hit, if any
    #[inline(always)]
    pub fn intersect_ray(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        ray_triangle(origin, dir, self.a, self.b, self.c)
    }
}

/// Closest point to `p` on triangle `abc`
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    // Vertex region A
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    // Vertex region B
    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    // Edge region AB
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    // Vertex region C
    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    // Edge region AC
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    // Edge region BC
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    // Face region
    let denom = va + vb + vc;
    if denom.abs() < f32::EPSILON {
        // Degenerate (collinear) triangle: every edge region above failed
        // only through rounding, so fall back to the nearest vertex
        return [a, b, c]
            .into_iter()
            .min_by(|x, y| (p - *x).length_squared().total_cmp(&(p - *y).length_squared()))
            .unwrap_or(a);
    }
    let inv = 1.0 / denom;
    let v = vb * inv;
    let w = vc * inv;
    a + ab * v + ac * w
}

/// Squared distance from `p` to triangle `abc`
#[inline(always)]
pub fn point_triangle_distance_squared(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> f32 {
    (p - closest_point_on_triangle(p, a, b, c)).length_squared()
}

/// Möller–Trumbore ray/triangle test
///
/// Returns the ray parameter `t > 1e-6` of the hit; parallel rays miss.
#[inline]
pub fn ray_triangle(origin: Vec3, dir: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let e1 = b - a;
    let e2 = c - a;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < RAY_TRIANGLE_EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(e1);
    let v = dir.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(q) * inv_det;
    (t > RAY_TRIANGLE_EPSILON).then_some(t)
}

/// Slab test of a ray against a box
///
/// Returns the parametric `(enter, exit)` span clipped to `t >= 0`. Axes
/// with a near-zero direction component are skipped when the origin lies
/// within that slab and miss otherwise.
pub fn ray_aabb(origin: Vec3, dir: Vec3, aabb: &Aabb) -> Option<(f32, f32)> {
    let mut t_min = 0.0f32;
    let mut t_max = f32::INFINITY;

    for axis in 0..3 {
        let o = origin[axis];
        let d = dir[axis];
        let (lo, hi) = (aabb.min[axis], aabb.max[axis]);

        if d.abs() < RAY_AXIS_EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t1 = (lo - o) * inv;
        let mut t2 = (hi - o) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }

    Some((t_min, t_max))
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    const B: Vec3 = Vec3::new(2.0, 0.0, 0.0);
    const C: Vec3 = Vec3::new(0.0, 2.0, 0.0);

    #[test]
    fn test_closest_point_regions() {
        // Face
        let p = Vec3::new(0.5, 0.5, 3.0);
        assert!((closest_point_on_triangle(p, A, B, C) - Vec3::new(0.5, 0.5, 0.0)).length() < 1e-6);
        // Vertex A
        assert_eq!(closest_point_on_triangle(Vec3::new(-1.0, -1.0, 0.0), A, B, C), A);
        // Vertex B
        assert_eq!(closest_point_on_triangle(Vec3::new(3.0, -1.0, 0.0), A, B, C), B);
        // Edge AB
        let q = closest_point_on_triangle(Vec3::new(1.0, -2.0, 1.0), A, B, C);
        assert!((q - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-6);
        // Edge BC
        let q = closest_point_on_triangle(Vec3::new(2.0, 2.0, 0.0), A, B, C);
        assert!((q - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_degenerate_triangle_distance_is_finite() {
        let d = point_triangle_distance_squared(Vec3::new(0.0, 1.0, 0.0), A, B, B * 0.5);
        assert!(d.is_finite());
        assert!((d - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_ray_triangle() {
        let t = ray_triangle(Vec3::new(0.5, 0.5, -2.0), Vec3::Z, A, B, C);
        assert!((t.unwrap() - 2.0).abs() < 1e-6);
        // Behind the origin
        assert!(ray_triangle(Vec3::new(0.5, 0.5, 2.0), Vec3::Z, A, B, C).is_none());
        // Parallel
        assert!(ray_triangle(Vec3::new(0.5, 0.5, 0.0), Vec3::X, A, B, C).is_none());
        // Outside the triangle
        assert!(ray_triangle(Vec3::new(1.5, 1.5, -2.0), Vec3::Z, A, B, C).is_none());
    }

    #[test]
    fn test_ray_aabb() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let (t0, t1) = ray_aabb(Vec3::new(-3.0, 0.0, 0.0), Vec3::X, &aabb).unwrap();
        assert!((t0 - 2.0).abs() < 1e-6 && (t1 - 4.0).abs() < 1e-6);
        // Origin inside: enter clipped to 0
        let (t0, t1) = ray_aabb(Vec3::ZERO, Vec3::X, &aabb).unwrap();
        assert_eq!(t0, 0.0);
        assert!((t1 - 1.0).abs() < 1e-6);
        // Parallel outside the slab
        assert!(ray_aabb(Vec3::new(-3.0, 2.0, 0.0), Vec3::X, &aabb).is_none());
        // Pointing away
        assert!(ray_aabb(Vec3::new(-3.0, 0.0, 0.0), Vec3::NEG_X, &aabb).is_none());
    }
}
