//! Occupancy oracles: closest-point and penetration queries
//!
//! The scanner's collider-based strategies only ever ask a target two
//! things, where its surface is and how deep a small probe sphere sinks
//! into it, plus (for the ray-to-center strategy) a ray cast. Anything that
//! can answer those, a physics engine wrapper or an analytic shape, can
//! be scanned. [`SphereCollider`] and [`BoxCollider`] are exact analytic
//! oracles.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::types::{Aabb, Transform};

/// Surface tolerance used by the default ray cast
const SURFACE_EPSILON: f32 = 1e-4;

/// Step cap for the default sphere-traced ray cast
const MAX_TRACE_STEPS: u32 = 256;

/// Small spherical probe placed at a query point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeSphere {
    /// Probe center
    pub center: Vec3,
    /// Probe radius
    pub radius: f32,
}

impl ProbeSphere {
    /// Create a probe
    pub fn new(center: Vec3, radius: f32) -> Self {
        ProbeSphere { center, radius }
    }
}

/// Minimal separation of an overlapping probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// Overlap depth, always positive
    pub depth: f32,
    /// Direction that pushes the probe out of the target
    pub normal: Vec3,
}

/// Closest-point / penetration queries against a scan target
///
/// All positions are world space.
pub trait OccupancyOracle {
    /// Closest point on the target to `point`; `point` itself when inside
    fn closest_point(&self, point: Vec3) -> Vec3;

    /// Overlap of `probe` with the target, `None` when they do not touch
    fn compute_penetration(&self, probe: &ProbeSphere) -> Option<Penetration>;

    /// World bounds of the target
    fn bounds(&self) -> Aabb;

    /// Distance along `dir` (unit) to the first surface hit within `max_distance`
    ///
    /// Rays starting inside the target report no hit. The default sphere
    /// traces using [`closest_point`](Self::closest_point), which is exact
    /// for convex targets.
    fn raycast(&self, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<f32> {
        if (self.closest_point(origin) - origin).length_squared() < SURFACE_EPSILON * SURFACE_EPSILON {
            return None;
        }
        let mut t = 0.0;
        for _ in 0..MAX_TRACE_STEPS {
            let p = origin + dir * t;
            let d = (self.closest_point(p) - p).length();
            if d < SURFACE_EPSILON {
                return Some(t);
            }
            t += d;
            if t > max_distance {
                return None;
            }
        }
        None
    }
}

/// Analytic sphere target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphereCollider {
    /// World center
    pub center: Vec3,
    /// Radius
    pub radius: f32,
}

impl SphereCollider {
    /// Create a sphere collider
    pub fn new(center: Vec3, radius: f32) -> Self {
        SphereCollider {
            center,
            radius: radius.max(0.0),
        }
    }
}

impl OccupancyOracle for SphereCollider {
    fn closest_point(&self, point: Vec3) -> Vec3 {
        let offset = point - self.center;
        if offset.length_squared() <= self.radius * self.radius {
            return point;
        }
        self.center + offset.normalize() * self.radius
    }

    fn compute_penetration(&self, probe: &ProbeSphere) -> Option<Penetration> {
        let offset = probe.center - self.center;
        let distance = offset.length();
        let depth = self.radius + probe.radius - distance;
        (depth > 0.0).then(|| Penetration {
            depth,
            normal: offset.try_normalize().unwrap_or(Vec3::Y),
        })
    }

    fn bounds(&self) -> Aabb {
        Aabb::from_center_extents(self.center, Vec3::splat(self.radius))
    }

    fn raycast(&self, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<f32> {
        let oc = origin - self.center;
        let c = oc.length_squared() - self.radius * self.radius;
        if c <= 0.0 {
            return None;
        }
        let b = oc.dot(dir);
        let disc = b * b - c;
        if b > 0.0 || disc < 0.0 {
            return None;
        }
        let t = -b - disc.sqrt();
        (t <= max_distance).then_some(t)
    }
}

/// Analytic oriented box target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxCollider {
    /// World center
    pub center: Vec3,
    /// Half size along each local axis
    pub half_extents: Vec3,
    /// World rotation
    pub rotation: Quat,
}

impl BoxCollider {
    /// Axis-aligned box
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        BoxCollider {
            center,
            half_extents: half_extents.abs(),
            rotation: Quat::IDENTITY,
        }
    }

    /// Box occupying the unit cube `[-0.5, 0.5]³` of `transform`'s local space
    pub fn from_transform(transform: &Transform) -> Self {
        BoxCollider {
            center: transform.position,
            half_extents: transform.scale.abs() * 0.5,
            rotation: transform.rotation,
        }
    }

    #[inline]
    fn to_local(&self, p: Vec3) -> Vec3 {
        self.rotation.inverse() * (p - self.center)
    }

    #[inline]
    fn to_world(&self, p: Vec3) -> Vec3 {
        self.rotation * p + self.center
    }
}

impl OccupancyOracle for BoxCollider {
    fn closest_point(&self, point: Vec3) -> Vec3 {
        let local = self.to_local(point);
        let clamped = local.clamp(-self.half_extents, self.half_extents);
        if clamped == local {
            return point;
        }
        self.to_world(clamped)
    }

    fn compute_penetration(&self, probe: &ProbeSphere) -> Option<Penetration> {
        let local = self.to_local(probe.center);
        let h = self.half_extents;
        let clamped = local.clamp(-h, h);

        if clamped != local {
            let offset = local - clamped;
            let distance = offset.length();
            let depth = probe.radius - distance;
            return (depth > 0.0).then(|| Penetration {
                depth,
                normal: self.rotation * (offset / distance.max(f32::EPSILON)),
            });
        }

        // Center inside: push out through the nearest face
        let face_gap = h - local.abs();
        let axis = if face_gap.x <= face_gap.y && face_gap.x <= face_gap.z {
            0
        } else if face_gap.y <= face_gap.z {
            1
        } else {
            2
        };
        let mut normal = Vec3::ZERO;
        normal[axis] = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
        Some(Penetration {
            depth: face_gap[axis] + probe.radius,
            normal: self.rotation * normal,
        })
    }

    fn bounds(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        let h = self.half_extents;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { -h.x } else { h.x },
                if i & 2 == 0 { -h.y } else { h.y },
                if i & 4 == 0 { -h.z } else { h.z },
            );
            aabb.expand_point(self.to_world(corner));
        }
        aabb
    }

    fn raycast(&self, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<f32> {
        let o = self.to_local(origin);
        let d = self.rotation.inverse() * dir;
        let local_box = Aabb::new(-self.half_extents, self.half_extents);
        if local_box.contains(o) {
            return None;
        }
        let (t_enter, _) = super::geometry::ray_aabb(o, d, &local_box)?;
        (t_enter <= max_distance).then_some(t_enter)
    }
}
