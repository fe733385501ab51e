//! 3-vector, AABB, and raycast primitives shared by physics and combat.
//!
//! Everything here is a pure function over value types — no entity or arena
//! knowledge lives in this module.

use serde::{Deserialize, Serialize};

/// Tolerance used for "inside expanded box" tests so that after a push-out
/// the point is strictly outside the box on the next check.
pub const EPSILON: f64 = 1e-6;

/// A point or direction in 3-space, 64-bit floats per the data model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const UP: Vector3 = Vector3 { x: 0.0, y: 1.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn add(self, other: Vector3) -> Vector3 {
        Vector3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Vector3) -> Vector3 {
        Vector3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, s: f64) -> Vector3 {
        Vector3::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn dot(self, other: Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vector3) -> Vector3 {
        Vector3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Returns the zero vector if `self` has near-zero length rather than
    /// producing NaNs — callers that need a direction from possibly-still
    /// input (e.g. no movement keys held) rely on this.
    pub fn normalize(self) -> Vector3 {
        let len = self.length();
        if len < EPSILON {
            Vector3::ZERO
        } else {
            self.scale(1.0 / len)
        }
    }

    /// Horizontal (XZ) distance squared, ignoring Y — used for the client
    /// predictor's snap/lerp threshold which is defined over full 3D delta
    /// but most gameplay distance checks in this codebase are XZ-only.
    pub fn xz(self) -> Vector3 {
        Vector3::new(self.x, 0.0, self.z)
    }

    pub fn lerp(self, other: Vector3, t: f64) -> Vector3 {
        self.add(other.sub(self).scale(t))
    }

    /// Rotate around the Y axis by `yaw` radians (right-handed, Y-up basis:
    /// positive yaw rotates +X toward -Z). Used to orient hitbox segments and
    /// to derive camera-relative movement direction.
    pub fn rotate_y(self, yaw: f64) -> Vector3 {
        let (s, c) = yaw.sin_cos();
        Vector3::new(
            self.x * c + self.z * s,
            self.y,
            -self.x * s + self.z * c,
        )
    }
}

/// Axis-aligned bounding box, min/max corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vector3,
    pub max: Vector3,
}

impl Aabb {
    pub fn new(min: Vector3, max: Vector3) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_extents(center: Vector3, half: Vector3) -> Self {
        Self {
            min: center.sub(half),
            max: center.add(half),
        }
    }

    pub fn contains_point(&self, p: Vector3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Expand the box outward by `amount` on every axis in the XZ plane
    /// only — used for the physics resolver's radius-expansion step.
    pub fn expand_xz(&self, amount: f64) -> Aabb {
        Aabb::new(
            Vector3::new(self.min.x - amount, self.min.y, self.min.z - amount),
            Vector3::new(self.max.x + amount, self.max.y, self.max.z + amount),
        )
    }

    /// Intersect a ray against this single box, returning the entry
    /// distance if the ray hits within `[0, max_distance]`. Standard
    /// slab method.
    pub fn ray_intersect(&self, ray: &Ray, max_distance: f64) -> Option<f64> {
        let mut t_min = 0.0f64;
        let mut t_max = max_distance;

        for axis in 0..3 {
            let (origin, dir, min, max) = match axis {
                0 => (ray.origin.x, ray.dir.x, self.min.x, self.max.x),
                1 => (ray.origin.y, ray.dir.y, self.min.y, self.max.y),
                _ => (ray.origin.z, ray.dir.z, self.min.z, self.max.z),
            };

            if dir.abs() < EPSILON {
                if origin < min || origin > max {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / dir;
            let mut t1 = (min - origin) * inv;
            let mut t2 = (max - origin) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }
}

/// A ray: origin plus a (not necessarily normalized) direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vector3,
    pub dir: Vector3,
}

impl Ray {
    pub fn new(origin: Vector3, dir: Vector3) -> Self {
        Self { origin, dir: dir.normalize() }
    }

    pub fn point_at(&self, t: f64) -> Vector3 {
        self.origin.add(self.dir.scale(t))
    }
}

/// A single raycast triangle (three world-space corners, CCW or CW — the
/// Möller–Trumbore test below is winding-agnostic for single-sided hits).
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub a: Vector3,
    pub b: Vector3,
    pub c: Vector3,
}

impl Triangle {
    /// Möller–Trumbore ray/triangle intersection. Returns the hit distance
    /// if within `[0, max_distance]`.
    pub fn ray_intersect(&self, ray: &Ray, max_distance: f64) -> Option<f64> {
        let edge1 = self.b.sub(self.a);
        let edge2 = self.c.sub(self.a);
        let h = ray.dir.cross(edge2);
        let det = edge1.dot(h);
        if det.abs() < EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = ray.origin.sub(self.a);
        let u = s.dot(h) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(edge1);
        let v = ray.dir.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = edge2.dot(q) * inv_det;
        if t > EPSILON && t <= max_distance {
            Some(t)
        } else {
            None
        }
    }
}

/// Raycast variant 1: ray vs. an ordered AABB set. Returns the index and
/// distance of the first hit within `max_distance`; ties (equal distance)
/// are broken by earlier position in `boxes` winning, so callers that pass
/// hitbox segments in declared order get the declared-order tie-break the
/// combat resolver contract requires.
pub fn raycast_aabbs(ray: &Ray, boxes: &[Aabb], max_distance: f64) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, b) in boxes.iter().enumerate() {
        if let Some(t) = b.ray_intersect(ray, max_distance) {
            match best {
                Some((_, best_t)) if t >= best_t => {}
                _ => best = Some((i, t)),
            }
        }
    }
    best
}

/// Raycast variant 2: ray vs. mesh triangles, used only for ground
/// detection. Returns the nearest hit distance within `max_distance`.
pub fn raycast_triangles(ray: &Ray, triangles: &[Triangle], max_distance: f64) -> Option<f64> {
    let mut best: Option<f64> = None;
    for tri in triangles {
        if let Some(t) = tri.ray_intersect(ray, max_distance) {
            if best.map_or(true, |b| t < b) {
                best = Some(t);
            }
        }
    }
    best
}
