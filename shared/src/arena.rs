//! Arena: the owning aggregate for raycast solids, push-out colliders,
//! AI waypoints, and spawn points.
//!
//! Entities reference the arena by id/handle rather than holding a direct
//! reference, and colliders/meshes are owned here, not by entities.

use crate::math::{Aabb, Ray, Triangle, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A push-out collider. AABB and cylinder variants are a tagged sum type,
/// dispatched explicitly in the physics resolver rather than duck-typed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Collider {
    Aabb(Aabb),
    Cylinder { center_xz: (f64, f64), min_y: f64, max_y: f64, radius: f64 },
}

impl Collider {
    pub fn top_y(&self) -> f64 {
        match self {
            Collider::Aabb(b) => b.max.y,
            Collider::Cylinder { max_y, .. } => *max_y,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Waypoint {
    pub position: Vector3,
    /// Indices into the arena's waypoint vector of mutually visible nodes.
    pub edges: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Arena {
    pub name: String,
    pub solids: Vec<Triangle>,
    pub colliders: Vec<Collider>,
    pub waypoints: Vec<Waypoint>,
    /// Mode name -> ordered (position, team id) spawn points.
    pub spawns: HashMap<String, Vec<(Vector3, String)>>,
}

impl Arena {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            solids: Vec::new(),
            colliders: Vec::new(),
            waypoints: Vec::new(),
            spawns: HashMap::new(),
        }
    }

    /// True if nothing in `solids` blocks the segment `a -> b`.
    pub fn has_line_of_sight(&self, a: Vector3, b: Vector3) -> bool {
        let delta = b.sub(a);
        let dist = delta.length();
        if dist < crate::math::EPSILON {
            return true;
        }
        let ray = Ray::new(a, delta);
        crate::math::raycast_triangles(&ray, &self.solids, dist - crate::math::EPSILON).is_none()
    }

    /// Re-derive waypoint edges as the pairs with mutual line-of-sight
    /// through `solids`. Called once per arena load, not per tick.
    pub fn rebuild_waypoint_edges(&mut self) {
        let n = self.waypoints.len();
        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); n];
        for i in 0..n {
            for j in (i + 1)..n {
                if self.has_line_of_sight(self.waypoints[i].position, self.waypoints[j].position) {
                    edges[i].push(j);
                    edges[j].push(i);
                }
            }
        }
        for (wp, e) in self.waypoints.iter_mut().zip(edges.into_iter()) {
            wp.edges = e;
        }
    }

    pub fn spawn_for(&self, mode: &str, index: usize) -> Option<(Vector3, String)> {
        self.spawns
            .get(mode)
            .and_then(|list| list.get(index % list.len().max(1)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_ground() -> Vec<Triangle> {
        vec![
            Triangle {
                a: Vector3::new(-50.0, 0.0, -50.0),
                b: Vector3::new(50.0, 0.0, -50.0),
                c: Vector3::new(50.0, 0.0, 50.0),
            },
            Triangle {
                a: Vector3::new(-50.0, 0.0, -50.0),
                b: Vector3::new(50.0, 0.0, 50.0),
                c: Vector3::new(-50.0, 0.0, 50.0),
            },
        ]
    }

    #[test]
    fn line_of_sight_above_ground_is_clear() {
        let mut arena = Arena::new("test");
        arena.solids = flat_ground();
        assert!(arena.has_line_of_sight(
            Vector3::new(0.0, 2.0, 0.0),
            Vector3::new(5.0, 2.0, 0.0)
        ));
    }

    #[test]
    fn line_of_sight_blocked_by_wall() {
        let mut arena = Arena::new("test");
        arena.solids = vec![Triangle {
            a: Vector3::new(-1.0, -1.0, 2.0),
            b: Vector3::new(1.0, -1.0, 2.0),
            c: Vector3::new(1.0, 3.0, 2.0),
        }];
        assert!(!arena.has_line_of_sight(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 5.0)
        ));
    }

    #[test]
    fn waypoint_edges_rebuild_mutual() {
        let mut arena = Arena::new("test");
        arena.solids = flat_ground();
        arena.waypoints = vec![
            Waypoint { position: Vector3::new(0.0, 1.0, 0.0), edges: vec![] },
            Waypoint { position: Vector3::new(5.0, 1.0, 0.0), edges: vec![] },
        ];
        arena.rebuild_waypoint_edges();
        assert_eq!(arena.waypoints[0].edges, vec![1]);
        assert_eq!(arena.waypoints[1].edges, vec![0]);
    }

    #[test]
    fn spawn_for_missing_mode_is_none() {
        let arena = Arena::new("test");
        assert!(arena.spawn_for("deathmatch", 0).is_none());
    }
}
