//! Per-entity kinematic step: horizontal movement, gravity, jump, downward
//! ground raycast, and the 3D AABB/cylinder push-out resolver.

use crate::arena::{Arena, Collider};
use crate::entity::{Entity, EYE_HEIGHT};
use crate::math::Vector3;

pub const GROUND_Y: f64 = -1.0;
pub const GRAVITY: f64 = -20.0;
pub const DEFAULT_JUMP_VELOCITY: f64 = 8.5;
pub const MAX_STEP_HEIGHT: f64 = 0.3;
/// Hysteresis added to `MAX_STEP_HEIGHT` before a grounded entity is
/// considered to have walked off an edge.
const DROP_HYSTERESIS: f64 = 0.15;
/// Height above the arena the ground probe casts its rays from.
const PROBE_HEIGHT: f64 = 1000.0;
/// Maximum `dt` honored in one step; larger values are clamped rather than
/// amplifying physics.
pub const MAX_DT: f64 = 0.05;

/// Movement input in either of the two shapes the physics step accepts.
#[derive(Debug, Clone, Copy)]
pub enum MoveInput {
    /// Camera-relative: direction is derived from `look_yaw`.
    CameraRelative {
        move_z: f64,
        move_x: f64,
        sprint: bool,
        jump: bool,
        look_yaw: f64,
        look_pitch: f64,
    },
    /// World-space, used by the AI single-player path.
    WorldSpace { world_move_dir: Vector3, sprint: bool, jump: bool },
}

impl MoveInput {
    fn direction(&self) -> Vector3 {
        match *self {
            MoveInput::CameraRelative { move_z, move_x, look_yaw, .. } => {
                // Forward is -Z before rotation (right-handed, looking down -Z at yaw 0).
                let forward = Vector3::new(0.0, 0.0, -1.0).rotate_y(look_yaw);
                let right = Vector3::new(1.0, 0.0, 0.0).rotate_y(look_yaw);
                forward.scale(move_z).add(right.scale(move_x)).xz().normalize()
            }
            MoveInput::WorldSpace { world_move_dir, .. } => world_move_dir.xz().normalize(),
        }
    }

    fn sprint(&self) -> bool {
        match *self {
            MoveInput::CameraRelative { sprint, .. } => sprint,
            MoveInput::WorldSpace { sprint, .. } => sprint,
        }
    }

    fn jump(&self) -> bool {
        match *self {
            MoveInput::CameraRelative { jump, .. } => jump,
            MoveInput::WorldSpace { jump, .. } => jump,
        }
    }

    /// Yaw to orient the entity/hitbox by. Camera-relative input carries an
    /// explicit look yaw; world-space input derives facing from the move
    /// direction when moving, otherwise leaves yaw unchanged (signaled by
    /// `None`).
    fn yaw(&self, current_yaw: f64) -> f64 {
        match *self {
            MoveInput::CameraRelative { look_yaw, .. } => look_yaw,
            MoveInput::WorldSpace { world_move_dir, .. } => {
                let d = world_move_dir.xz();
                if d.length_squared() > crate::math::EPSILON {
                    d.x.atan2(d.z).mul_add(-1.0, std::f64::consts::PI).rem_euclid(std::f64::consts::TAU)
                } else {
                    current_yaw
                }
            }
        }
    }

    fn pitch(&self) -> f64 {
        match *self {
            MoveInput::CameraRelative { look_pitch, .. } => look_pitch,
            MoveInput::WorldSpace { .. } => 0.0,
        }
    }
}

/// Cast the 5-ray ground probe (center + 4 foot-corner offsets at
/// `radius * 0.7`) and return the highest accepted hit Y, or `GROUND_Y` if
/// none satisfy the per-mode rule.
fn ground_probe(xz: (f64, f64), radius: f64, grounded: bool, feet_y: f64, arena: &Arena) -> f64 {
    let corner = radius * 0.7;
    let offsets = [(0.0, 0.0), (corner, corner), (corner, -corner), (-corner, corner), (-corner, -corner)];

    let mut best: Option<f64> = None;
    for (dx, dz) in offsets {
        let origin = Vector3::new(xz.0 + dx, PROBE_HEIGHT, xz.1 + dz);
        let ray = crate::math::Ray::new(origin, Vector3::new(0.0, -1.0, 0.0));
        if let Some(t) = crate::math::raycast_triangles(&ray, &arena.solids, PROBE_HEIGHT * 2.0) {
            let hit_y = origin.y - t;
            let accepted = if grounded {
                hit_y <= feet_y + MAX_STEP_HEIGHT
            } else {
                hit_y <= feet_y
            };
            if accepted {
                best = Some(best.map_or(hit_y, |b: f64| b.max(hit_y)));
            }
        }
    }
    best.unwrap_or(GROUND_Y)
}

/// Apply the grounded/drop check against a freshly computed ground probe.
fn apply_grounded_check(entity: &mut Entity, ground: f64) {
    if entity.grounded {
        if ground < entity.feet_y - (MAX_STEP_HEIGHT + DROP_HYSTERESIS) {
            entity.grounded = false;
            entity.vertical_velocity = 0.0;
        } else {
            entity.feet_y = ground;
        }
    }
}

/// One pass of the 3D AABB/cylinder push-out resolver over every collider.
/// Returns true if any collider moved the entity.
fn resolve_pass(entity: &mut Entity, arena: &Arena) -> bool {
    let mut moved = false;
    let standing_band = (entity.feet_y, entity.feet_y + EYE_HEIGHT);

    for collider in &arena.colliders {
        let y_skip_tol = if entity.grounded { MAX_STEP_HEIGHT } else { 0.1 };
        if entity.feet_y + y_skip_tol >= collider.top_y() {
            continue;
        }

        let (min_y, max_y) = match collider {
            Collider::Aabb(b) => (b.min.y, b.max.y),
            Collider::Cylinder { min_y, max_y, .. } => (*min_y, *max_y),
        };
        if max_y < standing_band.0 || min_y > standing_band.1 {
            continue;
        }

        match collider {
            Collider::Aabb(b) => {
                let expanded = b.expand_xz(entity.radius);
                let px = entity.position.x;
                let pz = entity.position.z;
                if px < expanded.min.x || px > expanded.max.x || pz < expanded.min.z || pz > expanded.max.z {
                    continue;
                }

                let overlap_neg_x = px - expanded.min.x;
                let overlap_pos_x = expanded.max.x - px;
                let overlap_neg_z = pz - expanded.min.z;
                let overlap_pos_z = expanded.max.z - pz;
                let pen_up = b.max.y - entity.feet_y; // feet-into-top
                let pen_down = (entity.feet_y + EYE_HEIGHT) - b.min.y; // head-into-bottom

                if pen_up <= MAX_STEP_HEIGHT && pen_up < pen_down {
                    entity.feet_y = b.max.y;
                    entity.vertical_velocity = 0.0;
                    entity.grounded = true;
                    moved = true;
                    continue;
                }

                let candidates = [
                    ("neg_x", overlap_neg_x),
                    ("pos_x", overlap_pos_x),
                    ("neg_z", overlap_neg_z),
                    ("pos_z", overlap_pos_z),
                    ("up", pen_up),
                    ("down", pen_down),
                ];
                let (axis, _) = candidates
                    .iter()
                    .copied()
                    .fold(("neg_x", f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best });

                match axis {
                    "neg_x" => entity.position.x -= overlap_neg_x,
                    "pos_x" => entity.position.x += overlap_pos_x,
                    "neg_z" => entity.position.z -= overlap_neg_z,
                    "pos_z" => entity.position.z += overlap_pos_z,
                    "up" => entity.feet_y += pen_up,
                    _ => entity.feet_y -= pen_down,
                }
                moved = true;
            }
            Collider::Cylinder { center_xz, radius, .. } => {
                let dx = entity.position.x - center_xz.0;
                let dz = entity.position.z - center_xz.1;
                let dist = (dx * dx + dz * dz).sqrt();
                let overlap = (radius + entity.radius) - dist;
                if overlap > crate::math::EPSILON {
                    let (nx, nz) = if dist > crate::math::EPSILON {
                        (dx / dist, dz / dist)
                    } else {
                        (1.0, 0.0)
                    };
                    entity.position.x += nx * overlap;
                    entity.position.z += nz * overlap;
                    moved = true;
                }
            }
        }
    }

    moved
}

/// The single physics operation: `step(entity, input, arena, dt)`.
pub fn step(entity: &mut Entity, input: &MoveInput, arena: &Arena, dt: f64) {
    let dt = dt.min(MAX_DT);

    // 1. Horizontal movement.
    let dir = input.direction();
    let speed = if input.sprint() { entity.sprint_speed } else { entity.walk_speed };
    entity.position.x += dir.x * speed * dt;
    entity.position.z += dir.z * speed * dt;
    entity.yaw = input.yaw(entity.yaw);
    entity.pitch = input.pitch();

    // 2. Ground probe at the new XZ.
    let ground = ground_probe((entity.position.x, entity.position.z), entity.radius, entity.grounded, entity.feet_y, arena);

    // 3. Jump.
    if input.jump() && entity.grounded {
        entity.vertical_velocity = entity.jump_velocity;
        entity.grounded = false;
    }

    // 4. Gravity/landing.
    if !entity.grounded {
        entity.vertical_velocity += GRAVITY * dt;
        entity.feet_y += entity.vertical_velocity * dt;
        if entity.feet_y <= ground {
            entity.feet_y = ground;
            entity.vertical_velocity = 0.0;
            entity.grounded = true;
        }
    }

    // 5. Grounded drop check.
    apply_grounded_check(entity, ground);

    // 6. 3D AABB/cylinder resolution, up to 3 passes, early-exit on a dry pass.
    for _ in 0..3 {
        if !resolve_pass(entity, arena) {
            break;
        }
    }

    // 7. Re-probe ground since push-out may have moved XZ.
    let ground2 = ground_probe((entity.position.x, entity.position.z), entity.radius, entity.grounded, entity.feet_y, arena);
    apply_grounded_check(entity, ground2);

    // 8. Recompute eye-height position.
    entity.position.y = entity.feet_y + EYE_HEIGHT;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{FireMode, HeroConfig, Segment, Weapon};
    use assert_approx_eq::assert_approx_eq;

    fn hero() -> HeroConfig {
        HeroConfig {
            hero_id: "marksman".into(),
            walk_speed: 4.5,
            sprint_speed: 7.0,
            jump_velocity: 8.5,
            hitbox: vec![Segment {
                name: "torso".into(),
                half_w: 0.3,
                half_h: 0.5,
                half_d: 0.2,
                center_offset_y: 1.0,
                damage_multiplier: 1.0,
            }],
            weapon: Weapon {
                cooldown_ms: 150,
                mag_size: 20,
                ammo: 20,
                reload_time_sec: 1.5,
                reloading: false,
                reload_end_at: 0,
                last_shot_at: 0,
                damage: 20.0,
                spread_rad: 0.0,
                sprint_spread_rad: 0.0,
                max_range: 200.0,
                pellets: 1,
                fire_mode: FireMode::Hitscan,
                tracer_color: "#fff".into(),
                melee_damage: 35.0,
                melee_range: 1.5,
                melee_cooldown_ms: 500,
                melee_swing_ms: 250,
                last_melee_at: 0,
            },
        }
    }

    fn empty_arena() -> Arena {
        Arena::new("empty")
    }

    fn still_input() -> MoveInput {
        MoveInput::CameraRelative { move_z: 0.0, move_x: 0.0, sprint: false, jump: false, look_yaw: 0.0, look_pitch: 0.0 }
    }

    #[test]
    fn invariant_eye_height_after_step() {
        let hero = hero();
        let mut e = Entity::new("p1", &hero, Vector3::new(0.0, 1.0, 0.0));
        let arena = empty_arena();
        step(&mut e, &still_input(), &arena, 0.1);
        assert!((e.position.y - (e.feet_y + EYE_HEIGHT)).abs() < 1e-6);
    }

    #[test]
    fn invariant_grounded_implies_zero_vertical_velocity() {
        let hero = hero();
        let mut e = Entity::new("p1", &hero, Vector3::new(0.0, -1.0, 0.0));
        e.grounded = true;
        let arena = empty_arena();
        for _ in 0..5 {
            step(&mut e, &still_input(), &arena, 0.1);
            if e.grounded {
                assert_eq!(e.vertical_velocity, 0.0);
            }
        }
    }

    /// Scenario 1 — Lone jump and land.
    #[test]
    fn scenario_lone_jump_and_land() {
        let hero = hero();
        let mut e = Entity::new("p1", &hero, Vector3::new(0.0, 1.0, 0.0));
        e.feet_y = -1.0;
        e.grounded = true;
        let arena = empty_arena();

        let jump_input = MoveInput::CameraRelative { move_z: 0.0, move_x: 0.0, sprint: false, jump: true, look_yaw: 0.0, look_pitch: 0.0 };
        step(&mut e, &jump_input, &arena, 0.1);
        assert!(!e.grounded);
        assert_approx_eq!(e.vertical_velocity, 6.5, 1e-9);
        assert_approx_eq!(e.feet_y, -0.15, 1e-9);

        let mut airtime = 0.1;
        while !e.grounded && airtime < 5.0 {
            step(&mut e, &still_input(), &arena, 0.1);
            airtime += 0.1;
        }
        assert!(e.grounded);
        assert_approx_eq!(e.feet_y, -1.0, 1e-6);
        assert_approx_eq!(airtime, 0.95, 1e-6);
    }

    /// Scenario 2 — walk onto a 0.25m step.
    #[test]
    fn scenario_walk_onto_step() {
        let hero = hero();
        let mut e = Entity::new("p1", &hero, Vector3::new(0.0, 1.0, 0.0));
        e.feet_y = -1.0;
        e.grounded = true;
        let mut arena = empty_arena();
        arena.colliders.push(Collider::Aabb(crate::math::Aabb::new(
            Vector3::new(1.0, -1.0, -1.0),
            Vector3::new(3.0, -0.75, 1.0),
        )));

        // forward = +X: look_yaw chosen so forward (-Z rotated) aligns with +X.
        let look_yaw = -std::f64::consts::FRAC_PI_2;
        let walk_input = MoveInput::CameraRelative { move_z: 1.0, move_x: 0.0, sprint: false, jump: false, look_yaw, look_pitch: 0.0 };

        for _ in 0..200 {
            step(&mut e, &walk_input, &arena, 0.05);
            if e.position.x >= 1.3 {
                break;
            }
        }

        assert!(e.position.x >= 1.3);
        assert_approx_eq!(e.feet_y, -0.75, 1e-6);
        assert!(e.grounded);
    }

    #[test]
    fn standing_exactly_on_box_top_is_fixed_point() {
        let hero = hero();
        let mut e = Entity::new("p1", &hero, Vector3::new(1.5, 1.0, 0.0));
        e.feet_y = -0.75;
        e.grounded = true;
        let mut arena = empty_arena();
        arena.colliders.push(Collider::Aabb(crate::math::Aabb::new(
            Vector3::new(1.0, -1.0, -1.0),
            Vector3::new(3.0, -0.75, 1.0),
        )));
        step(&mut e, &still_input(), &arena, 0.1);
        assert!(e.grounded);
        assert_approx_eq!(e.feet_y, -0.75, 1e-6);
        assert!((e.position.y - (e.feet_y + EYE_HEIGHT)).abs() < 1e-6);
    }

    #[test]
    fn resolve_collisions_is_fixed_point_within_passes() {
        let hero = hero();
        let mut e = Entity::new("p1", &hero, Vector3::new(1.0, 1.0, 0.0));
        e.feet_y = 0.0;
        e.grounded = false;
        let mut arena = empty_arena();
        arena.colliders.push(Collider::Aabb(crate::math::Aabb::new(
            Vector3::new(-1.0, -5.0, -5.0),
            Vector3::new(5.0, 5.0, 5.0),
        )));
        // Run the resolver to a fixed point, then confirm a fourth pass moves nothing.
        resolve_pass(&mut e, &arena);
        resolve_pass(&mut e, &arena);
        resolve_pass(&mut e, &arena);
        let moved_again = resolve_pass(&mut e, &arena);
        assert!(!moved_again);
    }

    #[test]
    fn jump_at_wall_zeroes_horizontal_into_wall_vertical_continues() {
        let hero = hero();
        let mut e = Entity::new("p1", &hero, Vector3::new(0.0, 1.0, 0.0));
        e.feet_y = -1.0;
        e.grounded = false;
        e.vertical_velocity = 5.0;
        let mut arena = empty_arena();
        arena.colliders.push(Collider::Aabb(crate::math::Aabb::new(
            Vector3::new(0.3, -5.0, -5.0),
            Vector3::new(5.0, 5.0, 5.0),
        )));
        let walk_into_wall = MoveInput::CameraRelative { move_z: 1.0, move_x: 0.0, sprint: false, jump: false, look_yaw: -std::f64::consts::FRAC_PI_2, look_pitch: 0.0 };
        step(&mut e, &walk_into_wall, &arena, 0.1);
        assert!(e.position.x < 0.3 - e.radius + 1e-6);
        assert!(e.vertical_velocity != 0.0 || e.grounded);
    }
}
