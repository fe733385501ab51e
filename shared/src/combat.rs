//! Combat resolver: hitscan with spread/pellets, projectile simulation,
//! melee, and reload gating.

use crate::entity::{Entity, EntityEvent, FireMode, Weapon};
use crate::math::{raycast_aabbs, raycast_triangles, Aabb, Ray, Triangle, Vector3};
use rand::Rng;

/// A single-shot tracer event, emitted per pellet so clients can play the
/// effect immediately rather than waiting for the next snapshot.
#[derive(Debug, Clone)]
pub struct ShotEvent {
    pub start: Vector3,
    pub end: Vector3,
    pub color: String,
    pub ttl_ms: u64,
}

#[derive(Debug, Clone)]
pub struct MeleeEvent {
    pub attacker_id: String,
}

/// Outcome of one `hitscan_fire` call: always a tracer per pellet plus
/// whatever damage/kill events the hit entities produced.
#[derive(Debug, Clone, Default)]
pub struct HitscanResult {
    pub tracers: Vec<ShotEvent>,
    pub entity_events: Vec<EntityEvent>,
}

const TRACER_TTL_MS: u64 = 150;

/// Sample a direction perturbed from `aim_dir` by up to `radius` (uniform on
/// a disk perpendicular to `aim_dir`). Bounded magnitude, independent per
/// call.
fn jitter_direction(aim_dir: Vector3, radius: f64, rng: &mut impl Rng) -> Vector3 {
    if radius <= 0.0 {
        return aim_dir;
    }
    let up_hint = if aim_dir.x.abs() < 0.99 { Vector3::new(1.0, 0.0, 0.0) } else { Vector3::UP };
    let right = aim_dir.cross(up_hint).normalize();
    let up = right.cross(aim_dir).normalize();

    let angle = rng.gen::<f64>() * std::f64::consts::TAU;
    let r = radius * rng.gen::<f64>().sqrt();
    aim_dir.add(right.scale(r * angle.cos())).add(up.scale(r * angle.sin())).normalize()
}

/// Ray-vs-segment test for one candidate: transforms the world-space ray
/// into the candidate's local (un-rotated) frame and runs the ray-vs-
/// ordered-AABB-set raycast (variant 1 of the math module) against its
/// hitbox segments in declared order.
fn first_segment_hit(candidate: &Entity, ray: &Ray, max_distance: f64) -> Option<(usize, f64)> {
    let local_origin = ray.origin.sub(candidate.position).rotate_y(-candidate.yaw);
    let local_dir = ray.dir.rotate_y(-candidate.yaw);
    let local_ray = Ray { origin: local_origin, dir: local_dir };
    let boxes: Vec<Aabb> = candidate.local_segment_aabbs();
    raycast_aabbs(&local_ray, &boxes, max_distance)
}

/// Hitscan fire: `weapon.pellets` shots, each independently jittered,
/// each testing world solids then candidate hitboxes in declared order.
/// Consumes exactly one unit of ammo regardless of pellet count.
pub fn hitscan_fire(
    shooter_id: &str,
    origin: Vector3,
    aim_dir: Vector3,
    weapon: &mut Weapon,
    sprinting: bool,
    solids: &[Triangle],
    candidates: &mut [&mut Entity],
    now_ms: u64,
    rng: &mut impl Rng,
) -> Option<HitscanResult> {
    if !weapon.can_fire(now_ms) {
        return None;
    }

    let spread = weapon.spread_rad + if sprinting { weapon.sprint_spread_rad } else { 0.0 };
    let mut result = HitscanResult::default();

    for _ in 0..weapon.pellets.max(1) {
        let dir = jitter_direction(aim_dir, spread, rng);
        let ray = Ray::new(origin, dir);

        let world_hit = raycast_triangles(&ray, solids, weapon.max_range);
        let world_hit_distance = world_hit.unwrap_or(weapon.max_range);

        let mut hit_end = ray.point_at(world_hit_distance);
        for candidate in candidates.iter_mut() {
            if !candidate.alive {
                continue;
            }
            if let Some((seg_idx, dist)) = first_segment_hit(candidate, &ray, world_hit_distance) {
                let segment = candidate.hitbox[seg_idx].clone();
                let amount = weapon.damage * segment.damage_multiplier;
                let events = candidate.take_damage(amount, shooter_id, &segment.name, now_ms);
                result.entity_events.extend(events);
                hit_end = ray.point_at(dist);
                break;
            }
        }

        result.tracers.push(ShotEvent {
            start: origin,
            end: hit_end,
            color: weapon.tracer_color.clone(),
            ttl_ms: TRACER_TTL_MS,
        });
    }

    weapon.consume_shot(now_ms);
    Some(result)
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub owner_id: String,
    pub pos: Vector3,
    pub vel: Vector3,
    pub gravity: f64,
    pub damage: f64,
    pub max_range: f64,
    pub traveled: f64,
    pub tracer_color: String,
}

pub enum ProjectileOutcome {
    Alive,
    HitEntity(Vec<EntityEvent>),
    HitSolid,
    Expired,
}

/// Spawn a projectile from a weapon configured with
/// `FireMode::Projectile { .. }`. Panics if called on a hitscan weapon —
/// callers dispatch on `weapon.fire_mode` before calling this, same as the
/// tagged-variant design note prescribes.
pub fn spawn_projectile(owner_id: &str, pos: Vector3, aim_dir: Vector3, weapon: &Weapon) -> Projectile {
    let (speed, gravity) = match weapon.fire_mode {
        FireMode::Projectile { speed, gravity } => (speed, gravity),
        FireMode::Hitscan => panic!("spawn_projectile called on a hitscan weapon"),
    };
    Projectile {
        owner_id: owner_id.to_string(),
        pos,
        vel: aim_dir.scale(speed),
        gravity,
        damage: weapon.damage,
        max_range: weapon.max_range,
        traveled: 0.0,
        tracer_color: weapon.tracer_color.clone(),
    }
}

/// Advance a projectile one tick, testing the swept segment against solids
/// then candidate hitboxes.
pub fn step_projectile(
    proj: &mut Projectile,
    dt: f64,
    solids: &[Triangle],
    candidates: &mut [&mut Entity],
    now_ms: u64,
) -> ProjectileOutcome {
    let prev = proj.pos;
    proj.pos = proj.pos.add(proj.vel.scale(dt));
    proj.vel.y += proj.gravity * dt;

    let delta = proj.pos.sub(prev);
    let dist = delta.length();
    proj.traveled += dist;

    if dist > crate::math::EPSILON {
        let ray = Ray::new(prev, delta);
        if raycast_triangles(&ray, solids, dist).is_some() {
            return ProjectileOutcome::HitSolid;
        }
        for candidate in candidates.iter_mut() {
            if !candidate.alive || candidate.id == proj.owner_id {
                continue;
            }
            if let Some((seg_idx, _)) = first_segment_hit(candidate, &ray, dist) {
                let segment = candidate.hitbox[seg_idx].clone();
                let amount = proj.damage * segment.damage_multiplier;
                let events = candidate.take_damage(amount, &proj.owner_id, &segment.name, now_ms);
                return ProjectileOutcome::HitEntity(events);
            }
        }
    }

    if proj.traveled >= proj.max_range {
        return ProjectileOutcome::Expired;
    }
    ProjectileOutcome::Alive
}

/// Melee: guarded by cooldown, a short-range capsule swept from the
/// entity's eye along the aim direction, approximated as a range + forward-
/// cone test against each candidate's center.
pub fn melee_attack(
    attacker_id: &str,
    origin: Vector3,
    aim_dir: Vector3,
    weapon: &mut Weapon,
    candidates: &mut [&mut Entity],
    now_ms: u64,
) -> Option<(MeleeEvent, Vec<EntityEvent>)> {
    if !weapon.can_melee(now_ms) {
        return None;
    }
    weapon.last_melee_at = now_ms;

    let mut events = Vec::new();
    for candidate in candidates.iter_mut() {
        if !candidate.alive {
            continue;
        }
        let to_target = candidate.position.sub(origin);
        let dist = to_target.length();
        if dist > weapon.melee_range || dist < crate::math::EPSILON {
            continue;
        }
        // Forward cone: only hit targets roughly in front of the swing.
        let cos_angle = to_target.normalize().dot(aim_dir.normalize());
        if cos_angle < 0.5 {
            continue;
        }
        let multiplier = candidate
            .hitbox
            .first()
            .map(|seg| seg.damage_multiplier)
            .unwrap_or(1.0);
        events.extend(candidate.take_damage(weapon.melee_damage * multiplier, attacker_id, "melee", now_ms));
        break;
    }

    Some((MeleeEvent { attacker_id: attacker_id.to_string() }, events))
}
