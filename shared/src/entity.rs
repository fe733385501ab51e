//! Entity model: player/AI shape, hero application, and damage/respawn flow.
//!
//! A 3D position split into eye-height `position.y` and ground-plane
//! `feet_y`, an ordered hitbox, and a weapon state machine.

use crate::math::Vector3;
use serde::{Deserialize, Serialize};

/// Eye height above `feet_y`; `position.y` must equal `feet_y + EYE_HEIGHT`
/// after every physics step (data-model invariant).
pub const EYE_HEIGHT: f64 = 2.0;

/// One oriented hitbox piece. World-space center is
/// `position + Rot_y(yaw) * (0, center_offset_y, 0)`, half-extents applied
/// in the entity's local (unrotated) frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    pub half_w: f64,
    pub half_h: f64,
    pub half_d: f64,
    pub center_offset_y: f64,
    pub damage_multiplier: f64,
}

/// Fire mode is a sum type rather than a duck-typed "has projectileSpeed"
/// field, per the dynamic-dispatch design note: hitscan and projectile
/// weapons share every other scalar, so the variant only carries what
/// differs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum FireMode {
    Hitscan,
    Projectile { speed: f64, gravity: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weapon {
    pub cooldown_ms: u64,
    pub mag_size: u32,
    pub ammo: u32,
    pub reload_time_sec: f64,
    pub reloading: bool,
    pub reload_end_at: u64,
    pub last_shot_at: u64,
    pub damage: f64,
    pub spread_rad: f64,
    pub sprint_spread_rad: f64,
    pub max_range: f64,
    pub pellets: u32,
    pub fire_mode: FireMode,
    pub tracer_color: String,
    pub melee_damage: f64,
    pub melee_range: f64,
    pub melee_cooldown_ms: u64,
    pub melee_swing_ms: u64,
    pub last_melee_at: u64,
}

impl Weapon {
    /// `mag_size == 0` marks an infinite-ammo weapon: it never reloads and
    /// never gates fire on ammo.
    pub fn is_infinite_ammo(&self) -> bool {
        self.mag_size == 0
    }

    pub fn can_fire(&self, now_ms: u64) -> bool {
        if self.reloading {
            return false;
        }
        if !self.is_infinite_ammo() && self.ammo == 0 {
            return false;
        }
        if now_ms.saturating_sub(self.last_melee_at) < self.melee_swing_ms {
            return false;
        }
        now_ms.saturating_sub(self.last_shot_at) >= self.cooldown_ms
    }

    pub fn can_melee(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_melee_at) >= self.melee_cooldown_ms
    }

    /// Begin a reload if not already reloading and not infinite ammo.
    pub fn start_reload(&mut self, now_ms: u64) {
        if self.reloading || self.is_infinite_ammo() {
            return;
        }
        self.reloading = true;
        self.reload_end_at = now_ms + (self.reload_time_sec * 1000.0) as u64;
    }

    /// Advance reload state; called once per tick. On expiry, refills ammo.
    pub fn update_reload(&mut self, now_ms: u64) {
        if self.reloading && now_ms >= self.reload_end_at {
            self.reloading = false;
            self.ammo = self.mag_size;
        }
    }

    /// Consume one shot's worth of ammo (called once per fire regardless of
    /// pellet count) and auto-start a reload if the magazine just emptied.
    pub fn consume_shot(&mut self, now_ms: u64) {
        self.last_shot_at = now_ms;
        if !self.is_infinite_ammo() {
            self.ammo = self.ammo.saturating_sub(1);
            if self.ammo == 0 {
                self.start_reload(now_ms);
            }
        }
    }
}

/// Hero configuration: applying one atomically replaces weapon, hitbox,
/// speeds, and jump velocity on an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeroConfig {
    pub hero_id: String,
    pub walk_speed: f64,
    pub sprint_speed: f64,
    pub jump_velocity: f64,
    pub hitbox: Vec<Segment>,
    pub weapon: Weapon,
}

/// Events an entity emits while taking damage or dying. Combat resolver
/// events (shot tracers) live alongside these in `crate::combat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EntityEvent {
    Damage {
        victim_id: String,
        source_id: String,
        amount: f64,
        segment: String,
    },
    Kill {
        victim_id: String,
        killer_id: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub position: Vector3,
    pub feet_y: f64,
    pub vertical_velocity: f64,
    pub grounded: bool,
    pub radius: f64,
    pub walk_speed: f64,
    pub sprint_speed: f64,
    pub jump_velocity: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub max_health: i32,
    pub health: i32,
    pub alive: bool,
    pub last_damaged_at: u64,
    pub hitbox: Vec<Segment>,
    pub weapon: Weapon,
    pub hero_id: String,
}

impl Entity {
    pub fn new(id: impl Into<String>, hero: &HeroConfig, spawn: Vector3) -> Self {
        let feet_y = spawn.y;
        Self {
            id: id.into(),
            position: Vector3::new(spawn.x, feet_y + EYE_HEIGHT, spawn.z),
            feet_y,
            vertical_velocity: 0.0,
            grounded: false,
            radius: 0.4,
            walk_speed: hero.walk_speed,
            sprint_speed: hero.sprint_speed,
            jump_velocity: hero.jump_velocity,
            yaw: 0.0,
            pitch: 0.0,
            max_health: 100,
            health: 100,
            alive: true,
            last_damaged_at: 0,
            hitbox: hero.hitbox.clone(),
            weapon: hero.weapon.clone(),
            hero_id: hero.hero_id.clone(),
        }
    }

    /// Atomically replace weapon, hitbox, speeds, and jump velocity.
    /// Idempotent: applying the same hero twice leaves the entity identical
    /// to one application, since it's a pure overwrite with no accumulation.
    pub fn apply_hero(&mut self, hero: &HeroConfig) {
        self.walk_speed = hero.walk_speed;
        self.sprint_speed = hero.sprint_speed;
        self.jump_velocity = hero.jump_velocity;
        self.hitbox = hero.hitbox.clone();
        self.weapon = hero.weapon.clone();
        self.hero_id = hero.hero_id.clone();
    }

    /// World-space AABBs of this entity's hitbox segments, in declared
    /// order, for the combat resolver's ray-vs-ordered-AABB-set test. The
    /// ray passed to `raycast_aabbs` must already be expressed in this
    /// entity's local (un-rotated) frame — see `crate::combat`.
    pub fn local_segment_aabbs(&self) -> Vec<crate::math::Aabb> {
        self.hitbox
            .iter()
            .map(|seg| {
                let center = Vector3::new(0.0, seg.center_offset_y, 0.0);
                let half = Vector3::new(seg.half_w, seg.half_h, seg.half_d);
                crate::math::Aabb::from_center_half_extents(center, half)
            })
            .collect()
    }

    pub fn take_damage(
        &mut self,
        amount: f64,
        source_id: &str,
        segment_name: &str,
        now_ms: u64,
    ) -> Vec<EntityEvent> {
        let mut events = Vec::new();
        if !self.alive {
            return events;
        }
        self.health = (self.health - amount.round() as i32).max(0).min(self.max_health);
        self.last_damaged_at = now_ms;
        events.push(EntityEvent::Damage {
            victim_id: self.id.clone(),
            source_id: source_id.to_string(),
            amount,
            segment: segment_name.to_string(),
        });
        if self.health <= 0 {
            self.alive = false;
            events.push(EntityEvent::Kill {
                victim_id: self.id.clone(),
                killer_id: source_id.to_string(),
            });
        }
        events
    }

    /// Respawn/reset on round start: full health, reload cleared, position
    /// at the assigned spawn, zeroed vertical velocity.
    pub fn respawn(&mut self, spawn: Vector3) {
        self.health = self.max_health;
        self.alive = true;
        self.feet_y = spawn.y;
        self.position = Vector3::new(spawn.x, spawn.y + EYE_HEIGHT, spawn.z);
        self.vertical_velocity = 0.0;
        self.grounded = false;
        self.weapon.reloading = false;
        self.weapon.ammo = self.weapon.mag_size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_hero() -> HeroConfig {
        HeroConfig {
            hero_id: "marksman".into(),
            walk_speed: 4.5,
            sprint_speed: 7.0,
            jump_velocity: 8.5,
            hitbox: vec![
                Segment {
                    name: "head".into(),
                    half_w: 0.15,
                    half_h: 0.15,
                    half_d: 0.15,
                    center_offset_y: 2.95,
                    damage_multiplier: 2.0,
                },
                Segment {
                    name: "torso".into(),
                    half_w: 0.3,
                    half_h: 0.5,
                    half_d: 0.2,
                    center_offset_y: 2.05,
                    damage_multiplier: 1.0,
                },
            ],
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
                sprint_spread_rad: 0.02,
                max_range: 200.0,
                pellets: 1,
                fire_mode: FireMode::Hitscan,
                tracer_color: "#ffcc00".into(),
                melee_damage: 35.0,
                melee_range: 1.5,
                melee_cooldown_ms: 500,
                melee_swing_ms: 250,
                last_melee_at: 0,
            },
        }
    }

    #[test]
    fn new_entity_satisfies_eye_height_invariant() {
        let hero = test_hero();
        let e = Entity::new("p1", &hero, Vector3::new(0.0, -1.0, 0.0));
        assert!((e.position.y - (e.feet_y + EYE_HEIGHT)).abs() < 1e-9);
    }

    #[test]
    fn apply_hero_is_idempotent() {
        let hero = test_hero();
        let mut e = Entity::new("p1", &hero, Vector3::new(0.0, -1.0, 0.0));
        e.apply_hero(&hero);
        let snapshot = format!("{:?}", e.weapon);
        e.apply_hero(&hero);
        assert_eq!(snapshot, format!("{:?}", e.weapon));
    }

    #[test]
    fn take_damage_clamps_and_emits_damage_event() {
        let hero = test_hero();
        let mut e = Entity::new("p1", &hero, Vector3::ZERO);
        let events = e.take_damage(30.0, "p2", "torso", 1000);
        assert_eq!(e.health, 70);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], EntityEvent::Damage { .. }));
    }

    #[test]
    fn take_damage_emits_kill_on_lethal_hit() {
        let hero = test_hero();
        let mut e = Entity::new("p1", &hero, Vector3::ZERO);
        let events = e.take_damage(150.0, "p2", "head", 1000);
        assert_eq!(e.health, 0);
        assert!(!e.alive);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], EntityEvent::Kill { .. }));
    }

    #[test]
    fn dead_entity_ignores_further_damage() {
        let hero = test_hero();
        let mut e = Entity::new("p1", &hero, Vector3::ZERO);
        e.take_damage(200.0, "p2", "head", 1000);
        let events = e.take_damage(10.0, "p2", "head", 1001);
        assert!(events.is_empty());
    }

    #[test]
    fn respawn_restores_health_and_position() {
        let hero = test_hero();
        let mut e = Entity::new("p1", &hero, Vector3::ZERO);
        e.take_damage(200.0, "p2", "head", 1000);
        e.weapon.reloading = true;
        e.respawn(Vector3::new(3.0, -1.0, 4.0));
        assert_eq!(e.health, e.max_health);
        assert!(e.alive);
        assert!(!e.weapon.reloading);
        assert!((e.feet_y - (-1.0)).abs() < 1e-9);
        assert_eq!(e.vertical_velocity, 0.0);
    }

    #[test]
    fn weapon_fire_gating_by_cooldown() {
        let hero = test_hero();
        let mut w = hero.weapon.clone();
        w.last_shot_at = 1000;
        assert!(!w.can_fire(1000 + w.cooldown_ms - 1));
        assert!(w.can_fire(1000 + w.cooldown_ms));
    }

    #[test]
    fn fire_is_blocked_during_melee_swing_window() {
        let hero = test_hero();
        let mut w = hero.weapon.clone();
        w.last_melee_at = 1000;
        assert!(!w.can_fire(1000 + w.melee_swing_ms - 1));
        assert!(w.can_fire(1000 + w.melee_swing_ms));
    }

    #[test]
    fn infinite_ammo_weapon_never_gates_on_ammo() {
        let hero = test_hero();
        let mut w = hero.weapon.clone();
        w.mag_size = 0;
        w.ammo = 0;
        assert!(w.can_fire(100_000));
        w.consume_shot(100_000);
        assert!(!w.reloading);
        assert_eq!(w.ammo, 0);
    }

    #[test]
    fn consume_shot_starts_reload_when_empty() {
        let hero = test_hero();
        let mut w = hero.weapon.clone();
        w.ammo = 1;
        w.consume_shot(5000);
        assert_eq!(w.ammo, 0);
        assert!(w.reloading);
        assert_eq!(w.reload_end_at, 5000 + (w.reload_time_sec * 1000.0) as u64);
    }

    #[test]
    fn reload_completes_and_refills_mid_tick() {
        let hero = test_hero();
        let mut w = hero.weapon.clone();
        w.ammo = 0;
        w.start_reload(0);
        w.update_reload(w.reload_end_at);
        assert!(!w.reloading);
        assert_eq!(w.ammo, w.mag_size);
        assert!(w.can_fire(w.reload_end_at));
    }
}
