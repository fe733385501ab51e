//! Per-room authoritative simulation loop.
//!
//! A fixed-interval `tokio::select!` between inbound commands and a tick
//! interval drives one `shared::arena`/`shared::entity`/`shared::match_state`
//! simulation per room. Input application is last-writer-wins per peer:
//! whichever input frame arrived most recently for a peer is what the next
//! tick applies, rather than a sequence-numbered queue.

use rand::SeedableRng;
use shared::protocol::{EntitySnapshot, HeroSelectMsg, InputFrame, RoomSettings, ServerMessage};
use shared::{Arena, Entity, HeroConfig, Match, MatchEvent, MatchMode, MoveInput, Vector3};
use std::collections::HashMap;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::room::PeerId;
use crate::utils::get_timestamp;

pub const DEFAULT_TICK_HZ: u64 = 60;
pub const TICK_MS: u64 = 1000 / DEFAULT_TICK_HZ;
/// Snapshot broadcast cadence, decoupled from the tick rate: the simulation
/// steps at up to 60 Hz but snapshots go out no more than 20 Hz.
pub const SNAPSHOT_MS: u64 = 50;

/// Commands fed into a running host loop from the transport layer.
pub enum HostCommand {
    Input { peer: PeerId, frame: InputFrame },
    HeroSelect(HeroSelectMsg),
    PeerLeft(PeerId),
    Shutdown,
}

/// Handle the transport layer keeps to talk to a spawned host task.
#[derive(Clone)]
pub struct HostHandle {
    pub commands: UnboundedSender<HostCommand>,
}

fn default_heroes() -> HashMap<String, HeroConfig> {
    let mut map = HashMap::new();
    map.insert("marksman".to_string(), marksman_hero());
    map.insert("brawler".to_string(), brawler_hero());
    map
}

fn marksman_hero() -> HeroConfig {
    HeroConfig {
        hero_id: "marksman".into(),
        walk_speed: 4.5,
        sprint_speed: 7.0,
        jump_velocity: 8.5,
        hitbox: vec![
            shared::Segment { name: "head".into(), half_w: 0.15, half_h: 0.15, half_d: 0.15, center_offset_y: 0.95, damage_multiplier: 2.0 },
            shared::Segment { name: "torso".into(), half_w: 0.3, half_h: 0.5, half_d: 0.2, center_offset_y: 0.05, damage_multiplier: 1.0 },
        ],
        weapon: shared::Weapon {
            cooldown_ms: 150,
            mag_size: 20,
            ammo: 20,
            reload_time_sec: 1.5,
            reloading: false,
            reload_end_at: 0,
            last_shot_at: 0,
            damage: 20.0,
            spread_rad: 0.01,
            sprint_spread_rad: 0.04,
            max_range: 200.0,
            pellets: 1,
            fire_mode: shared::FireMode::Hitscan,
            tracer_color: "#ffcc00".into(),
            melee_damage: 35.0,
            melee_range: 1.5,
            melee_cooldown_ms: 500,
            melee_swing_ms: 250,
            last_melee_at: 0,
        },
    }
}

fn brawler_hero() -> HeroConfig {
    HeroConfig {
        hero_id: "brawler".into(),
        walk_speed: 5.0,
        sprint_speed: 8.0,
        jump_velocity: 9.0,
        hitbox: vec![
            shared::Segment { name: "head".into(), half_w: 0.16, half_h: 0.16, half_d: 0.16, center_offset_y: 1.0, damage_multiplier: 1.8 },
            shared::Segment { name: "torso".into(), half_w: 0.35, half_h: 0.55, half_d: 0.25, center_offset_y: 0.1, damage_multiplier: 1.0 },
        ],
        weapon: shared::Weapon {
            cooldown_ms: 80,
            mag_size: 0,
            ammo: 0,
            reload_time_sec: 0.0,
            reloading: false,
            reload_end_at: 0,
            last_shot_at: 0,
            damage: 8.0,
            spread_rad: 0.08,
            sprint_spread_rad: 0.15,
            max_range: 60.0,
            pellets: 6,
            fire_mode: shared::FireMode::Hitscan,
            tracer_color: "#ff4400".into(),
            melee_damage: 55.0,
            melee_range: 2.0,
            melee_cooldown_ms: 350,
            melee_swing_ms: 200,
            last_melee_at: 0,
        },
    }
}

fn default_arena() -> Arena {
    let mut arena = Arena::new("default");
    arena.solids = vec![
        shared::Triangle { a: Vector3::new(-50.0, -1.0, -50.0), b: Vector3::new(50.0, -1.0, -50.0), c: Vector3::new(50.0, -1.0, 50.0) },
        shared::Triangle { a: Vector3::new(-50.0, -1.0, -50.0), b: Vector3::new(50.0, -1.0, 50.0), c: Vector3::new(-50.0, -1.0, 50.0) },
    ];
    arena.spawns.insert(
        "default".to_string(),
        vec![
            (Vector3::new(-4.0, -1.0, 0.0), "a".to_string()),
            (Vector3::new(4.0, -1.0, 0.0), "b".to_string()),
            (Vector3::new(0.0, -1.0, -4.0), "c".to_string()),
            (Vector3::new(0.0, -1.0, 4.0), "d".to_string()),
        ],
    );
    arena
}

/// Runs the fixed-cadence simulation for one room until the host peer
/// disconnects or `Shutdown` is received. `broadcast` sends a message to
/// every peer still tracked by the caller's transport layer; `members`
/// is the room's initial peer/name list at game-start time.
pub async fn run(
    mut commands: UnboundedReceiver<HostCommand>,
    members: Vec<(PeerId, String)>,
    settings: RoomSettings,
    broadcast: impl Fn(&ServerMessage) + Send + Sync + 'static,
) {
    let heroes = default_heroes();
    let arena = default_arena();
    let mode = if settings.rounds_to_win > 1 { MatchMode::Elimination } else { MatchMode::FreeForAll };
    let mut game_match = Match::new(mode, settings.rounds_to_win, settings.kill_limit, get_timestamp());

    let mut entities: HashMap<PeerId, Entity> = HashMap::new();
    let mut peer_order: Vec<PeerId> = Vec::new();
    let mut hero_choice: HashMap<PeerId, String> = HashMap::new();
    let mut confirmed: HashMap<PeerId, bool> = HashMap::new();
    for (idx, (peer, _name)) in members.iter().enumerate() {
        let hero_id = "marksman".to_string();
        let hero = heroes.get(&hero_id).expect("builtin hero always present");
        let spawn = arena.spawn_for("default", idx).map(|(pos, _)| pos).unwrap_or(Vector3::new(0.0, -1.0, 0.0));
        entities.insert(peer.clone(), Entity::new(peer.clone(), hero, spawn));
        hero_choice.insert(peer.clone(), hero_id);
        confirmed.insert(peer.clone(), false);
        peer_order.push(peer.clone());
    }

    let mut latest_input: HashMap<PeerId, InputFrame> = HashMap::new();
    let mut projectiles: Vec<shared::combat::Projectile> = Vec::new();
    let mut rng = rand::rngs::StdRng::seed_from_u64(get_timestamp());

    let mut interval = tokio::time::interval(std::time::Duration::from_millis(TICK_MS));
    let mut last_tick_at = get_timestamp();
    let mut last_snapshot_at = 0u64;

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                match cmd {
                    Some(HostCommand::Input { peer, frame }) => { latest_input.insert(peer, frame); }
                    Some(HostCommand::HeroSelect(sel)) => {
                        hero_choice.insert(sel.peer_id.clone(), sel.hero_id.clone());
                        confirmed.insert(sel.peer_id.clone(), sel.confirmed);
                        broadcast(&ServerMessage::HeroSelect(sel));
                    }
                    Some(HostCommand::PeerLeft(peer)) => {
                        entities.remove(&peer);
                        peer_order.retain(|p| p != &peer);
                        latest_input.remove(&peer);
                    }
                    Some(HostCommand::Shutdown) | None => break,
                }
            }
            _ = interval.tick() => {
                let now_ms = get_timestamp();
                let dt = ((now_ms.saturating_sub(last_tick_at)) as f64 / 1000.0).min(shared::physics::MAX_DT);
                last_tick_at = now_ms;

                if peer_order.is_empty() {
                    break;
                }

                step_tick(&mut entities, &peer_order, &latest_input, &arena, dt, now_ms, &mut rng, &mut game_match, &mut projectiles, &broadcast);

                let all_confirmed = peer_order.iter().all(|p| *confirmed.get(p).unwrap_or(&false));
                if all_confirmed {
                    for peer in &peer_order {
                        if let (Some(entity), Some(hero_id)) = (entities.get_mut(peer), hero_choice.get(peer)) {
                            if let Some(hero) = heroes.get(hero_id) {
                                entity.apply_hero(hero);
                            }
                        }
                    }
                }

                let round_winner = round_winner(&game_match, &entities, &peer_order);
                let events = game_match.tick(now_ms, all_confirmed, round_winner);
                for event in events {
                    dispatch_match_event(event, &mut entities, &arena, &peer_order, &broadcast);
                }

                if now_ms.saturating_sub(last_snapshot_at) >= SNAPSHOT_MS {
                    last_snapshot_at = now_ms;
                    let snapshot = ServerMessage::Snapshot {
                        t: now_ms,
                        entities: peer_order.iter().filter_map(|p| entities.get(p)).map(to_snapshot).collect(),
                    };
                    broadcast(&snapshot);
                }
            }
        }
    }
}

fn round_winner(game_match: &Match, entities: &HashMap<PeerId, Entity>, order: &[PeerId]) -> Option<(String, u32)> {
    if game_match.phase != shared::match_state::Phase::Active {
        return None;
    }
    match game_match.mode {
        shared::MatchMode::Elimination => {
            let alive: Vec<&PeerId> = order.iter().filter(|p| entities.get(*p).map(|e| e.alive).unwrap_or(false)).collect();
            if alive.len() == 1 && order.len() > 1 {
                Some((alive[0].clone(), 1))
            } else {
                None
            }
        }
        shared::MatchMode::FreeForAll => game_match
            .per_entity_score
            .iter()
            .find(|(_, score)| score.kills >= game_match.kill_limit)
            .map(|(id, score)| (id.clone(), score.kills)),
    }
}

fn to_snapshot(e: &Entity) -> EntitySnapshot {
    EntitySnapshot {
        id: e.id.clone(),
        pos: [e.position.x, e.position.y, e.position.z],
        yaw: e.yaw,
        pitch: e.pitch,
        health: e.health,
        ammo: e.weapon.ammo,
        mag_size: e.weapon.mag_size,
        reloading: e.weapon.reloading,
        reload_end_at: e.weapon.reload_end_at,
        alive: e.alive,
    }
}

fn dispatch_match_event(
    event: MatchEvent,
    entities: &mut HashMap<PeerId, Entity>,
    arena: &Arena,
    order: &[PeerId],
    broadcast: &impl Fn(&ServerMessage),
) {
    match event {
        MatchEvent::StartHeroSelect => broadcast(&ServerMessage::StartHeroSelect),
        MatchEvent::HeroesConfirmed => broadcast(&ServerMessage::HeroesConfirmed),
        MatchEvent::StartRound => {
            for (idx, peer) in order.iter().enumerate() {
                if let Some(entity) = entities.get_mut(peer) {
                    let spawn = arena.spawn_for("default", idx).map(|(p, _)| p).unwrap_or(Vector3::new(0.0, -1.0, 0.0));
                    entity.respawn(spawn);
                }
            }
            broadcast(&ServerMessage::StartRound);
        }
        MatchEvent::RoundResult { winner, score } => broadcast(&ServerMessage::RoundResult { winner, score }),
        MatchEvent::MatchOver { final_score } => broadcast(&ServerMessage::MatchOver { final_score }),
    }
}

#[allow(clippy::too_many_arguments)]
fn step_tick(
    entities: &mut HashMap<PeerId, Entity>,
    order: &[PeerId],
    latest_input: &HashMap<PeerId, InputFrame>,
    arena: &Arena,
    dt: f64,
    now_ms: u64,
    rng: &mut rand::rngs::StdRng,
    game_match: &mut Match,
    projectiles: &mut Vec<shared::combat::Projectile>,
    broadcast: &impl Fn(&ServerMessage),
) {
    let input_enabled = game_match.input_enabled();

    for peer in order {
        let Some(frame) = latest_input.get(peer) else { continue };
        let Some(entity) = entities.get_mut(peer) else { continue };
        if !entity.alive {
            continue;
        }
        entity.weapon.update_reload(now_ms);

        let input = if input_enabled {
            MoveInput::CameraRelative {
                move_z: frame.move_z,
                move_x: frame.move_x,
                sprint: frame.sprint,
                jump: frame.jump,
                look_yaw: yaw_from_forward(frame.forward),
                look_pitch: pitch_from_forward(frame.forward),
            }
        } else {
            MoveInput::CameraRelative { move_z: 0.0, move_x: 0.0, sprint: false, jump: false, look_yaw: yaw_from_forward(frame.forward), look_pitch: pitch_from_forward(frame.forward) }
        };
        shared::physics::step(entity, &input, arena, dt);

        if input_enabled && frame.reload_pressed {
            entity.weapon.start_reload(now_ms);
        }
    }

    if !game_match.fire_allowed(now_ms) {
        return;
    }

    for peer in order {
        let Some(frame) = latest_input.get(peer) else { continue };
        let fire_down = frame.fire_down;
        let melee_pressed = frame.melee_pressed;
        if !fire_down && !melee_pressed {
            continue;
        }
        let Some(shooter) = entities.get(peer) else { continue };
        if !shooter.alive {
            continue;
        }
        let origin = shooter.position;
        let aim_dir = Vector3::new(frame.forward[0], frame.forward[1], frame.forward[2]).normalize();
        let sprinting = frame.sprint;

        let mut shooter_owned = entities.remove(peer).expect("shooter entity present");
        let mut candidates: Vec<&mut Entity> = entities.values_mut().collect();

        if fire_down {
            match shooter_owned.weapon.fire_mode {
                shared::FireMode::Hitscan => {
                    if let Some(result) = shared::combat::hitscan_fire(peer, origin, aim_dir, &mut shooter_owned.weapon, sprinting, &arena.solids, &mut candidates, now_ms, rng) {
                        for tracer in &result.tracers {
                            broadcast(&ServerMessage::Shot { o: [tracer.start.x, tracer.start.y, tracer.start.z], e: [tracer.end.x, tracer.end.y, tracer.end.z], c: 0 });
                        }
                        emit_entity_events(result.entity_events, game_match, broadcast);
                    }
                }
                shared::FireMode::Projectile { .. } => {
                    if shooter_owned.weapon.can_fire(now_ms) {
                        let projectile = shared::combat::spawn_projectile(peer, origin, aim_dir, &shooter_owned.weapon);
                        shooter_owned.weapon.consume_shot(now_ms);
                        projectiles.push(projectile);
                    }
                }
            }
        } else if melee_pressed {
            if let Some((_melee, events)) = shared::combat::melee_attack(peer, origin, aim_dir, &mut shooter_owned.weapon, &mut candidates, now_ms) {
                broadcast(&ServerMessage::Melee { attacker_id: peer.clone() });
                emit_entity_events(events, game_match, broadcast);
            }
        }
        drop(candidates);
        entities.insert(peer.clone(), shooter_owned);
    }

    projectiles.retain_mut(|proj| {
        let prev = proj.pos;
        let mut candidates: Vec<&mut Entity> = entities.values_mut().collect();
        match shared::combat::step_projectile(proj, dt, &arena.solids, &mut candidates, now_ms) {
            shared::combat::ProjectileOutcome::Alive => {
                broadcast(&ServerMessage::Shot { o: [prev.x, prev.y, prev.z], e: [proj.pos.x, proj.pos.y, proj.pos.z], c: 0 });
                true
            }
            shared::combat::ProjectileOutcome::HitEntity(events) => {
                broadcast(&ServerMessage::Shot { o: [prev.x, prev.y, prev.z], e: [proj.pos.x, proj.pos.y, proj.pos.z], c: 0 });
                emit_entity_events(events, game_match, broadcast);
                false
            }
            shared::combat::ProjectileOutcome::HitSolid | shared::combat::ProjectileOutcome::Expired => false,
        }
    });
}

fn emit_entity_events(events: Vec<shared::EntityEvent>, game_match: &mut Match, broadcast: &impl Fn(&ServerMessage)) {
    for event in events {
        if let shared::EntityEvent::Kill { victim_id, killer_id } = event {
            game_match.record_kill(&killer_id, &victim_id);
            broadcast(&ServerMessage::FfaKill { victim_id, killer_id });
        }
    }
}

fn yaw_from_forward(forward: [f64; 3]) -> f64 {
    forward[0].atan2(forward[2]).mul_add(-1.0, std::f64::consts::PI).rem_euclid(std::f64::consts::TAU)
}

fn pitch_from_forward(forward: [f64; 3]) -> f64 {
    let horiz = (forward[0] * forward[0] + forward[2] * forward[2]).sqrt();
    forward[1].atan2(horiz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_arena_has_four_default_spawns() {
        let arena = default_arena();
        assert_eq!(arena.spawns.get("default").unwrap().len(), 4);
    }

    #[test]
    fn default_heroes_contains_marksman_and_brawler() {
        let heroes = default_heroes();
        assert!(heroes.contains_key("marksman"));
        assert!(heroes.contains_key("brawler"));
    }

    #[test]
    fn round_winner_none_outside_active_phase() {
        let game_match = Match::new(MatchMode::Elimination, 3, 50, 0);
        let entities = HashMap::new();
        let order = vec!["p1".to_string()];
        assert!(round_winner(&game_match, &entities, &order).is_none());
    }
}
