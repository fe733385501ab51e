//! Headless smoke-test binary exercising the predictor + relay transport
//! against a running relay server: join a room, send a few ticks of input,
//! print whatever world events arrive. Not a renderer.

use clap::Parser;
use client::predictor::{Predictor, RemoteEntities};
use client::transport::{RelayClient, ServerEvent};
use log::info;
use shared::protocol::{Ack, InputFrame, RoomSettings, ServerMessage};
use shared::{HeroConfig, MoveInput, Vector3};

/// Command-line arguments for the local loop demo.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay server WebSocket URL.
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:8080/ws")]
    server: String,

    /// Room id to create.
    #[arg(short = 'r', long, default_value = "demo-room")]
    room: String,

    /// Player display name.
    #[arg(short = 'n', long, default_value = "Player")]
    name: String,

    /// Artificial latency in milliseconds for netcode testing.
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Number of local ticks to run before exiting.
    #[arg(short = 't', long, default_value = "120")]
    ticks: u32,
}

fn demo_hero() -> HeroConfig {
    HeroConfig {
        hero_id: "marksman".into(),
        walk_speed: 4.5,
        sprint_speed: 7.0,
        jump_velocity: 8.5,
        hitbox: vec![shared::Segment {
            name: "torso".into(),
            half_w: 0.3,
            half_h: 0.5,
            half_d: 0.2,
            center_offset_y: 0.05,
            damage_multiplier: 1.0,
        }],
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

fn local_arena() -> shared::Arena {
    let mut arena = shared::Arena::new("demo");
    arena.solids = vec![
        shared::Triangle { a: Vector3::new(-50.0, -1.0, -50.0), b: Vector3::new(50.0, -1.0, -50.0), c: Vector3::new(50.0, -1.0, 50.0) },
        shared::Triangle { a: Vector3::new(-50.0, -1.0, -50.0), b: Vector3::new(50.0, -1.0, 50.0), c: Vector3::new(-50.0, -1.0, 50.0) },
    ];
    arena
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    info!("Connecting to relay at {}", args.server);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }

    let (client, mut events) = RelayClient::connect(&args.server, args.fake_ping).await?;

    client
        .create_room(
            args.room.clone(),
            RoomSettings { rounds_to_win: 3, kill_limit: 20, max_players: 4, map_name: None },
        )
        .await?;

    let hero = demo_hero();
    let arena = local_arena();
    let mut predictor = Predictor::new("local", &hero, Vector3::new(0.0, -1.0, 0.0));
    let mut remotes = RemoteEntities::new();

    let mut tick: u32 = 0;
    let dt = 1.0 / 60.0;
    let mut interval = tokio::time::interval(std::time::Duration::from_secs_f64(dt));

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(ServerEvent::Ack(Ack::CreateRoom { ok, role, player_number })) => {
                        info!("createRoom ack: ok={ok} role={role} player_number={player_number}");
                    }
                    Some(ServerEvent::Message(ServerMessage::Snapshot { t, entities })) => {
                        remotes.apply_snapshot("local", &entities);
                        if let Some(self_snap) = entities.iter().find(|e| e.id == "local") {
                            predictor.reconcile(self_snap);
                        }
                        info!("snapshot t={t} entities={}", entities.len());
                    }
                    Some(ServerEvent::Message(ServerMessage::RoomClosed)) => {
                        info!("room closed by host, exiting");
                        break;
                    }
                    Some(other) => info!("event: {other:?}"),
                    None => break,
                }
            }
            _ = interval.tick() => {
                if tick >= args.ticks {
                    break;
                }
                let input = MoveInput::CameraRelative { move_z: 1.0, move_x: 0.0, sprint: false, jump: tick % 60 == 0, look_yaw: 0.0, look_pitch: 0.0 };
                predictor.apply_input(&input, &arena, dt);

                let frame = InputFrame {
                    move_x: 0.0,
                    move_z: 1.0,
                    sprint: false,
                    jump: tick % 60 == 0,
                    fire_down: false,
                    reload_pressed: false,
                    melee_pressed: false,
                    forward: [0.0, 0.0, -1.0],
                    t: tick as u64,
                    client_id: None,
                };
                client.send_input(frame).await?;
                tick += 1;
            }
        }
    }

    info!("local loop demo finished after {tick} ticks");
    Ok(())
}
