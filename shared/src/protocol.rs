//! Wire protocol shared by `server::transport` and `client::transport`.
//!
//! JSON objects with a `type` field, relayed verbatim by the server except
//! for `clientId` tagging on `input`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSettings {
    pub rounds_to_win: u32,
    pub kill_limit: u32,
    pub max_players: u32,
    pub map_name: Option<String>,
}

impl RoomSettings {
    pub fn clamped(mut self) -> Self {
        self.rounds_to_win = self.rounds_to_win.clamp(1, 10);
        self.kill_limit = self.kill_limit.clamp(1, 50);
        self.max_players = self.max_players.clamp(2, 8);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: String,
    pub name: String,
    pub ready: bool,
    pub is_host: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputFrame {
    pub move_x: f64,
    pub move_z: f64,
    pub sprint: bool,
    pub jump: bool,
    pub fire_down: bool,
    pub reload_pressed: bool,
    pub melee_pressed: bool,
    pub forward: [f64; 3],
    pub t: u64,
    /// Absent from the client's own frame; set by the server when relaying
    /// to the host so it knows which peer the frame belongs to.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySnapshot {
    pub id: String,
    pub pos: [f64; 3],
    pub yaw: f64,
    pub pitch: f64,
    pub health: i32,
    pub ammo: u32,
    pub mag_size: u32,
    pub reloading: bool,
    pub reload_end_at: u64,
    pub alive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroSelectMsg {
    pub peer_id: String,
    pub hero_id: String,
    pub confirmed: bool,
}

/// Client -> server requests, and the one bidirectional `heroSelect` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    CreateRoom { room_id: String, settings: RoomSettings },
    JoinRoom { room_id: String, name: String },
    LeaveRoom,
    SetReady { ready: bool },
    StartGame,
    Input(InputFrame),
    HeroSelect(HeroSelectMsg),
}

/// Acks reuse the request's type name with response fields, carried over
/// the same connection as a direct reply rather than a broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Ack {
    CreateRoom { ok: bool, role: String, player_number: u32 },
    JoinRoom {
        ok: bool,
        role: String,
        player_number: u32,
        host_id: String,
        settings: RoomSettings,
    },
    JoinRoomError { ok: bool, error: String },
    StartGame { ok: bool, error: Option<String> },
}

/// Server -> one or all peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    PlayerList(Vec<PlayerInfo>),
    ClientJoined { client_id: String },
    ClientLeft { client_id: String },
    RoomClosed,
    GameStarted { players: Vec<PlayerInfo>, settings: RoomSettings },
    Snapshot { t: u64, entities: Vec<EntitySnapshot> },
    Shot { o: [f64; 3], e: [f64; 3], c: u32 },
    StartRound,
    RoundResult { winner: String, score: u32 },
    MatchOver { final_score: std::collections::HashMap<String, u32> },
    StartHeroSelect,
    HeroesConfirmed,
    FfaKill { victim_id: String, killer_id: String },
    Melee { attacker_id: String },
    Settings(RoomSettings),
    HeroSelect(HeroSelectMsg),
    Input(InputFrame),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_room_round_trips_through_json() {
        let msg = ClientMessage::CreateRoom {
            room_id: "abc".to_string(),
            settings: RoomSettings { rounds_to_win: 3, kill_limit: 20, max_players: 4, map_name: None },
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"createRoom\""));
        let back: ClientMessage = serde_json::from_str(&json).unwrap();
        match back {
            ClientMessage::CreateRoom { room_id, .. } => assert_eq!(room_id, "abc"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn input_relayed_to_host_carries_client_id() {
        let frame = InputFrame {
            move_x: 1.0,
            move_z: 0.0,
            sprint: false,
            jump: false,
            fire_down: true,
            reload_pressed: false,
            melee_pressed: false,
            forward: [0.0, 0.0, -1.0],
            t: 42,
            client_id: Some("peer-2".to_string()),
        };
        let json = serde_json::to_string(&ClientMessage::Input(frame)).unwrap();
        assert!(json.contains("\"clientId\":\"peer-2\""));
    }

    #[test]
    fn settings_clamp_out_of_range_values() {
        let settings = RoomSettings { rounds_to_win: 99, kill_limit: 0, max_players: 1, map_name: None }.clamped();
        assert_eq!(settings.rounds_to_win, 10);
        assert_eq!(settings.kill_limit, 1);
        assert_eq!(settings.max_players, 2);
    }

    #[test]
    fn join_room_error_ack_serializes_with_error_field() {
        let ack = Ack::JoinRoomError { ok: false, error: "Room not found".to_string() };
        let json = serde_json::to_string(&ack).unwrap();
        assert!(json.contains("\"error\":\"Room not found\""));
    }
}
