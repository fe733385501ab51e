//! Room manager: rooms, membership, ready state, host authority.
//!
//! `RoomManager` owns every active room, keyed by sanitized room id; each
//! `Room` tracks its own peer set, ready flags, and host peer independently
//! of every other room.

use crate::error::ServerError;
use crate::utils::sanitize_name;
use shared::protocol::{PlayerInfo, RoomSettings};
use std::collections::HashMap;

pub type PeerId = String;

#[derive(Debug, Clone)]
pub struct Peer {
    pub id: PeerId,
    pub name: String,
    pub ready: bool,
}

/// A bounded peer group with one designated host peer.
#[derive(Debug)]
pub struct Room {
    pub id: String,
    pub host_peer: PeerId,
    pub peers: Vec<PeerId>,
    pub members: HashMap<PeerId, Peer>,
    pub settings: RoomSettings,
    pub started: bool,
}

impl Room {
    pub fn new(id: String, host_peer: PeerId, host_name: String, settings: RoomSettings) -> Self {
        let mut members = HashMap::new();
        members.insert(
            host_peer.clone(),
            Peer { id: host_peer.clone(), name: host_name, ready: true },
        );
        Self {
            id,
            host_peer: host_peer.clone(),
            peers: vec![host_peer],
            members,
            settings: settings.clamped(),
            started: false,
        }
    }

    pub fn is_host(&self, peer: &str) -> bool {
        self.host_peer == peer
    }

    pub fn join(&mut self, peer: PeerId, name: String) -> Result<u32, ServerError> {
        if self.peers.len() as u32 >= self.settings.max_players {
            return Err(ServerError::Capacity(format!("room {} is full", self.id)));
        }
        self.members.insert(peer.clone(), Peer { id: peer.clone(), name, ready: false });
        self.peers.push(peer);
        Ok(self.peers.len() as u32)
    }

    /// Removes a peer. Returns `true` if the departing peer was the host —
    /// the caller must then tear down the whole room.
    pub fn remove(&mut self, peer: &str) -> bool {
        self.peers.retain(|p| p != peer);
        self.members.remove(peer);
        peer == self.host_peer
    }

    pub fn set_ready(&mut self, peer: &str, ready: bool) {
        if let Some(member) = self.members.get_mut(peer) {
            member.ready = ready;
        }
    }

    pub fn all_non_host_ready(&self) -> bool {
        self.members
            .values()
            .filter(|m| m.id != self.host_peer)
            .all(|m| m.ready)
    }

    pub fn try_start(&mut self) -> Result<(), ServerError> {
        if !self.all_non_host_ready() {
            return Err(ServerError::ReadyGate(format!("room {} has unready peers", self.id)));
        }
        self.started = true;
        Ok(())
    }

    pub fn player_list(&self) -> Vec<PlayerInfo> {
        self.peers
            .iter()
            .filter_map(|id| self.members.get(id))
            .map(|m| PlayerInfo { id: m.id.clone(), name: m.name.clone(), ready: m.ready, is_host: m.id == self.host_peer })
            .collect()
    }
}

/// Owns every active room, keyed by sanitized room id.
#[derive(Debug, Default)]
pub struct RoomManager {
    rooms: HashMap<String, Room>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self { rooms: HashMap::new() }
    }

    pub fn create_room(&mut self, room_id: String, host_peer: PeerId, host_name: String, settings: RoomSettings) -> Result<(), ServerError> {
        if !sanitize_name(&room_id) {
            return Err(ServerError::InvalidName(room_id));
        }
        if self.rooms.contains_key(&room_id) {
            return Err(ServerError::Conflict(room_id));
        }
        self.rooms.insert(room_id.clone(), Room::new(room_id, host_peer, host_name, settings));
        Ok(())
    }

    pub fn get(&self, room_id: &str) -> Result<&Room, ServerError> {
        self.rooms.get(room_id).ok_or_else(|| ServerError::NotFound(room_id.to_string()))
    }

    pub fn get_mut(&mut self, room_id: &str) -> Result<&mut Room, ServerError> {
        self.rooms.get_mut(room_id).ok_or_else(|| ServerError::NotFound(room_id.to_string()))
    }

    pub fn join_room(&mut self, room_id: &str, peer: PeerId, name: String) -> Result<(u32, PeerId, RoomSettings), ServerError> {
        let room = self.get_mut(room_id)?;
        let player_number = room.join(peer, name)?;
        Ok((player_number, room.host_peer.clone(), room.settings.clone()))
    }

    /// Removes `peer` from `room_id`. Returns `true` (and destroys the room)
    /// if the peer was the host.
    pub fn leave_room(&mut self, room_id: &str, peer: &str) -> Result<bool, ServerError> {
        let was_host = {
            let room = self.get_mut(room_id)?;
            room.remove(peer)
        };
        if was_host {
            self.rooms.remove(room_id);
        }
        Ok(was_host)
    }

    /// Finds the room (if any) a given peer currently belongs to.
    pub fn find_room_for_peer(&self, peer: &str) -> Option<&str> {
        self.rooms
            .values()
            .find(|r| r.peers.iter().any(|p| p == peer))
            .map(|r| r.id.as_str())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RoomSettings {
        RoomSettings { rounds_to_win: 3, kill_limit: 20, max_players: 3, map_name: None }
    }

    #[test]
    fn create_room_assigns_first_joiner_as_host() {
        let mut mgr = RoomManager::new();
        mgr.create_room("r1".into(), "host".into(), "Alice".into(), settings()).unwrap();
        let room = mgr.get("r1").unwrap();
        assert!(room.is_host("host"));
        assert_eq!(room.peers, vec!["host".to_string()]);
    }

    #[test]
    fn duplicate_room_id_is_conflict() {
        let mut mgr = RoomManager::new();
        mgr.create_room("r1".into(), "host".into(), "Alice".into(), settings()).unwrap();
        let err = mgr.create_room("r1".into(), "other".into(), "Bob".into(), settings()).unwrap_err();
        assert!(matches!(err, ServerError::Conflict(_)));
    }

    #[test]
    fn invalid_room_id_is_rejected() {
        let mut mgr = RoomManager::new();
        let err = mgr.create_room("bad room!".into(), "host".into(), "Alice".into(), settings()).unwrap_err();
        assert!(matches!(err, ServerError::InvalidName(_)));
    }

    #[test]
    fn join_room_respects_capacity() {
        let mut mgr = RoomManager::new();
        let mut small = settings();
        small.max_players = 2;
        mgr.create_room("r1".into(), "host".into(), "Alice".into(), small).unwrap();
        mgr.join_room("r1", "c1".into(), "Bob".into()).unwrap();
        let err = mgr.join_room("r1", "c2".into(), "Carl".into()).unwrap_err();
        assert!(matches!(err, ServerError::Capacity(_)));
    }

    #[test]
    fn scenario_host_disconnect_destroys_room() {
        let mut mgr = RoomManager::new();
        mgr.create_room("r".into(), "host".into(), "Alice".into(), settings()).unwrap();
        mgr.join_room("r", "c1".into(), "Bob".into()).unwrap();
        mgr.join_room("r", "c2".into(), "Carl".into()).unwrap();

        let was_host = mgr.leave_room("r", "host").unwrap();
        assert!(was_host);
        let err = mgr.join_room("r", "c3".into(), "Dana".into()).unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[test]
    fn non_host_disconnect_only_prunes_peer() {
        let mut mgr = RoomManager::new();
        mgr.create_room("r".into(), "host".into(), "Alice".into(), settings()).unwrap();
        mgr.join_room("r", "c1".into(), "Bob".into()).unwrap();

        let was_host = mgr.leave_room("r", "c1").unwrap();
        assert!(!was_host);
        let room = mgr.get("r").unwrap();
        assert_eq!(room.peers, vec!["host".to_string()]);
    }

    #[test]
    fn scenario_ready_gate() {
        let mut mgr = RoomManager::new();
        mgr.create_room("r".into(), "host".into(), "Alice".into(), settings()).unwrap();
        mgr.join_room("r", "c1".into(), "Bob".into()).unwrap();
        mgr.join_room("r", "c2".into(), "Carl".into()).unwrap();

        let room = mgr.get_mut("r").unwrap();
        assert!(matches!(room.try_start(), Err(ServerError::ReadyGate(_))));

        room.set_ready("c1", true);
        assert!(matches!(room.try_start(), Err(ServerError::ReadyGate(_))));

        room.set_ready("c2", true);
        assert!(room.try_start().is_ok());
    }
}
