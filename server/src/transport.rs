//! WebSocket relay: per-connection task plus an outbound mpsc queue per
//! peer, dispatching `ClientMessage`s against the shared `RoomManager` and
//! relaying host-authoritative traffic to the rest of the room.
//!
//! One `axum` WebSocket task pair per peer (a reader loop and a writer loop
//! fed by an mpsc channel) and a central dispatch function keyed on message
//! variant, exchanging JSON text frames.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use shared::protocol::{Ack, ClientMessage, RoomSettings, ServerMessage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::sync::Mutex;

use crate::assets::AssetStore;
use crate::host::{self, HostCommand, HostHandle};
use crate::room::{PeerId, RoomManager};
use crate::utils::get_timestamp;

#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<Mutex<RoomManager>>,
    pub assets: Arc<AssetStore>,
    pub peers: Arc<Mutex<HashMap<PeerId, UnboundedSender<Message>>>>,
    pub hosts: Arc<Mutex<HashMap<String, HostHandle>>>,
}

impl AppState {
    pub fn new(assets: Arc<AssetStore>) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(RoomManager::new())),
            assets,
            peers: Arc::new(Mutex::new(HashMap::new())),
            hosts: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    crate::assets::router(state.assets.clone()).merge(Router::new().route("/ws", get(ws_handler)).with_state(state))
}

async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn send_to(peers: &HashMap<PeerId, UnboundedSender<Message>>, peer: &str, msg: &impl serde::Serialize) {
    if let Some(tx) = peers.get(peer) {
        if let Ok(text) = serde_json::to_string(msg) {
            let _ = tx.send(Message::Text(text));
        }
    }
}

async fn broadcast_room(peers: &HashMap<PeerId, UnboundedSender<Message>>, room_peers: &[PeerId], msg: &ServerMessage) {
    for peer in room_peers {
        send_to(peers, peer, msg).await;
    }
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let peer_id: PeerId = format!("peer-{}", uuid_like());
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = unbounded_channel::<Message>();

    state.peers.lock().await.insert(peer_id.clone(), out_tx);

    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if ws_tx.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut joined_room: Option<String> = None;

    while let Some(Ok(msg)) = ws_rx.next().await {
        let text = match msg {
            Message::Text(t) => t,
            Message::Close(_) => break,
            _ => continue,
        };
        let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) else {
            log::warn!("peer {peer_id} sent unparseable frame");
            continue;
        };
        handle_message(&state, &peer_id, &mut joined_room, client_msg).await;
    }

    cleanup_peer(&state, &peer_id, joined_room.as_deref()).await;
    writer.abort();
}

async fn handle_message(state: &AppState, peer_id: &PeerId, joined_room: &mut Option<String>, msg: ClientMessage) {
    match msg {
        ClientMessage::CreateRoom { room_id, settings } => {
            handle_create_room(state, peer_id, joined_room, room_id, settings).await;
        }
        ClientMessage::JoinRoom { room_id, name } => {
            handle_join_room(state, peer_id, joined_room, room_id, name).await;
        }
        ClientMessage::LeaveRoom => {
            if let Some(room_id) = joined_room.take() {
                leave_room(state, peer_id, &room_id).await;
            }
        }
        ClientMessage::SetReady { ready } => {
            if let Some(room_id) = joined_room.as_ref() {
                let mut rooms = state.rooms.lock().await;
                if let Ok(room) = rooms.get_mut(room_id) {
                    room.set_ready(peer_id, ready);
                }
            }
        }
        ClientMessage::StartGame => {
            if let Some(room_id) = joined_room.clone() {
                handle_start_game(state, peer_id, &room_id).await;
            }
        }
        ClientMessage::Input(mut frame) => {
            if let Some(room_id) = joined_room.as_ref() {
                frame.client_id = Some(peer_id.clone());
                let hosts = state.hosts.lock().await;
                if let Some(handle) = hosts.get(room_id) {
                    let _ = handle.commands.send(HostCommand::Input { peer: peer_id.clone(), frame });
                }
            }
        }
        ClientMessage::HeroSelect(sel) => {
            if let Some(room_id) = joined_room.as_ref() {
                let hosts = state.hosts.lock().await;
                if let Some(handle) = hosts.get(room_id) {
                    let _ = handle.commands.send(HostCommand::HeroSelect(sel));
                }
            }
        }
    }
}

async fn handle_create_room(state: &AppState, peer_id: &PeerId, joined_room: &mut Option<String>, room_id: String, settings: RoomSettings) {
    let result = {
        let mut rooms = state.rooms.lock().await;
        rooms.create_room(room_id.clone(), peer_id.clone(), peer_id.clone(), settings)
    };
    let peers = state.peers.lock().await;
    match result {
        Ok(()) => {
            *joined_room = Some(room_id);
            send_to(&peers, peer_id, &Ack::CreateRoom { ok: true, role: "host".to_string(), player_number: 1 }).await;
        }
        Err(e) => send_to(&peers, peer_id, &Ack::JoinRoomError { ok: false, error: e.to_ack_error() }).await,
    }
}

async fn handle_join_room(state: &AppState, peer_id: &PeerId, joined_room: &mut Option<String>, room_id: String, name: String) {
    let result = {
        let mut rooms = state.rooms.lock().await;
        rooms.join_room(&room_id, peer_id.clone(), name)
    };
    let peers = state.peers.lock().await;
    match result {
        Ok((player_number, host_id, settings)) => {
            *joined_room = Some(room_id.clone());
            send_to(
                &peers,
                peer_id,
                &Ack::JoinRoom { ok: true, role: "client".to_string(), player_number, host_id, settings: settings.clone() },
            )
            .await;
            let rooms = state.rooms.lock().await;
            if let Ok(room) = rooms.get(&room_id) {
                broadcast_room(&peers, &room.peers, &ServerMessage::PlayerList(room.player_list())).await;
                send_to(&peers, &room.host_peer, &ServerMessage::ClientJoined { client_id: peer_id.clone() }).await;
            }
        }
        Err(e) => send_to(&peers, peer_id, &Ack::JoinRoomError { ok: false, error: e.to_ack_error() }).await,
    }
}

async fn handle_start_game(state: &AppState, peer_id: &PeerId, room_id: &str) {
    let start_result = {
        let mut rooms = state.rooms.lock().await;
        let room = match rooms.get_mut(room_id) {
            Ok(r) => r,
            Err(e) => {
                let peers = state.peers.lock().await;
                send_to(&peers, peer_id, &Ack::StartGame { ok: false, error: Some(e.to_ack_error()) }).await;
                return;
            }
        };
        if !room.is_host(peer_id) {
            None
        } else {
            match room.try_start() {
                Ok(()) => Some((room.player_list(), room.settings.clone(), room.peers.clone())),
                Err(e) => {
                    let peers = state.peers.lock().await;
                    send_to(&peers, peer_id, &Ack::StartGame { ok: false, error: Some(e.to_ack_error()) }).await;
                    return;
                }
            }
        }
    };

    // Host-only event from a non-host: dropped without a response.
    let Some((players, settings, room_peers)) = start_result else {
        return;
    };

    let peers_state = state.peers.clone();
    let room_peers_for_broadcast = room_peers.clone();
    let broadcast = move |msg: &ServerMessage| {
        let peers_state = peers_state.clone();
        let room_peers_for_broadcast = room_peers_for_broadcast.clone();
        let msg = msg.clone();
        tokio::spawn(async move {
            let peers = peers_state.lock().await;
            broadcast_room(&peers, &room_peers_for_broadcast, &msg).await;
        });
    };

    let (cmd_tx, cmd_rx) = unbounded_channel();
    let members: Vec<(PeerId, String)> = players.iter().map(|p| (p.id.clone(), p.name.clone())).collect();
    state.hosts.lock().await.insert(room_id.to_string(), HostHandle { commands: cmd_tx });
    tokio::spawn(host::run(cmd_rx, members, settings.clone(), broadcast));

    let peers = state.peers.lock().await;
    send_to(&peers, peer_id, &Ack::StartGame { ok: true, error: None }).await;
    broadcast_room(&peers, &room_peers, &ServerMessage::GameStarted { players, settings }).await;
}

async fn leave_room(state: &AppState, peer_id: &PeerId, room_id: &str) {
    let remaining_peers: Vec<PeerId> = {
        let rooms = state.rooms.lock().await;
        rooms.get(room_id).map(|r| r.peers.clone()).unwrap_or_default()
    };
    let was_host = {
        let mut rooms = state.rooms.lock().await;
        rooms.leave_room(room_id, peer_id)
    };
    let peers = state.peers.lock().await;
    match was_host {
        Ok(true) => {
            if let Some(handle) = state.hosts.lock().await.remove(room_id) {
                let _ = handle.commands.send(HostCommand::Shutdown);
            }
            let remaining: Vec<PeerId> = remaining_peers.into_iter().filter(|p| p != peer_id).collect();
            broadcast_room(&peers, &remaining, &ServerMessage::RoomClosed).await;
        }
        Ok(false) => {
            if let Some(handle) = state.hosts.lock().await.get(room_id) {
                let _ = handle.commands.send(HostCommand::PeerLeft(peer_id.clone()));
            }
            let rooms = state.rooms.lock().await;
            if let Ok(room) = rooms.get(room_id) {
                send_to(&peers, &room.host_peer, &ServerMessage::ClientLeft { client_id: peer_id.clone() }).await;
                broadcast_room(&peers, &room.peers, &ServerMessage::PlayerList(room.player_list())).await;
            }
        }
        Err(_) => {}
    }
}

async fn cleanup_peer(state: &AppState, peer_id: &PeerId, joined_room: Option<&str>) {
    if let Some(room_id) = joined_room {
        leave_room(state, peer_id, room_id).await;
    }
    state.peers.lock().await.remove(peer_id);
}

/// Cheap, dependency-free unique id: process-local counter plus the
/// current timestamp, sufficient for disambiguating peers on one server
/// process. Unlike a connecting client's own id, this never needs to
/// survive a restart.
fn uuid_like() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!("{}-{}", get_timestamp(), COUNTER.fetch_add(1, Ordering::Relaxed))
}
