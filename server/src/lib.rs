//! # Relay server library
//!
//! Authoritative host-relayed multiplayer runtime: a LAN relay server that
//! multiplexes rooms over WebSocket connections, runs the authoritative
//! simulation on behalf of each room's host peer, and serves the map/hero/
//! menu/weapon-model/sound asset store over a small REST surface.
//!
//! ## Module Organization
//!
//! ### Room module (`room`)
//! Owns the room/membership/ready-state lifecycle: room creation, joining
//! up to `max_players`, ready-gating `startGame`, and host-disconnect
//! teardown versus non-host-disconnect pruning.
//!
//! ### Host module (`host`)
//! The per-room authoritative simulation loop: a fixed-cadence tick that
//! applies the latest buffered input per peer, steps physics/combat via the
//! `shared` crate, advances the round/match state machine, and broadcasts
//! snapshots at a cadence decoupled from the tick rate.
//!
//! ### Transport module (`transport`)
//! The WebSocket relay: one task pair (reader + writer) per connection,
//! dispatching typed `ClientMessage`s against the shared `RoomManager` and
//! relaying host-authoritative traffic (`snapshot`, `shot`, round events) to
//! the rest of the room.
//!
//! ### Assets module (`assets`)
//! File-system backed REST CRUD for the five asset kinds
//! (`maps`/`menus`/`heroes`/`weapon-models`/`sounds`), with sanitized names
//! and write-then-rename atomicity.
//!
//! ### Error module (`error`)
//! A closed error taxonomy shared by the asset store's HTTP responses and
//! the transport layer's ack payloads.
//!
//! ## Concurrency model
//!
//! Room state lives behind one mutex per server (`RoomManager`), held only
//! across a mutation and its resulting broadcast. Each room's authoritative
//! loop, once started, runs as its own task and receives input/hero-select
//! commands over an unbounded channel rather than sharing room state
//! directly — cross-room operations never happen, and a room's loop only
//! ever touches that room's entities and match state.

pub mod assets;
pub mod error;
pub mod host;
pub mod room;
pub mod transport;
pub mod utils;
