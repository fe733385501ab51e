//! # Client Core Library
//!
//! The client-side half of the authoritative host-relayed multiplayer
//! runtime: local input prediction and server reconciliation, plus the
//! WebSocket relay connection. The renderer, HUD, input capture, and audio
//! are external collaborators this crate does not depend on — `client`
//! only emits and consumes typed world events.
//!
//! ## Module Organization
//!
//! ### Predictor (`predictor`)
//! Owns the local player's predicted position, applies input through the
//! same `shared::physics::step` the host runs, and reconciles against
//! authoritative snapshots with a snap-or-lerp rule keyed on squared
//! distance. Tracks remote entities straight from snapshots, with optional
//! two-snapshot interpolation.
//!
//! ### Transport (`transport`)
//! A WebSocket connection to the relay server: typed outbound requests
//! (`createRoom`/`joinRoom`/`input`/...) and a channel of inbound
//! `ServerEvent`s an external renderer would subscribe to.
//!
//! ### Error (`error`)
//! Typed connection/transport error taxonomy.

pub mod error;
pub mod predictor;
pub mod transport;
