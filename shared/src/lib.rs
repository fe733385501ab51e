//! Shared simulation library used by both the relay server and the client.
//!
//! Holds everything that must agree between host and client: spatial
//! primitives, the physics step, the combat resolver, the entity model, the
//! arena aggregate, the round/match state machine, and the wire protocol
//! they exchange over the relay.

pub mod arena;
pub mod combat;
pub mod entity;
pub mod match_state;
pub mod math;
pub mod physics;
pub mod protocol;

pub use arena::{Arena, Collider, Waypoint};
pub use entity::{Entity, EntityEvent, FireMode, HeroConfig, Segment, Weapon};
pub use match_state::{Match, MatchEvent, Mode as MatchMode, Phase};
pub use math::{Aabb, Ray, Triangle, Vector3};
pub use physics::{step, MoveInput};
