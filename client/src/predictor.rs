//! Client-side prediction and reconciliation.
//!
//! The local player's position is predicted every input frame and then
//! reconciled against the next authoritative snapshot with a squared-distance
//! gate: small drift lerps back into place, large drift snaps outright. No
//! input replay — the predictor only ever looks at the latest snapshot and
//! its own current predicted position.

use shared::protocol::EntitySnapshot;
use shared::{Entity, HeroConfig, MoveInput, Vector3};
use std::collections::HashMap;

/// Distance squared beyond which the predictor snaps instead of lerping.
pub const SNAP_THRESHOLD_SQ: f64 = 25.0;
/// Fraction of the remaining delta closed per snapshot when lerping.
pub const LERP_RATE: f64 = 0.3;

/// Owns the local player's predicted position and applies/reconciles it
/// against authoritative snapshots. Remote entities are tracked separately
/// in `RemoteEntities` since they are never predicted or extrapolated.
pub struct Predictor {
    pub predicted_self: Entity,
}

impl Predictor {
    pub fn new(local_id: impl Into<String>, hero: &HeroConfig, spawn: Vector3) -> Self {
        Self { predicted_self: Entity::new(local_id, hero, spawn) }
    }

    /// Advance the predicted position by one tick of local input, exactly
    /// as the host would (same `shared::physics::step` call, same arena).
    pub fn apply_input(&mut self, input: &MoveInput, arena: &shared::Arena, dt: f64) {
        shared::physics::step(&mut self.predicted_self, input, arena, dt);
    }

    /// Reconcile the predicted self-position against the authoritative
    /// snapshot entry for this entity: squared delta under the threshold
    /// lerps at `LERP_RATE`; over it snaps outright. Health/ammo/reload/alive
    /// are always overwritten unconditionally — the client never decides its
    /// own health.
    pub fn reconcile(&mut self, snapshot_self: &EntitySnapshot) {
        let authoritative = Vector3::new(snapshot_self.pos[0], snapshot_self.pos[1], snapshot_self.pos[2]);
        let predicted = self.predicted_self.position;
        let delta_sq = authoritative.sub(predicted).length_squared();

        self.predicted_self.position = if delta_sq > SNAP_THRESHOLD_SQ {
            authoritative
        } else {
            predicted.lerp(authoritative, LERP_RATE)
        };
        self.predicted_self.feet_y = self.predicted_self.position.y - shared::entity::EYE_HEIGHT;

        self.predicted_self.yaw = snapshot_self.yaw;
        self.predicted_self.pitch = snapshot_self.pitch;
        self.predicted_self.health = snapshot_self.health;
        self.predicted_self.alive = snapshot_self.alive;
        self.predicted_self.weapon.ammo = snapshot_self.ammo;
        self.predicted_self.weapon.mag_size = snapshot_self.mag_size;
        self.predicted_self.weapon.reloading = snapshot_self.reloading;
        self.predicted_self.weapon.reload_end_at = snapshot_self.reload_end_at;
    }
}

/// Render-facing state for one remote entity: the two most recent
/// snapshots, so a caller can interpolate between them.
#[derive(Debug, Clone, Default)]
struct RemoteHistory {
    previous: Option<EntitySnapshot>,
    latest: Option<EntitySnapshot>,
}

/// Tracks every remote entity straight from snapshots — no extrapolation,
/// no physics step. Kept separate from `Predictor` since only the local
/// player is ever predicted.
#[derive(Debug, Clone, Default)]
pub struct RemoteEntities {
    entities: HashMap<String, RemoteHistory>,
}

impl RemoteEntities {
    pub fn new() -> Self {
        Self { entities: HashMap::new() }
    }

    /// Ingest a snapshot, excluding `local_id` (the predictor owns that one).
    pub fn apply_snapshot(&mut self, local_id: &str, entities: &[EntitySnapshot]) {
        for snap in entities {
            if snap.id == local_id {
                continue;
            }
            let history = self.entities.entry(snap.id.clone()).or_default();
            history.previous = history.latest.take();
            history.latest = Some(snap.clone());
        }
    }

    /// Position at blend factor `alpha` (0 = previous snapshot, 1 = latest).
    /// Falls back to the latest snapshot's position when only one has
    /// arrived yet.
    pub fn interpolated_position(&self, id: &str, alpha: f64) -> Option<Vector3> {
        let history = self.entities.get(id)?;
        let latest = history.latest.as_ref()?;
        let latest_pos = Vector3::new(latest.pos[0], latest.pos[1], latest.pos[2]);
        match &history.previous {
            Some(prev) => {
                let prev_pos = Vector3::new(prev.pos[0], prev.pos[1], prev.pos[2]);
                Some(prev_pos.lerp(latest_pos, alpha.clamp(0.0, 1.0)))
            }
            None => Some(latest_pos),
        }
    }

    pub fn latest(&self, id: &str) -> Option<&EntitySnapshot> {
        self.entities.get(id).and_then(|h| h.latest.as_ref())
    }

    pub fn remove(&mut self, id: &str) {
        self.entities.remove(id);
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.entities.keys()
    }
}
