//! Asset store: REST CRUD for maps/menus/heroes/weapon-models/sounds,
//! file-system backed under one root directory.
//!
//! Writes go through a write-then-rename so a concurrent reader never
//! observes a partially written file.

use crate::error::ServerError;
use crate::utils::sanitize_name;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

pub const ASSET_KINDS: [&str; 5] = ["maps", "menus", "heroes", "weapon-models", "sounds"];

fn validate_kind(kind: &str) -> Result<(), ServerError> {
    if ASSET_KINDS.contains(&kind) {
        Ok(())
    } else {
        Err(ServerError::NotFound(format!("unknown asset kind {kind}")))
    }
}

/// File-system backed store for the five asset kinds. One root directory,
/// one subdirectory per kind, one `<name>.json` file per asset.
#[derive(Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn kind_dir(&self, kind: &str) -> PathBuf {
        self.root.join(kind)
    }

    fn asset_path(&self, kind: &str, name: &str) -> PathBuf {
        self.kind_dir(kind).join(format!("{name}.json"))
    }

    pub fn list(&self, kind: &str) -> Result<Vec<String>, ServerError> {
        validate_kind(kind)?;
        let dir = self.kind_dir(kind);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("json") {
                    path.file_stem().and_then(|s| s.to_str()).map(|s| s.to_string())
                } else {
                    None
                }
            })
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn get(&self, kind: &str, name: &str) -> Result<Value, ServerError> {
        validate_kind(kind)?;
        if !sanitize_name(name) {
            return Err(ServerError::InvalidName(name.to_string()));
        }
        let path = self.asset_path(kind, name);
        let data = std::fs::read_to_string(&path)
            .map_err(|_| ServerError::NotFound(format!("{kind}/{name}")))?;
        serde_json::from_str(&data).map_err(|e| ServerError::IoFailure(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    /// Writes `body` pretty-printed to `<kind>/<name>.json`, creating the
    /// kind directory on demand. Uses write-then-rename so a concurrent
    /// reader never observes a partially written file.
    pub fn put(&self, kind: &str, name: &str, body: &Value) -> Result<(), ServerError> {
        validate_kind(kind)?;
        if !sanitize_name(name) {
            return Err(ServerError::InvalidName(name.to_string()));
        }
        let dir = self.kind_dir(kind);
        std::fs::create_dir_all(&dir)?;
        let final_path = self.asset_path(kind, name);
        let tmp_path = dir.join(format!("{name}.json.tmp"));
        let pretty = serde_json::to_string_pretty(body)
            .map_err(|e| ServerError::IoFailure(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        std::fs::write(&tmp_path, pretty)?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    pub fn delete(&self, kind: &str, name: &str) -> Result<(), ServerError> {
        validate_kind(kind)?;
        if !sanitize_name(name) {
            return Err(ServerError::InvalidName(name.to_string()));
        }
        let path = self.asset_path(kind, name);
        std::fs::remove_file(&path).map_err(|_| ServerError::NotFound(format!("{kind}/{name}")))
    }

    /// Raw bytes for a weapon-model's companion `.glb` file, served at
    /// `/api/weapon-model-files/<file>`.
    pub fn get_weapon_model_file(&self, file: &str) -> Result<Vec<u8>, ServerError> {
        if !sanitize_name(file.trim_end_matches(".glb")) {
            return Err(ServerError::InvalidName(file.to_string()));
        }
        let path = self.kind_dir("weapon-models").join(file);
        std::fs::read(&path).map_err(|_| ServerError::NotFound(file.to_string()))
    }

    /// Seeds the built-in heroes (`marksman`, `brawler`) into `heroes/` on
    /// startup, only if absent.
    pub fn seed_builtin_heroes(&self) {
        for (name, hero) in [("marksman", builtin_marksman()), ("brawler", builtin_brawler())] {
            let dir = self.kind_dir("heroes");
            let path = dir.join(format!("{name}.json"));
            if path.exists() {
                continue;
            }
            if let Ok(value) = serde_json::to_value(&hero) {
                if let Err(e) = self.put("heroes", name, &value) {
                    log::warn!("failed to seed builtin hero {name}: {e}");
                }
            }
        }
    }
}

fn builtin_marksman() -> shared::HeroConfig {
    shared::HeroConfig {
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

fn builtin_brawler() -> shared::HeroConfig {
    shared::HeroConfig {
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

pub fn router(store: Arc<AssetStore>) -> Router {
    Router::new()
        .route("/api/:kind", get(list_handler))
        .route("/api/:kind/:name", get(get_handler).post(post_handler).delete(delete_handler))
        .route("/api/weapon-model-files/:file", get(weapon_model_file_handler))
        .with_state(store)
}

async fn list_handler(State(store): State<Arc<AssetStore>>, Path(kind): Path<String>) -> Result<Json<Vec<String>>, ServerError> {
    Ok(Json(store.list(&kind)?))
}

async fn get_handler(State(store): State<Arc<AssetStore>>, Path((kind, name)): Path<(String, String)>) -> Result<Json<Value>, ServerError> {
    Ok(Json(store.get(&kind, &name)?))
}

async fn post_handler(
    State(store): State<Arc<AssetStore>>,
    Path((kind, name)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<StatusCode, ServerError> {
    store.put(&kind, &name, &body)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_handler(State(store): State<Arc<AssetStore>>, Path((kind, name)): Path<(String, String)>) -> Result<StatusCode, ServerError> {
    store.delete(&kind, &name)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn weapon_model_file_handler(State(store): State<Arc<AssetStore>>, Path(file): Path<String>) -> Result<Bytes, ServerError> {
    Ok(Bytes::from(store.get_weapon_model_file(&file)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (AssetStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("create temp dir");
        (AssetStore::new(dir.path()), dir)
    }

    #[test]
    fn round_trip_post_then_get() {
        let (store, _dir) = temp_store();
        let body = serde_json::json!({"name": "dust"});
        store.put("maps", "dust2", &body).unwrap();
        let fetched = store.get("maps", "dust2").unwrap();
        assert_eq!(fetched, body);
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let (store, _dir) = temp_store();
        store.put("maps", "dust2", &serde_json::json!({})).unwrap();
        store.delete("maps", "dust2").unwrap();
        assert!(matches!(store.get("maps", "dust2"), Err(ServerError::NotFound(_))));
    }

    #[test]
    fn delete_nonexistent_is_not_found() {
        let (store, _dir) = temp_store();
        assert!(matches!(store.delete("maps", "ghost"), Err(ServerError::NotFound(_))));
    }

    #[test]
    fn invalid_name_rejected() {
        let (store, _dir) = temp_store();
        let err = store.put("maps", "../etc", &serde_json::json!({})).unwrap_err();
        assert!(matches!(err, ServerError::InvalidName(_)));
    }

    #[test]
    fn unknown_kind_rejected() {
        let (store, _dir) = temp_store();
        assert!(matches!(store.list("weapons"), Err(ServerError::NotFound(_))));
    }

    #[test]
    fn list_reflects_written_assets() {
        let (store, _dir) = temp_store();
        store.put("heroes", "marksman", &serde_json::json!({})).unwrap();
        store.put("heroes", "brawler", &serde_json::json!({})).unwrap();
        let listed = store.list("heroes").unwrap();
        assert_eq!(listed, vec!["brawler".to_string(), "marksman".to_string()]);
    }

    #[test]
    fn seeding_writes_builtin_heroes_only_if_absent() {
        let (store, _dir) = temp_store();
        store.seed_builtin_heroes();
        assert!(store.get("heroes", "marksman").is_ok());
        assert!(store.get("heroes", "brawler").is_ok());

        store.put("heroes", "marksman", &serde_json::json!({"customized": true})).unwrap();
        store.seed_builtin_heroes();
        let after = store.get("heroes", "marksman").unwrap();
        assert_eq!(after, serde_json::json!({"customized": true}));
    }
}
