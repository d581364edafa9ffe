//! Persistent key/value storage.
//!
//! Values are JSON files in the platform config directory:
//! - Linux: `~/.config/comandero/`
//! - macOS: `~/Library/Application Support/comandero/`
//! - Windows: `%APPDATA%\comandero\`

use std::path::PathBuf;
use std::sync::Once;

use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

/// Keys written by the pre-realtime implementation, which persisted the
/// notification list locally. The server is the source of truth now.
const LEGACY_KEYS: [&str; 2] = ["admin_notifications", "admin_notifications_seen"];

static MIGRATIONS: Once = Once::new();

/// One-time cleanup of state left behind by earlier versions. Idempotent;
/// runs at most once per process, invoked when the first session starts.
pub fn run_startup_migrations() {
    MIGRATIONS.call_once(|| {
        for key in LEGACY_KEYS {
            if exists(key) {
                remove(key);
                info!(key, "estado legado eliminado");
            }
        }
    });
}

/// Save a value. Returns `true` if the operation succeeded.
pub fn save<T: Serialize>(key: &str, value: &T) -> bool {
    match serde_json::to_string(value) {
        Ok(json) => save_raw(key, &json),
        Err(_) => false,
    }
}

/// Load a value. `None` if the key doesn't exist or doesn't parse.
pub fn load<T: DeserializeOwned>(key: &str) -> Option<T> {
    let json = load_raw(key)?;
    serde_json::from_str(&json).ok()
}

/// Remove a value.
pub fn remove(key: &str) {
    if let Some(path) = file_path(key) {
        let _ = std::fs::remove_file(path);
    }
}

/// Check if a key exists.
pub fn exists(key: &str) -> bool {
    file_path(key).map(|p| p.exists()).unwrap_or(false)
}

fn config_dir() -> Option<PathBuf> {
    let app_dir = dirs::config_dir()?.join("comandero");
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir).ok()?;
    }
    Some(app_dir)
}

fn file_path(key: &str) -> Option<PathBuf> {
    let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
    Some(config_dir()?.join(format!("{safe_key}.json")))
}

fn save_raw(key: &str, value: &str) -> bool {
    let Some(path) = file_path(key) else {
        return false;
    };
    std::fs::write(path, value).is_ok()
}

fn load_raw(key: &str) -> Option<String> {
    std::fs::read_to_string(file_path(key)?).ok()
}
