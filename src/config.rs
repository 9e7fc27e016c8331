use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tauri::State;

use crate::AppState;

/// Bundled configuration template, copied verbatim into the user's config
/// directory on first run (see [`provision_default`]).
const DEFAULT_TEMPLATE: &str = include_str!("../resources/config.default.json");

pub(crate) const CONFIG_FILE: &str = "config.json";

/// Get the config directory using platform-appropriate location.
///
/// - macOS: `~/Library/Application Support/hotel-task-manager/`
/// - Linux: `~/.config/hotel-task-manager/` (or `$XDG_CONFIG_HOME`)
/// - Windows: `%APPDATA%/hotel-task-manager/`
///
/// Falls back to `~/.hotel-task-manager/` if the platform dir is unavailable.
pub(crate) fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("hotel-task-manager"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".hotel-task-manager")
        })
}

pub(crate) fn config_file() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

// ---------------------------------------------------------------------------
// ConfigDocument
// ---------------------------------------------------------------------------

/// The persisted settings document. Every field has a hardcoded default so a
/// partially-written or older file still deserializes; a file that does not
/// parse at all is rewritten with full defaults by [`load_document`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConfigDocument {
    /// Backend base URL, scheme + host only (no port, no path)
    #[serde(default = "default_api_host")]
    pub(crate) api_host: String,
    /// Port the backend listens on (local or remote)
    #[serde(default = "default_backend_port")]
    pub(crate) backend_port: u16,
    /// Path to the local `backend.jar`; empty string = no local backend
    #[serde(default)]
    pub(crate) local_jar_path: String,
    #[serde(default = "default_db_host")]
    pub(crate) db_host: String,
    #[serde(default = "default_db_name")]
    pub(crate) db_name: String,
    #[serde(default = "default_db_user")]
    pub(crate) db_user: String,
    /// Base64 of the plaintext database password. This is obfuscation, not
    /// encryption: anyone who can read the file can recover the password.
    #[serde(default)]
    pub(crate) db_password_encoded: String,
    /// One-shot flag: the next local launch recreates the schema and seeds
    /// sample data. Cleared on disk immediately after a successful spawn.
    #[serde(default)]
    pub(crate) seed_database_once: bool,
}

fn default_api_host() -> String {
    "http://localhost".to_string()
}

fn default_backend_port() -> u16 {
    8080
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_name() -> String {
    "hoteltaskmanager".to_string()
}

fn default_db_user() -> String {
    "root".to_string()
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            api_host: default_api_host(),
            backend_port: default_backend_port(),
            local_jar_path: String::new(),
            db_host: default_db_host(),
            db_name: default_db_name(),
            db_user: default_db_user(),
            db_password_encoded: String::new(),
            seed_database_once: false,
        }
    }
}

impl ConfigDocument {
    /// Base URL the health poller and frontend talk to, e.g.
    /// `http://localhost:8080`.
    pub(crate) fn backend_base_url(&self) -> String {
        format!("{}:{}", self.api_host.trim_end_matches('/'), self.backend_port)
    }
}

// ---------------------------------------------------------------------------
// Load / save / provision
// ---------------------------------------------------------------------------

/// Load the configuration document from `path`. Never fails: a missing,
/// unreadable, or corrupt file falls back to defaults, and the broken file is
/// rewritten so the next reader finds valid JSON. Valid partial content
/// overrides defaults field by field.
pub(crate) fn load_document(path: &Path) -> ConfigDocument {
    let content = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!(
                "[Config] Could not read {}: {e}. Restoring defaults.",
                path.display()
            );
            return repair(path);
        }
    };
    match serde_json::from_str(&content) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!(
                "[Config] Corrupt config {}: {e}. Restoring defaults.",
                path.display()
            );
            repair(path)
        }
    }
}

fn repair(path: &Path) -> ConfigDocument {
    let doc = ConfigDocument::default();
    if let Err(e) = save_json(path, &doc) {
        eprintln!("[Config] Failed to restore defaults: {e}");
    }
    doc
}

/// Save the full document. Delegates to the atomic JSON writer.
pub(crate) fn save_document(path: &Path, doc: &ConfigDocument) -> Result<(), String> {
    save_json(path, doc)
}

/// Save a JSON file atomically (temp file + rename), 2-space indented.
/// Sets 0600 permissions on Unix since these files carry credentials.
pub(crate) fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    let dir = path
        .parent()
        .ok_or_else(|| format!("No parent directory for {}", path.display()))?;
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create config directory: {e}"))?;

    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize config: {e}"))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| CONFIG_FILE.to_string());
    let temp = dir.join(format!("{}.tmp.{}", file_name, std::process::id()));

    std::fs::write(&temp, &json).map_err(|e| format!("Failed to write temp config: {e}"))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&temp, perms)
            .map_err(|e| format!("Failed to set config permissions: {e}"))?;
    }

    // Atomic rename: either the old file or new file exists, never partial
    std::fs::rename(&temp, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp);
        format!("Failed to commit config: {e}")
    })?;

    Ok(())
}

/// Copy the bundled template to `path` if nothing exists there yet. Runs once
/// per installation in practice; an existing file is never touched. Failure
/// is logged, not fatal: [`load_document`] self-heals on the next step.
pub(crate) fn provision_default(path: &Path) {
    if path.exists() {
        return;
    }
    let write = || -> Result<(), String> {
        let dir = path
            .parent()
            .ok_or_else(|| format!("No parent directory for {}", path.display()))?;
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create config directory: {e}"))?;
        std::fs::write(path, DEFAULT_TEMPLATE)
            .map_err(|e| format!("Failed to write default config: {e}"))
    };
    match write() {
        Ok(()) => eprintln!("[Config] Provisioned default config at {}", path.display()),
        Err(e) => eprintln!("[Config] Could not provision default config: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Tauri commands
// ---------------------------------------------------------------------------

/// Return the cached configuration document.
#[tauri::command]
pub(crate) fn get_config(state: State<'_, Arc<AppState>>) -> ConfigDocument {
    state.config.read().clone()
}

/// Persist a new configuration document and update the cache. The disk write
/// happens first so the cache never gets ahead of a failed save.
#[tauri::command]
pub(crate) fn set_config(
    state: State<'_, Arc<AppState>>,
    config: ConfigDocument,
) -> Result<(), String> {
    save_document(&state.config_path, &config)?;
    *state.config.write() = config;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
