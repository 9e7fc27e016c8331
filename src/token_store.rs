use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config;

const TOKEN_FILE: &str = "auth-token.json";

fn token_file() -> PathBuf {
    config::config_dir().join(TOKEN_FILE)
}

#[derive(Clone, Default, Serialize, Deserialize)]
struct TokenDocument {
    #[serde(default)]
    auth_token: String,
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

fn read_token(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let doc: TokenDocument = serde_json::from_str(&content).ok()?;
    if doc.auth_token.is_empty() {
        None
    } else {
        Some(doc.auth_token)
    }
}

fn write_token(path: &Path, token: &str) -> Result<(), String> {
    config::save_json(
        path,
        &TokenDocument {
            auth_token: token.to_string(),
        },
    )
}

fn remove_token(path: &Path) {
    if let Err(e) = std::fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        eprintln!("[TokenStore] Failed to remove token file: {e}");
    }
}

// ---------------------------------------------------------------------------
// JWT claims
// ---------------------------------------------------------------------------

/// Decode the payload segment of a JWT without verifying the signature.
/// The shell only reads display claims; validation is the backend's job.
fn jwt_claims(token: &str) -> Option<serde_json::Value> {
    let payload = token.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// The `sub` claim carries the signed-in user's email.
fn email_from_token(token: &str) -> Option<String> {
    jwt_claims(token)?
        .get("sub")
        .and_then(|s| s.as_str())
        .map(str::to_string)
}

/// A token counts as valid while its `exp` claim lies in the future.
/// No `exp`, no validity.
fn is_token_valid(token: &str) -> bool {
    let Some(exp) = jwt_claims(token).and_then(|c| c.get("exp").and_then(|e| e.as_i64())) else {
        return false;
    };
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(i64::MAX);
    now < exp
}

// ---------------------------------------------------------------------------
// Tauri commands
// ---------------------------------------------------------------------------

#[tauri::command]
pub(crate) fn set_auth_token(token: String) -> Result<(), String> {
    write_token(&token_file(), &token)
}

#[tauri::command]
pub(crate) fn clear_auth_token() {
    remove_token(&token_file());
}

/// Email of the signed-in user, or None when no (parseable) token is stored.
#[tauri::command]
pub(crate) fn get_auth_email() -> Option<String> {
    read_token(&token_file()).as_deref().and_then(email_from_token)
}

#[tauri::command]
pub(crate) fn is_logged_in() -> bool {
    read_token(&token_file())
        .as_deref()
        .is_some_and(is_token_valid)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
