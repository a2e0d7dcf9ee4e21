//! Session and cache storage for persisting login state.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

use fellowship::{AccessToken, RefreshToken, SessionCredential, StoreConfig, UserProfile};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Stored session data.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    endpoint: String,
    project_id: String,
    profile: UserProfile,
    access_token: String,
    refresh_token: Option<String>,
}

fn data_dir() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "fellowship").context("Could not determine data directory")?;

    let data_dir = dirs.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data directory")?;

    Ok(data_dir.to_path_buf())
}

fn session_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("session.json"))
}

/// Directory holding cached list snapshots for every store.
pub fn cache_dir() -> Result<PathBuf> {
    Ok(data_dir()?.join("cache"))
}

/// Identifies the store a cached snapshot came from.
pub fn cache_scope(config: &StoreConfig) -> String {
    format!("{}\n{}", config.endpoint, config.project_id)
}

/// Save a session to disk.
pub fn save_session(config: &StoreConfig, session: &SessionCredential) -> Result<()> {
    let stored = StoredSession {
        endpoint: config.endpoint.to_string(),
        project_id: config.project_id.clone(),
        profile: session.profile.clone(),
        access_token: session.access_token.as_str().to_string(),
        refresh_token: session
            .refresh_token
            .as_ref()
            .map(|t| t.as_str().to_string()),
    };

    let path = session_path()?;
    let json = serde_json::to_string_pretty(&stored)?;

    fs::write(&path, &json).context("Failed to write session file")?;

    // Set restrictive permissions (Unix only)
    #[cfg(unix)]
    {
        let mut perms = fs::metadata(&path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(&path, perms)?;
    }

    Ok(())
}

/// Load the session for `config`.
///
/// A session saved against another store is ignored.
pub fn load_session(config: &StoreConfig) -> Result<Option<SessionCredential>> {
    let path = session_path()?;

    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(&path).context("Failed to read session file")?;
    let stored: StoredSession = serde_json::from_str(&json).context("Invalid session file")?;

    if stored.endpoint != config.endpoint.to_string() || stored.project_id != config.project_id {
        warn!(
            endpoint = %stored.endpoint,
            "Stored session belongs to a different store, ignoring it"
        );
        return Ok(None);
    }

    let mut session = SessionCredential::new(AccessToken::new(stored.access_token), stored.profile);
    if let Some(token) = stored.refresh_token {
        session = session.with_refresh_token(RefreshToken::new(token));
    }
    Ok(Some(session))
}

/// Clear the stored session. Returns true if one existed.
pub fn clear_session() -> Result<bool> {
    let path = session_path()?;

    if !path.exists() {
        return Ok(false);
    }

    fs::remove_file(&path).context("Failed to remove session file")?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fellowship::StoreUrl;

    fn config(endpoint: &str, project: &str) -> StoreConfig {
        StoreConfig::new("key", project, StoreUrl::new(endpoint).unwrap())
    }

    #[test]
    fn cache_scope_tracks_endpoint_and_project() {
        let a = config("file:///srv/a", "local");
        assert_eq!(cache_scope(&a), cache_scope(&config("file:///srv/a", "local")));
        assert_ne!(cache_scope(&a), cache_scope(&config("file:///srv/b", "local")));
        assert_ne!(cache_scope(&a), cache_scope(&config("file:///srv/a", "other")));
    }
}
