//! Operator identity management for the CLI.
//!
//! Operator resolution order:
//! 1) CLI --user (explicit)
//! 2) TEAMBOARD_USER environment variable
//! 3) Persisted value in <data dir>/session
//! 4) Config default (user.default)
//!
//! The resolved value is a user id; the directory record behind it carries
//! the role and admin flag. Password checks stay with the identity provider,
//! which is outside the CLI's concern.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Error, Result};

const SESSION_FILENAME: &str = "session";

/// Resolve the operator id using CLI, environment, persisted value, and
/// config. `None` means no identity anywhere, which callers treat as
/// not-signed-in.
pub fn resolve_operator(
    data_dir: &Path,
    cli_user: Option<&str>,
    config: &Config,
) -> Result<Option<String>> {
    if let Some(user) = non_empty(cli_user) {
        return Ok(Some(user.to_string()));
    }

    if let Ok(env_user) = std::env::var("TEAMBOARD_USER") {
        if let Some(user) = non_empty(Some(env_user.as_str())) {
            return Ok(Some(user.to_string()));
        }
    }

    if let Some(user) = load_persisted_operator(data_dir)? {
        return Ok(Some(user));
    }

    Ok(config.user.default.clone())
}

/// Persist the operator id in `<data dir>/session`.
pub fn persist_operator(data_dir: &Path, user_id: &str) -> Result<()> {
    let user_id = non_empty(Some(user_id))
        .ok_or_else(|| Error::InvalidArgument("user id cannot be empty".to_string()))?;

    std::fs::create_dir_all(data_dir)?;
    std::fs::write(session_path(data_dir), format!("{user_id}\n"))?;
    Ok(())
}

/// Load the persisted operator id, if present.
pub fn load_persisted_operator(data_dir: &Path) -> Result<Option<String>> {
    let path = session_path(data_dir);
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path)?;
    let user_id = raw.trim();
    if user_id.is_empty() {
        return Ok(None);
    }

    Ok(Some(user_id.to_string()))
}

/// Remove the persisted operator id. A missing file is already signed out.
pub fn clear_operator(data_dir: &Path) -> Result<()> {
    let path = session_path(data_dir);
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(Error::Io(err)),
    }
}

fn session_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SESSION_FILENAME)
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}
