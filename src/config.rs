//! Workspace configuration.
//!
//! `.teamboard.toml` in the data directory tunes board projection limits and
//! the default operator identity. A missing or unreadable file falls back to
//! defaults; a present-but-invalid file is an error so typos don't silently
//! disable settings.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CONFIG_FILE: &str = ".teamboard.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub store: StoreConfig,
    pub board: BoardConfig,
    pub user: UserConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Override for the collection directory. Relative paths resolve
    /// against the directory the config file was loaded from.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    /// Cap on the due-soon strip.
    pub due_soon_limit: usize,
    /// Cap on the upcoming-events strip.
    pub upcoming_limit: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            due_soon_limit: 5,
            upcoming_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UserConfig {
    /// Operator id used when neither `--user` nor `TEAMBOARD_USER` is set.
    pub default: Option<String>,
}

impl Config {
    /// Load `.teamboard.toml` from `dir`. Missing file means defaults.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => return Err(Error::Io(err)),
        };
        toml::from_str(&raw).map_err(|err| Error::InvalidConfig(format!("{}: {err}", path.display())))
    }

    pub fn save_to_dir(&self, dir: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self)?;
        fs::write(dir.join(CONFIG_FILE), raw)?;
        Ok(())
    }
}

/// Default data directory when `--dir` and config leave it unset.
pub fn default_data_dir() -> Result<PathBuf> {
    directories::ProjectDirs::from("", "", "teamboard")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| Error::InvalidConfig("cannot determine a data directory".to_string()))
}
