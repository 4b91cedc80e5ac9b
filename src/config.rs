//! Settings loaded from an optional TOML file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::{Arbiter, Pacing};

/// Runtime settings; every field has a default so any subset may be given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// UCI engine binary, looked up on `PATH` if not absolute
    pub engine_path: PathBuf,
    /// Directory holding `whiteOpenings.json` and `blackOpenings.json`
    pub data_dir: PathBuf,
    /// Directory of stored PGN game records
    pub records_dir: PathBuf,
    pub achievements_path: PathBuf,
    pub weak_depth: u32,
    pub strong_depth: u32,
    pub human_reply_delay_ms: u64,
    pub ai_first_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine_path: PathBuf::from("stockfish"),
            data_dir: PathBuf::from("data"),
            records_dir: PathBuf::from("data/pgns"),
            achievements_path: PathBuf::from("achievements.json"),
            weak_depth: 5,
            strong_depth: 20,
            human_reply_delay_ms: 250,
            ai_first_delay_ms: 300,
        }
    }
}

impl Settings {
    pub fn from_toml(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(path, &text)
    }

    /// Defaults when no file is given
    pub fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn arbiter(&self) -> Arbiter {
        Arbiter::new(self.weak_depth, self.strong_depth)
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            human_reply_delay: Duration::from_millis(self.human_reply_delay_ms),
            ai_first_delay: Duration::from_millis(self.ai_first_delay_ms),
        }
    }
}
