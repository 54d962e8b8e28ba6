//! User configuration, read from `~/.taskdeck/config.toml`.
//!
//! Every field is optional. A missing file means defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskError};
use crate::fields::{SortDirection, SortKey};
use crate::lifecycle::InvariantPolicy;
use crate::query::SortState;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Store file. Defaults to `tasks.json` next to the config file.
    pub db_path: Option<PathBuf>,
    /// Owner of the tasks. Defaults to `$USER`.
    pub user: Option<String>,
    /// `tracing` filter directive used when `TASKDECK_LOG` is unset.
    pub log_level: Option<String>,
    /// Fail on impossible sub-task counts instead of clamping them.
    pub strict_invariants: bool,
    pub list: ListConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ListConfig {
    pub sort: SortKey,
    pub direction: SortDirection,
}

impl Config {
    pub fn invariant_policy(&self) -> InvariantPolicy {
        if self.strict_invariants {
            InvariantPolicy::Strict
        } else {
            InvariantPolicy::Clamp
        }
    }

    pub fn default_sort(&self) -> SortState {
        SortState::new(self.list.sort, self.list.direction)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("warn")
    }

    pub fn user(&self) -> String {
        self.user
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "local".to_string())
    }

    pub fn db_path(&self, data_dir: &Path) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| data_dir.join("tasks.json"))
    }
}

/// `~/.taskdeck`, or `./.taskdeck` when there is no home directory.
pub fn data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".taskdeck")
}

pub fn default_config_path() -> PathBuf {
    data_dir().join("config.toml")
}

pub fn load_from_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| TaskError::Config(format!("failed to read {}: {e}", path.display())))?;
    toml::from_str(&raw).map_err(|e| TaskError::Config(format!("invalid TOML in {}: {e}", path.display())))
}
