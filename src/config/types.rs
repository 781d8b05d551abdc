//! Configuration types.

use crate::engine::{ActivityClock, WaitOptions};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which [`TaskStore`](crate::store::TaskStore) implementation backs the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// One JSON file per record under `data_dir`.
    #[default]
    File,
    /// A single SQLite database at `data_dir/db_file`.
    Sqlite,
}

impl StoreBackend {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "file" => Some(StoreBackend::File),
            "sqlite" => Some(StoreBackend::Sqlite),
            _ => None,
        }
    }
}

/// Storage location and backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Root directory for task data (default: `hive-data`).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Database file name, relative to `data_dir` (default: `hive.db`).
    #[serde(default = "default_db_file")]
    pub db_file: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            data_dir: default_data_dir(),
            db_file: default_db_file(),
        }
    }
}

impl StoreConfig {
    /// Full path of the SQLite database.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("hive-data")
}

fn default_db_file() -> PathBuf {
    PathBuf::from("hive.db")
}

/// Staleness reaper settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaperConfig {
    /// Fallback limit for tasks without their own deadline (default: 60).
    #[serde(default = "default_threshold_minutes")]
    pub threshold_minutes: u32,

    /// Timestamp the idle period is measured from.
    #[serde(default)]
    pub activity: ActivityClock,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            threshold_minutes: default_threshold_minutes(),
            activity: ActivityClock::default(),
        }
    }
}

fn default_threshold_minutes() -> u32 {
    60
}

/// Polling schedule for `wait`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaiterConfig {
    #[serde(default = "default_start_interval_secs")]
    pub start_interval_secs: u64,

    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: u64,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            start_interval_secs: default_start_interval_secs(),
            max_interval_secs: default_max_interval_secs(),
        }
    }
}

impl WaiterConfig {
    /// Waiter options with this schedule and the given deadline.
    pub fn options(&self, deadline: Option<DateTime<Utc>>) -> WaitOptions {
        WaitOptions {
            deadline,
            start_interval: Duration::from_secs(self.start_interval_secs.max(1)),
            max_interval: Duration::from_secs(self.max_interval_secs.max(self.start_interval_secs).max(1)),
        }
    }
}

fn default_start_interval_secs() -> u64 {
    5
}

fn default_max_interval_secs() -> u64 {
    30
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    /// Identity recorded in log entries when no agent is given.
    #[serde(default = "default_agent")]
    pub agent: String,

    /// Default `deadline_minutes` per task type. Unlisted types get 0.
    #[serde(default = "default_deadlines")]
    pub deadlines: BTreeMap<String, u32>,

    #[serde(default)]
    pub reaper: ReaperConfig,

    #[serde(default)]
    pub waiter: WaiterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            agent: default_agent(),
            deadlines: default_deadlines(),
            reaper: ReaperConfig::default(),
            waiter: WaiterConfig::default(),
        }
    }
}

fn default_agent() -> String {
    "hive-cli".to_string()
}

fn default_deadlines() -> BTreeMap<String, u32> {
    BTreeMap::from([("research".to_string(), 30), ("dev".to_string(), 0)])
}

impl Config {
    /// Load a single YAML file, filling missing fields with defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Default deadline for a task type.
    pub fn deadline_for(&self, task_type: &str) -> u32 {
        self.deadlines.get(task_type).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.store.db_path(), PathBuf::from("hive-data").join("hive.db"));
        assert_eq!(config.agent, "hive-cli");
        assert_eq!(config.reaper.threshold_minutes, 60);
        assert_eq!(config.reaper.activity, ActivityClock::LastActivity);
        assert_eq!(config.deadline_for("research"), 30);
        assert_eq!(config.deadline_for("dev"), 0);
        assert_eq!(config.deadline_for("ops"), 0);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config: Config = serde_yaml::from_str(
            "store:\n  backend: sqlite\nreaper:\n  activity: claimed_at\n",
        )
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.data_dir, PathBuf::from("hive-data"));
        assert_eq!(config.reaper.activity, ActivityClock::ClaimedAt);
        assert_eq!(config.reaper.threshold_minutes, 60);
        assert_eq!(config.deadline_for("research"), 30);
    }

    #[test]
    fn waiter_options_never_shrink_below_start() {
        let waiter = WaiterConfig {
            start_interval_secs: 10,
            max_interval_secs: 3,
        };
        let options = waiter.options(None);
        assert_eq!(options.start_interval, Duration::from_secs(10));
        assert_eq!(options.max_interval, Duration::from_secs(10));
    }
}
