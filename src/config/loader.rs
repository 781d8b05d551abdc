//! Configuration loader with tier-based merging.

use super::merge::deep_merge_all;
use super::types::{Config, StoreBackend};
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CONFIG_FILE: &str = "config.yaml";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    Defaults = 0,
    /// `./hive/config.yaml`
    Project = 1,
    /// `~/.hive/config.yaml`
    User = 2,
    /// `--config` or `HIVE_CONFIG_PATH`
    Explicit = 3,
    Environment = 4,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Explicit => write!(f, "explicit"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Where each file tier is looked up.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    pub project_dir: Option<PathBuf>,
    pub user_dir: Option<PathBuf>,
    pub explicit_file: Option<PathBuf>,
}

impl ConfigPaths {
    /// Standard locations, with `explicit` taking precedence over `HIVE_CONFIG_PATH`.
    pub fn discover(explicit: Option<PathBuf>) -> Self {
        let explicit_file =
            explicit.or_else(|| std::env::var("HIVE_CONFIG_PATH").ok().map(PathBuf::from));
        Self {
            project_dir: Some(PathBuf::from("hive")),
            user_dir: dirs::home_dir().map(|h| h.join(".hive")),
            explicit_file,
        }
    }

    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
            explicit_file: None,
        }
    }
}

/// Loads and merges every configuration tier.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Files that contributed, lowest tier first.
    sources: Vec<(ConfigTier, PathBuf)>,
}

impl ConfigLoader {
    /// Load from the standard locations and the process environment.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self> {
        Self::load_with(ConfigPaths::discover(explicit), |key| std::env::var(key).ok())
    }

    /// Load from explicit paths, reading environment overrides through `env`.
    pub fn load_with<E>(paths: ConfigPaths, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let mut tiers: Vec<Value> = Vec::new();
        let mut sources = Vec::new();

        tiers.push(serde_json::to_value(Config::default())?);

        let discovered = [
            (ConfigTier::Project, paths.project_dir.as_deref()),
            (ConfigTier::User, paths.user_dir.as_deref()),
        ];
        for (tier, dir) in discovered {
            let Some(file) = dir.map(|d| d.join(CONFIG_FILE)) else {
                continue;
            };
            if !file.exists() {
                continue;
            }
            // A broken file in a discovered location is skipped, not fatal.
            match read_yaml(&file) {
                Ok(value) => {
                    tiers.push(value);
                    sources.push((tier, file));
                }
                Err(e) => warn!(tier = %tier, error = %e, "Ignoring unreadable config file"),
            }
        }

        // An explicitly named file must load.
        if let Some(ref file) = paths.explicit_file {
            tiers.push(read_yaml(file)?);
            sources.push((ConfigTier::Explicit, file.clone()));
        }

        let merged = deep_merge_all(tiers);
        let mut config: Config =
            serde_json::from_value(merged).context("Invalid configuration")?;

        Self::apply_env_overrides(&mut config, env);

        debug!(sources = sources.len(), "Loaded configuration");
        Ok(Self {
            paths,
            config,
            sources,
        })
    }

    /// Apply `HIVE_*` environment variable overrides.
    fn apply_env_overrides<E>(config: &mut Config, env: E)
    where
        E: Fn(&str) -> Option<String>,
    {
        if let Some(data_dir) = env("HIVE_DATA_DIR") {
            config.store.data_dir = PathBuf::from(data_dir);
        }

        if let Some(agent) = env("HIVE_AGENT") {
            if !agent.trim().is_empty() {
                config.agent = agent;
            }
        }

        if let Some(minutes) = env("HIVE_STALE_MINUTES") {
            match minutes.trim().parse::<u32>() {
                Ok(m) => config.reaper.threshold_minutes = m,
                Err(_) => warn!(value = %minutes, "Ignoring invalid HIVE_STALE_MINUTES"),
            }
        }

        if let Some(backend) = env("HIVE_STORE") {
            match StoreBackend::from_str(backend.trim()) {
                Some(b) => config.store.backend = b,
                None => warn!(value = %backend, "Ignoring unknown HIVE_STORE backend"),
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    /// Config files that were merged, lowest tier first.
    pub fn sources(&self) -> &[(ConfigTier, PathBuf)] {
        &self.sources
    }
}

fn read_yaml(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let value: Value = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(value)
}
