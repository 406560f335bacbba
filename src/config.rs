use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::adapters::ProcfsConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sys_path: PathBuf,
    pub proc_path: PathBuf,
    pub dev_path: PathBuf,
    pub udev_path: PathBuf,
    pub log_level: String,
    /// Seconds
    pub command_timeout: u64,
    pub max_concurrency: usize,
    /// Columns hidden unless `-x` says otherwise
    pub exclude: Vec<String>,
    /// Explicit smartctl binary; looked up on PATH when unset
    pub smartctl_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sys_path: PathBuf::from("/sys"),
            proc_path: PathBuf::from("/proc"),
            dev_path: PathBuf::from("/dev"),
            udev_path: PathBuf::from("/run/udev/data"),
            log_level: "warn".to_string(),
            command_timeout: 5,
            max_concurrency: 8,
            exclude: Vec::new(),
            smartctl_path: None,
        }
    }
}

impl Config {
    /// Defaults, then the file named by `STATBLK_CONFIG`, then `STATBLK_*` variables
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var_os("STATBLK_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from environment-style lookups; unparsable values are ignored
    fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(path) = lookup("STATBLK_SYS_PATH") {
            self.sys_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("STATBLK_PROC_PATH") {
            self.proc_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("STATBLK_DEV_PATH") {
            self.dev_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("STATBLK_UDEV_PATH") {
            self.udev_path = PathBuf::from(path);
        }
        if let Some(level) = lookup("STATBLK_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(secs) = lookup("STATBLK_COMMAND_TIMEOUT").and_then(|s| s.parse().ok()) {
            self.command_timeout = secs;
        }
        if let Some(max) = lookup("STATBLK_MAX_CONCURRENCY").and_then(|s| s.parse().ok()) {
            self.max_concurrency = max;
        }
        if let Some(path) = lookup("STATBLK_SMARTCTL") {
            self.smartctl_path = Some(PathBuf::from(path));
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout)
    }

    pub fn procfs_config(&self) -> ProcfsConfig {
        ProcfsConfig::new(&self.proc_path, &self.sys_path)
            .with_dev_path(&self.dev_path)
            .with_udev_path(&self.udev_path)
    }
}
