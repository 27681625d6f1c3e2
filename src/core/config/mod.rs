//! core::config
//!
//! Configuration loading with two scopes.
//!
//! # Precedence
//!
//! Later overrides earlier:
//! 1. Built-in defaults
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (handled by the CLI layer, not here)
//!
//! # Locations
//!
//! Global, searched in order:
//! 1. `$ARBOR_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/arbor/config.toml`
//! 3. `~/.arbor/config.toml` (canonical write location)
//!
//! Repo: `.git/arbor/config.toml`.

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::ops::lock::DEFAULT_LOCK_TIMEOUT;
use crate::core::paths::StatePaths;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Merged configuration with precedence applied by the accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global scope.
    pub global: GlobalConfig,
    /// Repo scope, when loaded inside a repository.
    pub repo: Option<RepoConfig>,
}

impl Config {
    /// Load configuration; `common_dir` enables the repo scope.
    ///
    /// Missing files are not an error; defaults apply. Present but
    /// unparseable or invalid files are.
    pub fn load(common_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let global = match global_config_path() {
            Some(path) if path.exists() => {
                let config: GlobalConfig = read_toml(&path)?;
                config.validate()?;
                config
            }
            _ => GlobalConfig::default(),
        };

        let repo = match common_dir {
            Some(dir) => {
                let path = StatePaths::new(dir).config_file();
                if path.exists() {
                    let config: RepoConfig = read_toml(&path)?;
                    config.validate()?;
                    Some(config)
                } else {
                    None
                }
            }
            None => None,
        };

        Ok(Self { global, repo })
    }

    /// Write the repo-scope config to its canonical location.
    pub fn write_repo(common_dir: &Path, config: &RepoConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let path = StatePaths::new(common_dir).config_file();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.clone(),
                source,
            })?;
        }
        let toml = toml::to_string_pretty(config).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        fs::write(&path, toml).map_err(|source| ConfigError::Write { path, source })
    }

    /// Configured trunk, repo scope first.
    pub fn trunk(&self) -> Option<&str> {
        self.repo
            .as_ref()
            .and_then(|r| r.trunk.as_deref())
            .or(self.global.trunk.as_deref())
    }

    /// Configured remote, repo scope first.
    pub fn remote(&self) -> Option<&str> {
        self.repo
            .as_ref()
            .and_then(|r| r.remote.as_deref())
            .or(self.global.remote.as_deref())
    }

    /// Store lock timeout with the built-in default applied.
    pub fn lock_timeout(&self) -> Duration {
        self.repo
            .as_ref()
            .and_then(|r| r.lock_timeout_secs)
            .or(self.global.lock_timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_LOCK_TIMEOUT)
    }

    /// Configured editor, repo scope first.
    pub fn editor(&self) -> Option<&str> {
        self.repo
            .as_ref()
            .and_then(|r| r.editor.as_deref())
            .or(self.global.editor.as_deref())
    }
}

/// Resolve the global config path without touching the filesystem beyond
/// environment lookups.
fn global_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("ARBOR_CONFIG") {
        return Some(PathBuf::from(path));
    }
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg).join("arbor/config.toml");
        if path.exists() {
            return Some(path);
        }
    }
    dirs::home_dir().map(|home| home.join(".arbor/config.toml"))
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
