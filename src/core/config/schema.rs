//! core::config::schema
//!
//! Configuration file schemas.
//!
//! Both scopes share the same keys; the repo scope overrides the global
//! one. Unknown keys are rejected so typos surface instead of silently
//! doing nothing.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// User-level configuration (`~/.arbor/config.toml` and friends).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default trunk branch name for newly initialised repositories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trunk: Option<String>,

    /// Default remote name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,

    /// Store lock timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_timeout_secs: Option<u64>,

    /// Editor command for downstack edits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,
}

impl GlobalConfig {
    /// Validate field values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_common(self.trunk.as_deref(), self.lock_timeout_secs)
    }
}

/// Repository-level configuration (`.git/arbor/config.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RepoConfig {
    /// Trunk branch for this repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trunk: Option<String>,

    /// Remote for this repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,

    /// Store lock timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_timeout_secs: Option<u64>,

    /// Editor command for downstack edits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,
}

impl RepoConfig {
    /// Validate field values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_common(self.trunk.as_deref(), self.lock_timeout_secs)
    }
}

fn validate_common(trunk: Option<&str>, lock_timeout_secs: Option<u64>) -> Result<(), ConfigError> {
    if let Some(name) = trunk {
        BranchName::new(name)
            .map_err(|e| ConfigError::InvalidValue(format!("trunk: {e}")))?;
    }
    if lock_timeout_secs == Some(0) {
        return Err(ConfigError::InvalidValue(
            "lock_timeout_secs must be positive".into(),
        ));
    }
    Ok(())
}
