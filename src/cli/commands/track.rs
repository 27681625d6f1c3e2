//! track command - start tracking a branch

use anyhow::{Context as _, Result};

use crate::cli::commands::{named_or_current, open_repo};
use crate::core::config::Config;
use crate::core::types::BranchName;
use crate::engine::bootstrap::ensure_store;
use crate::engine::{lifecycle, Context};

/// Track a branch on a base (trunk when no base is named).
pub fn track(ctx: &Context, branch: Option<&str>, base: Option<&str>) -> Result<()> {
    let git = open_repo(ctx)?;
    let config = Config::load(Some(&git.common_dir())).context("failed to load configuration")?;
    let mut store = ensure_store(&git.common_dir(), &git, &config)?;

    let branch = named_or_current(&git, branch)?;
    let base = match base {
        Some(name) => BranchName::new(name)?,
        None => store.trunk().clone(),
    };

    lifecycle::track_branch(&mut store, &git, ctx, &branch, &base)?;
    Ok(())
}
