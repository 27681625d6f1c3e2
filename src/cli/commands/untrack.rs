//! untrack command - forget a branch, keeping its children stacked

use anyhow::{Context as _, Result};

use crate::cli::commands::{named_or_current, open_repo};
use crate::core::config::Config;
use crate::engine::bootstrap::ensure_store;
use crate::engine::{lifecycle, Context};

/// Remove a branch's record; children inherit its base.
pub fn untrack(ctx: &Context, branch: Option<&str>) -> Result<()> {
    let git = open_repo(ctx)?;
    let config = Config::load(Some(&git.common_dir())).context("failed to load configuration")?;
    let mut store = ensure_store(&git.common_dir(), &git, &config)?;

    let branch = named_or_current(&git, branch)?;
    lifecycle::untrack_branch(&mut store, ctx, &branch)?;
    Ok(())
}
