//! onto command - re-parent a branch onto a new base

use anyhow::{Context as _, Result};

use crate::cli::commands::{named_or_current, open_repo};
use crate::core::config::Config;
use crate::core::types::BranchName;
use crate::engine::bootstrap::ensure_store;
use crate::engine::Context;
use crate::ui::output;

/// Move a branch (and its recorded commit range) onto a new base.
pub fn onto(ctx: &Context, target: &str, branch: Option<&str>) -> Result<()> {
    let git = open_repo(ctx)?;
    let config = Config::load(Some(&git.common_dir())).context("failed to load configuration")?;
    let mut store = ensure_store(&git.common_dir(), &git, &config)?;

    let branch = named_or_current(&git, branch)?;
    let target = BranchName::new(target)?;

    let new_hash = crate::engine::onto::onto(&mut store, &git, ctx, &branch, &target)?;
    output::print(
        format!("{branch}: now based on {target} at {}", new_hash.short(7)),
        ctx.verbosity(),
    );
    Ok(())
}
