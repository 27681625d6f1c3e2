//! restack command - align branches on their recorded bases

use anyhow::{Context as _, Result};

use crate::cli::commands::{named_or_current, open_repo};
use crate::core::config::Config;
use crate::engine::bootstrap::ensure_store;
use crate::engine::restack::{restack_upstack, RestackOutcome};
use crate::engine::Context;
use crate::ui::output;

/// Restack a branch and its upstack, or just the branch with `--only`.
pub fn restack(ctx: &Context, branch: Option<&str>, only: bool) -> Result<()> {
    let git = open_repo(ctx)?;
    let config = Config::load(Some(&git.common_dir())).context("failed to load configuration")?;
    let mut store = ensure_store(&git.common_dir(), &git, &config)?;

    let branch = named_or_current(&git, branch)?;

    if only {
        match crate::engine::restack::restack(&mut store, &git, ctx, &branch)? {
            RestackOutcome::Restacked { new_base } => output::print(
                format!("{branch}: restacked on {}", new_base.short(7)),
                ctx.verbosity(),
            ),
            RestackOutcome::AlreadyRestacked => output::print(
                format!("{branch} is already aligned"),
                ctx.verbosity(),
            ),
        }
        return Ok(());
    }

    let summary = restack_upstack(&mut store, &git, ctx, &branch)?;
    if summary.restacked.is_empty() {
        output::print("all branches are already aligned", ctx.verbosity());
    } else {
        output::print(
            format!("restack complete ({} branches)", summary.restacked.len()),
            ctx.verbosity(),
        );
    }
    Ok(())
}
