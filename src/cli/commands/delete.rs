//! delete command - delete a branch, cascading children onto its base

use std::io::{self, Write as _};

use anyhow::{bail, Context as _, Result};

use crate::cli::commands::{named_or_current, open_repo};
use crate::core::config::Config;
use crate::engine::bootstrap::ensure_store;
use crate::engine::{lifecycle, Context};
use crate::stack::StackService;

/// Delete a tracked branch and its record.
pub fn delete(ctx: &Context, branch: Option<&str>, force: bool) -> Result<()> {
    let git = open_repo(ctx)?;
    let config = Config::load(Some(&git.common_dir())).context("failed to load configuration")?;
    let mut store = ensure_store(&git.common_dir(), &git, &config)?;

    let branch = named_or_current(&git, branch)?;

    if !force && ctx.interactive {
        let children = StackService::new(&store)?.list_above(&branch)?;
        if children.is_empty() {
            print!("delete branch '{branch}'? [y/N] ");
        } else {
            print!(
                "delete branch '{branch}' and re-parent {} child(ren)? [y/N] ",
                children.len()
            );
        }
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            bail!("aborted");
        }
    }

    lifecycle::delete_branch(&mut store, &git, ctx, &branch, force)?;
    Ok(())
}
