//! trunk command - print or check out the trunk branch

use anyhow::{Context as _, Result};

use crate::cli::commands::open_repo;
use crate::core::state::StateStore;
use crate::core::types::BranchName;
use crate::engine::Context;
use crate::git::Vcs;
use crate::ui::output;

/// Print the trunk, or check it out with `--checkout`.
pub fn trunk(ctx: &Context, checkout: bool) -> Result<()> {
    let git = open_repo(ctx)?;
    // Printing needs no lock; a snapshot read suffices.
    let state = StateStore::read_snapshot(&git.common_dir())?;
    let trunk = BranchName::new(state.trunk.name).context("store holds an invalid trunk name")?;

    if checkout {
        git.checkout(&trunk)?;
        output::print(format!("switched to trunk '{trunk}'"), ctx.verbosity());
    } else {
        println!("{trunk}");
    }
    Ok(())
}
