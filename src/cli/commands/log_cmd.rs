//! log command - show the tracked branch forest

use anyhow::{Context as _, Result};

use crate::cli::commands::open_repo;
use crate::core::state::StateStore;
use crate::core::types::BranchName;
use crate::engine::Context;
use crate::git::{GitRepo, Vcs};
use crate::stack::StackService;
use crate::ui::output;

/// Print the forest rooted at trunk, one branch per line.
///
/// Each tracked branch shows how many commits it carries on top of its
/// recorded base, and whether it needs a restack. Runs off a lock-free
/// snapshot: log never blocks a writer.
pub fn log(ctx: &Context) -> Result<()> {
    let git = open_repo(ctx)?;
    let state = StateStore::read_snapshot(&git.common_dir())?;
    let service = StackService::from_state(&state).context("store state is inconsistent")?;

    for violation in service.validate() {
        output::warn(violation, ctx.verbosity());
    }

    let trunk = service.trunk().clone();
    let current = git.current_branch()?;

    for branch in service.list_upstack(&trunk)? {
        let marker = if Some(&branch) == current.as_ref() {
            "* "
        } else {
            "  "
        };
        if branch == trunk {
            println!("{marker}{branch}");
            continue;
        }

        let depth = service.list_downstack(&branch)?.len();
        let indent = "  ".repeat(depth);
        println!("{marker}{indent}{branch}{}", annotate(&git, &state, &branch)?);
    }
    Ok(())
}

/// Commit count and restack marker for one branch.
fn annotate(
    git: &GitRepo,
    state: &crate::core::state::StateV1,
    branch: &BranchName,
) -> Result<String> {
    let record = state
        .branches
        .get(branch.as_str())
        .context("branch vanished from snapshot")?;
    let base = record.base_name()?;
    let base_hash = record.base_hash()?;

    let ahead = match git.commits_between(&base_hash, branch) {
        Ok(commits) => commits.len(),
        // Recorded hash may be gone after external history edits.
        Err(_) => return Ok(" (base missing; needs restack)".to_string()),
    };

    let aligned = match git.resolve(&base) {
        Ok(tip) => tip == base_hash && git.merge_base(branch, &base)? == Some(base_hash),
        Err(_) => false,
    };

    let noun = if ahead == 1 { "commit" } else { "commits" };
    if aligned {
        Ok(format!(" ({ahead} {noun})"))
    } else {
        Ok(format!(" ({ahead} {noun}; needs restack)"))
    }
}
