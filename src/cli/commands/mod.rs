//! cli::commands
//!
//! Command handlers: thin wrappers that open the repository, ensure the
//! store, and call into the engine.

mod delete;
mod edit;
mod init;
mod log_cmd;
mod onto;
mod restack;
mod track;
mod trunk;
mod untrack;

use anyhow::{Context as _, Result};

use crate::cli::args::Command;
use crate::core::types::BranchName;
use crate::engine::Context;
use crate::git::{GitRepo, Vcs};

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Init { trunk, remote } => init::init(ctx, trunk.as_deref(), remote),
        Command::Trunk { checkout } => trunk::trunk(ctx, checkout),
        Command::Track { branch, base } => {
            track::track(ctx, branch.as_deref(), base.as_deref())
        }
        Command::Untrack { branch } => untrack::untrack(ctx, branch.as_deref()),
        Command::Restack { branch, only } => restack::restack(ctx, branch.as_deref(), only),
        Command::Edit { branch, editor } => {
            edit::edit(ctx, branch.as_deref(), editor.as_deref())
        }
        Command::Onto { target, branch } => onto::onto(ctx, &target, branch.as_deref()),
        Command::Delete { branch, force } => delete::delete(ctx, branch.as_deref(), force),
        Command::Log => log_cmd::log(ctx),
    }
}

/// Open the repository from the context's working directory.
pub(crate) fn open_repo(ctx: &Context) -> Result<GitRepo> {
    let cwd = match &ctx.cwd {
        Some(cwd) => cwd.clone(),
        None => std::env::current_dir().context("cannot determine working directory")?,
    };
    GitRepo::open(&cwd).context("failed to open repository")
}

/// Resolve an optional branch argument, falling back to the checkout.
pub(crate) fn named_or_current(vcs: &dyn Vcs, name: Option<&str>) -> Result<BranchName> {
    match name {
        Some(name) => Ok(BranchName::new(name)?),
        None => vcs
            .current_branch()?
            .context("not on any branch; name one explicitly"),
    }
}
