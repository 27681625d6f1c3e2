//! init command - initialise arbor in this repository

use anyhow::{Context as _, Result};

use crate::cli::commands::open_repo;
use crate::core::config::{Config, RepoConfig};
use crate::core::state::StateStore;
use crate::core::types::BranchName;
use crate::engine::bootstrap::detect_trunk;
use crate::engine::Context;
use crate::git::Vcs;
use crate::ui::output;

/// Initialise the store, recording the trunk.
///
/// With `--trunk` the named branch is used; otherwise configuration and
/// the repository's default branch decide. Re-running with the same trunk
/// is a no-op.
pub fn init(ctx: &Context, trunk: Option<&str>, remote: Option<String>) -> Result<()> {
    let git = open_repo(ctx)?;
    let common_dir = git.common_dir();
    let config = Config::load(Some(&common_dir)).context("failed to load configuration")?;

    let trunk = match trunk {
        Some(name) => BranchName::new(name).context("invalid trunk branch name")?,
        None => detect_trunk(&git, &config)?,
    };
    git.resolve(&trunk)
        .with_context(|| format!("trunk branch '{trunk}' does not exist"))?;

    let remote = remote.or_else(|| config.remote().map(String::from));
    let store = StateStore::init(&common_dir, &trunk, remote.clone(), config.lock_timeout())?;

    // Record the choice in repo config so bootstrap agrees from now on.
    let repo_config = RepoConfig {
        trunk: Some(trunk.to_string()),
        remote,
        ..config.repo.unwrap_or_default()
    };
    Config::write_repo(&common_dir, &repo_config).context("failed to write repo config")?;

    output::print(
        format!("initialised arbor with trunk: {}", store.trunk()),
        ctx.verbosity(),
    );
    Ok(())
}
