//! engine::bootstrap
//!
//! Trunk resolution and store bootstrap.
//!
//! Every command funnels through [`ensure_store`]: open the store if it
//! exists, otherwise detect the trunk and initialise one. Bootstrap is
//! idempotent: a second call finds the store and returns it.
//!
//! Trunk detection order:
//! 1. `trunk` from configuration (repo scope, then global)
//! 2. The adapter's default-branch heuristic (`origin/HEAD`, then
//!    well-known names)

use std::path::Path;

use crate::core::config::Config;
use crate::core::state::StateStore;
use crate::core::types::BranchName;
use crate::git::Vcs;

use super::EngineError;

/// Open the store, initialising it on first use.
///
/// # Errors
///
/// - [`EngineError::TrunkUndetermined`] when no store exists and neither
///   configuration nor the repository suggests a trunk
/// - [`EngineError::Store`] for lock contention and store corruption
pub fn ensure_store(
    common_dir: &Path,
    vcs: &dyn Vcs,
    config: &Config,
) -> Result<StateStore, EngineError> {
    use crate::core::state::StoreError;

    match StateStore::open(common_dir, config.lock_timeout()) {
        Ok(store) => Ok(store),
        Err(StoreError::NotInitialised) => {
            let trunk = detect_trunk(vcs, config)?;
            // The trunk must actually exist before it is recorded.
            vcs.resolve(&trunk)?;
            let remote = config.remote().map(String::from);
            Ok(StateStore::init(
                common_dir,
                &trunk,
                remote,
                config.lock_timeout(),
            )?)
        }
        Err(other) => Err(other.into()),
    }
}

/// Pick the trunk: configuration first, then the adapter heuristic.
pub fn detect_trunk(vcs: &dyn Vcs, config: &Config) -> Result<BranchName, EngineError> {
    if let Some(name) = config.trunk() {
        return BranchName::new(name).map_err(|e| EngineError::Internal(e.to_string()));
    }
    match vcs.default_branch()? {
        Some(branch) => Ok(branch),
        None => Err(EngineError::TrunkUndetermined),
    }
}
