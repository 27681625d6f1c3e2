//! engine::restack
//!
//! The restack engine: align branches on their recorded bases.
//!
//! # Contract
//!
//! `restack(b)` brings `b`'s history so that its first commit's parent is
//! the current tip of its recorded base, without touching commits reachable
//! only via `b`. The store's `base.hash` advances to the base's tip only
//! after the rebase completes; a conflict leaves the store untouched so a
//! re-run after resolution finalises the record.
//!
//! `restack_upstack(b)` propagates through the dependent subtree in
//! pre-order. That ordering is load-bearing: each child's recorded base
//! hash must match the freshly updated parent tip by the time the child's
//! turn comes, so parents always go first and the traversal is strictly
//! sequential.

use crate::core::state::{StateStore, StateUpdate};
use crate::core::types::{BranchName, Oid};
use crate::git::{RebaseStatus, Vcs};
use crate::stack::StackService;
use crate::ui::output;

use super::{Context, EngineError};

/// Result of a single-branch restack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestackOutcome {
    /// The branch was rebased; its base hash now equals `new_base`.
    Restacked { new_base: Oid },
    /// The branch already sat on its base's current tip.
    ///
    /// A sentinel, not a failure: upstack traversal continues past it.
    AlreadyRestacked,
}

/// Summary of an upstack traversal.
#[derive(Debug, Default)]
pub struct UpstackSummary {
    /// Branches rebased, in traversal order.
    pub restacked: Vec<BranchName>,
    /// Branches that needed nothing.
    pub already_aligned: usize,
}

/// Restack a single branch onto its recorded base.
///
/// # Errors
///
/// - [`EngineError::TrunkNotTracked`] for the trunk itself
/// - [`EngineError::UnknownBranch`] for untracked branches
/// - [`EngineError::Conflict`] when the rebase stops on conflicts; the
///   worktree stays mid-rebase and the store is not updated
pub fn restack(
    store: &mut StateStore,
    vcs: &dyn Vcs,
    ctx: &Context,
    branch: &BranchName,
) -> Result<RestackOutcome, EngineError> {
    if branch == store.trunk() {
        return Err(EngineError::TrunkNotTracked(branch.to_string()));
    }
    let record = store.get(branch)?.clone();
    let base = record
        .base_name()
        .map_err(|e| EngineError::Internal(e.to_string()))?;
    let recorded_hash = record
        .base_hash()
        .map_err(|e| EngineError::Internal(e.to_string()))?;

    ctx.ensure_live()?;
    let base_tip = vcs.resolve(&base)?;
    let fork_point = vcs.merge_base(branch, &base)?;
    ctx.ensure_live()?;

    if fork_point.as_ref() == Some(&base_tip) {
        // Already sitting on the base's current tip. If the recorded hash
        // lags (off-tool rebase, or a conflicted restack the user finished
        // by hand), refresh it silently.
        if recorded_hash != base_tip {
            store.upsert([StateUpdate::Set(
                branch.clone(),
                record.rebased(&base, &base_tip),
            )])?;
        }
        return Ok(RestackOutcome::AlreadyRestacked);
    }

    // The upstream is the *recorded* base hash: exactly the commits unique
    // to this branch get replayed, even if the base moved long ago.
    let status = vcs.rebase_onto(branch, &recorded_hash, &base)?;
    ctx.ensure_live()?;
    match status {
        RebaseStatus::Completed { .. } => {
            store.upsert([StateUpdate::Set(
                branch.clone(),
                record.rebased(&base, &base_tip),
            )])?;
            Ok(RestackOutcome::Restacked { new_base: base_tip })
        }
        RebaseStatus::Conflict { .. } => Err(EngineError::Conflict {
            branch: branch.clone(),
            base,
        }),
    }
}

/// Restack a branch and everything stacked on top of it.
///
/// Traverses the upstack in pre-order, skipping the trunk. On success the
/// originally checked-out branch is restored. A conflict aborts the
/// traversal; branches already restacked stay restacked, because each one
/// committed its own store update.
pub fn restack_upstack(
    store: &mut StateStore,
    vcs: &dyn Vcs,
    ctx: &Context,
    branch: &BranchName,
) -> Result<UpstackSummary, EngineError> {
    let upstack = StackService::new(store)?.list_upstack(branch)?;
    ctx.ensure_live()?;
    let original = vcs.current_branch()?;

    let mut summary = UpstackSummary::default();
    for candidate in &upstack {
        ctx.ensure_live()?;
        if candidate == store.trunk() {
            // Trunk never needs to be restacked.
            continue;
        }
        match restack(store, vcs, ctx, candidate)? {
            RestackOutcome::Restacked { new_base } => {
                output::print(
                    format!("{candidate}: restacked on {}", new_base.short(7)),
                    ctx.verbosity(),
                );
                summary.restacked.push(candidate.clone());
            }
            RestackOutcome::AlreadyRestacked => {
                // Silent for the originating branch, informational for the
                // rest of the subtree.
                if candidate != branch {
                    output::print(
                        format!("{candidate}: branch does not need to be restacked"),
                        ctx.verbosity(),
                    );
                }
                summary.already_aligned += 1;
            }
        }
    }

    if let Some(original) = original {
        ctx.ensure_live()?;
        vcs.checkout(&original)?;
    }
    Ok(summary)
}
