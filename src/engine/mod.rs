//! engine
//!
//! Orchestration of restacks, re-parents, downstack edits, and lifecycle
//! cascades over the store and the version-control adapter.
//!
//! # Architecture
//!
//! Engine functions take `(store, vcs, ctx)` explicitly: the open store is
//! the mutation licence (it holds the repository lock), the adapter is a
//! trait object so tests run against [`crate::git::mock::MockVcs`], and the
//! context carries verbosity plus the cancellation token.
//!
//! Every mutation is a sequence of discrete atomic steps: an adapter call,
//! then a store batch. Failures and cancellation abort *between* steps, so
//! completed steps stay committed and the store never holds a half-applied
//! batch.

pub mod bootstrap;
pub mod edit;
pub mod lifecycle;
pub mod onto;
pub mod restack;

use std::path::PathBuf;

use thiserror::Error;

use crate::core::ops::CancelToken;
use crate::core::state::StoreError;
use crate::core::types::BranchName;
use crate::git::GitError;
use crate::stack::StackError;
use crate::ui::output::Verbosity;

/// Execution context shared by all engine operations.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Directory to operate in (`None` = process cwd).
    pub cwd: Option<PathBuf>,
    /// Minimal output.
    pub quiet: bool,
    /// Verbose diagnostics.
    pub debug: bool,
    /// Whether prompting the user is allowed.
    pub interactive: bool,
    /// Cooperative cancellation flag.
    pub cancel: CancelToken,
}

impl Context {
    /// Output verbosity derived from the flags.
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }

    /// Fail with [`EngineError::Cancelled`] once cancellation is requested.
    ///
    /// Called at every suspension point; never inside an atomic step.
    pub fn ensure_live(&self) -> Result<(), EngineError> {
        if self.cancel.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Errors from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The named branch has no record in the store.
    #[error("branch '{0}' is not tracked")]
    UnknownBranch(String),

    /// The operation is illegal for the trunk.
    #[error("'{0}' is the trunk; the operation needs a tracked branch")]
    TrunkNotTracked(String),

    /// A rebase stopped on conflicts.
    ///
    /// The worktree is left mid-rebase for the user to resolve; the store
    /// was not updated for this branch, so re-running the operation after
    /// resolution finalises it.
    #[error(
        "conflict while rebasing '{branch}' onto '{base}'; \
         resolve the rebase, then re-run to finalise"
    )]
    Conflict {
        branch: BranchName,
        base: BranchName,
    },

    /// A re-parent target sits in the branch's own upstack.
    #[error("moving '{branch}' onto '{onto}' would create a cycle")]
    WouldCycle {
        branch: BranchName,
        onto: BranchName,
    },

    /// The edited downstack document failed validation.
    #[error("invalid edit: {0}")]
    InvalidEdit(String),

    /// The editor exited unsuccessfully.
    #[error("editor exited with status {code}")]
    EditorFailed { code: i32 },

    /// No trunk could be determined during bootstrap.
    #[error("could not determine the trunk branch; run 'arbor init --trunk <name>'")]
    TrunkUndetermined,

    /// Cancellation was requested.
    #[error("operation cancelled")]
    Cancelled,

    /// Store failure (including `StoreBusy`).
    #[error(transparent)]
    Store(StoreError),

    /// Adapter failure.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Filesystem failure outside the store (editor document, etc.).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A broken invariant; always a bug, surfaced loudly.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether this is the conflict-awaiting-user outcome (CLI exit 2).
    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Conflict { .. })
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownBranch(name) => EngineError::UnknownBranch(name),
            other => EngineError::Store(other),
        }
    }
}

impl From<StackError> for EngineError {
    fn from(err: StackError) -> Self {
        match err {
            StackError::UnknownBranch(name) => EngineError::UnknownBranch(name),
            StackError::TrunkNotTracked(name) => EngineError::TrunkNotTracked(name),
            StackError::Type(e) => EngineError::Internal(e.to_string()),
        }
    }
}
