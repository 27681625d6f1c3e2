//! git
//!
//! The version-control adapter: the single doorway to the repository.
//!
//! # Architecture
//!
//! The engine consumes exactly the [`Vcs`] trait below: a deliberately
//! narrow surface (resolve, checkout, rebase-onto, commit listing,
//! merge-base, branch deletion, plus the default-branch probe used by
//! bootstrap). No other module touches `git2` or shells out to `git`.
//!
//! The adapter is pure with respect to the store: it never reads or writes
//! branch records, and no call is assumed atomic with any other.
//!
//! A rebase that stops on conflicts is a normal terminal state, not an
//! error: [`Vcs::rebase_onto`] returns [`RebaseStatus::Conflict`] and the
//! caller decides what to persist. Only genuinely unexpected failures
//! surface as [`GitError`].

pub mod mock;
mod repo;

pub use repo::GitRepo;

use std::path::PathBuf;

use thiserror::Error;

use crate::core::types::{BranchName, Oid, TypeError};

/// Errors from adapter operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo { path: PathBuf },

    /// Repository has no working directory.
    #[error("bare repository not supported")]
    BareRepo,

    /// A named branch does not exist in the repository.
    #[error("branch not found: {branch}")]
    BranchNotFound { branch: String },

    /// The working tree blocks the requested operation.
    #[error("working tree is dirty: {details}")]
    DirtyWorktree { details: String },

    /// A rebase/merge/etc. is already underway.
    #[error("{operation} in progress; resolve or abort it first")]
    OperationInProgress { operation: GitState },

    /// Refusing to delete a branch that is not fully merged.
    #[error("branch '{branch}' is not fully merged; use force to delete anyway")]
    NotMerged { branch: String },

    /// A value produced by git failed validation.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Underlying git failure with no more specific category.
    #[error("git error: {message}")]
    Internal { message: String },
}

/// Outcome of a rebase: completion, or a conflict awaiting the user.
///
/// Conflict is a *state*: the worktree is intentionally left mid-rebase so
/// the user can resolve and continue with stock git. Callers must not
/// persist anything for the conflicted branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseStatus {
    /// The branch now sits on the new base; `new_tip` is its rewritten tip.
    Completed { new_tip: Oid },
    /// The rebase stopped on conflicts; the worktree is resumable.
    Conflict { state: GitState },
}

/// In-progress operation state of the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitState {
    /// No operation in progress.
    Clean,
    /// Rebase stopped (conflicts or interactive edit).
    Rebase,
    /// Merge in progress.
    Merge,
    /// Cherry-pick in progress.
    CherryPick,
    /// Revert in progress.
    Revert,
    /// Bisect in progress.
    Bisect,
}

impl GitState {
    /// Whether any operation is in progress.
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, GitState::Clean)
    }

    /// Human-readable label.
    pub fn description(&self) -> &'static str {
        match self {
            GitState::Clean => "clean",
            GitState::Rebase => "rebase",
            GitState::Merge => "merge",
            GitState::CherryPick => "cherry-pick",
            GitState::Revert => "revert",
            GitState::Bisect => "bisect",
        }
    }
}

impl std::fmt::Display for GitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// The narrow version-control interface the engine runs against.
///
/// Implementations: [`GitRepo`] for real repositories, [`mock::MockVcs`]
/// for deterministic tests.
pub trait Vcs {
    /// Resolve a branch name to its tip commit.
    fn resolve(&self, branch: &BranchName) -> Result<Oid, GitError>;

    /// The currently checked-out branch, or `None` on a detached HEAD.
    fn current_branch(&self) -> Result<Option<BranchName>, GitError>;

    /// Check out a branch.
    fn checkout(&self, branch: &BranchName) -> Result<(), GitError>;

    /// Commits reachable from `to`'s tip but not from `from`, oldest first.
    fn commits_between(&self, from: &Oid, to: &BranchName) -> Result<Vec<Oid>, GitError>;

    /// Replay the commits of `branch` that are not reachable from
    /// `upstream` onto the current tip of `new_base`.
    ///
    /// On conflict the worktree is left in a resumable mid-rebase state and
    /// `RebaseStatus::Conflict` is returned; nothing else about the
    /// repository is rolled back.
    fn rebase_onto(
        &self,
        branch: &BranchName,
        upstream: &Oid,
        new_base: &BranchName,
    ) -> Result<RebaseStatus, GitError>;

    /// Delete a local branch. Without `force`, unmerged branches are
    /// refused with [`GitError::NotMerged`].
    fn delete_branch(&self, branch: &BranchName, force: bool) -> Result<(), GitError>;

    /// The best common ancestor of two branches, or `None` when histories
    /// are unrelated.
    fn merge_base(&self, a: &BranchName, b: &BranchName) -> Result<Option<Oid>, GitError>;

    /// The repository's default branch, if one can be determined.
    ///
    /// Used only by bootstrap's trunk heuristic.
    fn default_branch(&self) -> Result<Option<BranchName>, GitError>;
}
