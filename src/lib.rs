//! arbor - a stacked-branch workflow engine
//!
//! arbor keeps a forest of dependent branches consistent on top of a
//! shared trunk: each tracked branch records its base and the base's tip
//! at the last alignment, and the engine rebases the forest back into
//! shape as branches are rewritten, reordered, re-parented, or removed.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - argument parsing and thin command handlers
//! - [`engine`] - restack, re-parent, downstack edit, lifecycle cascades
//! - [`stack`] - pure traversals over the branch graph
//! - [`core`] - domain types, the persistent store, lock, config
//! - [`git`] - the narrow version-control adapter (trait + real + mock)
//! - [`ui`] - output helpers
//!
//! # Correctness Invariants
//!
//! 1. The store is the single source of truth for the branch graph; the
//!    repository is observed, never inferred into it
//! 2. Every store mutation is an atomic batch; partial states are never
//!    visible
//! 3. A parent is always restacked before any of its children
//! 4. A rebase conflict is a resumable state: the worktree keeps it, the
//!    store ignores it until resolved

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod stack;
pub mod ui;
