//! core::ops
//!
//! Operation primitives: locking and cancellation.
//!
//! # Architecture
//!
//! Every mutating operation:
//! 1. Acquires the exclusive store lock (which doubles as the worktree lock)
//! 2. Performs adapter calls and store updates as discrete atomic steps
//! 3. Checks the cancellation token between steps, never inside them
//!
//! The lock is held by the open store for its whole lifetime, so "store
//! open" and "allowed to touch the worktree" are the same capability.

pub mod cancel;
pub mod lock;

pub use cancel::CancelToken;
pub use lock::{LockError, StoreLock, DEFAULT_LOCK_TIMEOUT};
