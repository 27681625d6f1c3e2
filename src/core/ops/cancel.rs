//! core::ops::cancel
//!
//! Cooperative cancellation for long-running operations.
//!
//! The engine never interrupts an adapter call in flight; it checks the
//! token at suspension points (before and after each adapter call, and
//! before each upstack iteration) and unwinds between atomic steps. The
//! store therefore stays consistent under cancellation: every committed
//! per-branch update remains committed, nothing is half-applied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A clonable cancellation flag shared across the call tree.
///
/// Cloning is cheap; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. All clones observe this immediately.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Trip this token when the process receives SIGINT or SIGTERM.
    ///
    /// Registration lasts for the rest of the process. With the handler in
    /// place an interrupt unwinds between atomic steps instead of killing
    /// the process mid-operation, so the store stays consistent under
    /// Ctrl-C.
    pub fn cancel_on_termination(&self) -> std::io::Result<()> {
        signal_hook::flag::register(signal_hook::consts::SIGINT, self.flag.clone())?;
        signal_hook::flag::register(signal_hook::consts::SIGTERM, self.flag.clone())?;
        Ok(())
    }
}
