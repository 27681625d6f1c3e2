//! ui::output
//!
//! Output formatting that respects the quiet flag.

use std::fmt::Display;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Minimal output.
    Quiet,
    /// Standard output.
    #[default]
    Normal,
    /// Verbose diagnostics.
    Debug,
}

impl Verbosity {
    /// Derive verbosity from CLI flags; quiet wins.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print an informational line (suppressed in quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{message}");
    }
}

/// Print a debug line to stderr (debug mode only).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {message}");
    }
}

/// Print a warning to stderr (suppressed in quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {message}");
    }
}

/// Print an error to stderr (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {message}");
}
