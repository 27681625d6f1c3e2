//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse arguments and global flags
//! - Build the engine context and dispatch to command handlers
//! - Never mutate the repository directly; everything flows through the
//!   engine

pub mod args;
pub mod commands;

pub use args::{Cli, Command};

use crate::engine::Context;
use anyhow::Result;

/// Run the CLI application. Entry point called from `main`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let ctx = Context {
        cwd: cli.cwd.clone(),
        quiet: cli.quiet,
        debug: cli.debug,
        interactive: cli.interactive(),
        cancel: Default::default(),
    };

    // Ctrl-C trips the token so long operations unwind between atomic
    // steps instead of dying mid-rebase.
    let _ = ctx.cancel.cancel_on_termination();

    commands::dispatch(cli.command, &ctx)
}
