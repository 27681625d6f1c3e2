//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! - `--cwd <path>`: run as if started in that directory
//! - `--debug`: verbose diagnostics
//! - `--quiet` / `-q`: minimal output, implies `--no-interactive`
//! - `--no-interactive`: never prompt

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// arbor - keep a stack of dependent branches aligned on a shared trunk
#[derive(Parser, Debug)]
#[command(name = "arbor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if arbor was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; implies --no-interactive
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable interactive prompts
    #[arg(long, global = true)]
    pub no_interactive: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Whether prompting is allowed.
    pub fn interactive(&self) -> bool {
        !(self.no_interactive || self.quiet)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialise arbor in this repository
    #[command(name = "init")]
    Init {
        /// Trunk branch (detected from the repository when omitted)
        #[arg(long)]
        trunk: Option<String>,

        /// Remote the trunk tracks
        #[arg(long)]
        remote: Option<String>,
    },

    /// Print the trunk branch
    #[command(name = "trunk")]
    Trunk {
        /// Check the trunk out instead of printing it
        #[arg(long)]
        checkout: bool,
    },

    /// Start tracking a branch
    #[command(name = "track")]
    Track {
        /// Branch to track (defaults to current)
        branch: Option<String>,

        /// Base branch (defaults to trunk)
        #[arg(long, short)]
        base: Option<String>,
    },

    /// Stop tracking a branch, re-parenting its children
    #[command(name = "untrack")]
    Untrack {
        /// Branch to untrack (defaults to current)
        branch: Option<String>,
    },

    /// Rebase a branch and everything stacked on it onto fresh bases
    #[command(name = "restack", visible_alias = "rs")]
    Restack {
        /// Branch to start from (defaults to current)
        branch: Option<String>,

        /// Restack only this branch, not its upstack
        #[arg(long)]
        only: bool,
    },

    /// Reorder the downstack in an editor
    #[command(name = "edit")]
    Edit {
        /// Leaf of the chain to edit (defaults to current)
        branch: Option<String>,

        /// Editor to use (overrides config and $EDITOR)
        #[arg(long)]
        editor: Option<String>,
    },

    /// Re-parent a branch onto a new base
    #[command(name = "onto")]
    Onto {
        /// The new base branch
        target: String,

        /// Branch to move (defaults to current)
        branch: Option<String>,
    },

    /// Delete a branch, re-parenting its children onto its base
    #[command(name = "delete", visible_alias = "d")]
    Delete {
        /// Branch to delete (defaults to current)
        branch: Option<String>,

        /// Delete even if unmerged; skip confirmation
        #[arg(long, short)]
        force: bool,
    },

    /// Show the tracked branch forest
    #[command(name = "log")]
    Log,
}
