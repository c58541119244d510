//! Command-line argument definitions.

use clap::{Parser, Subcommand, ValueEnum};
use gitpanel::git::ConflictSide;

/// Top-level CLI parser for `gitpanel`.
#[derive(Debug, Parser)]
#[command(name = "gitpanel", version, about = "Version-control panel for a single working directory")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show staged and working changes with recent history
    Status {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Recent upstream commits and unpushed commits
    Log {
        /// Number of upstream commits; defaults to the configured count
        count: Option<usize>,
    },
    /// Stage a path, or everything
    Add {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        path: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// Discard working changes, or unstage with --staged
    Restore {
        path: String,
        #[arg(long)]
        staged: bool,
    },
    /// Commit staged changes
    Commit { message: String },
    /// Keep one side of a conflicted file and commit
    Resolve {
        #[arg(value_enum)]
        side: Side,
        path: String,
    },
    /// Pull, then push
    Sync,
    /// Initialize and check out the configured remote branch
    Init { url: String },
    /// Time of the last fetch
    LastSync,
    /// Delete the .git directory
    Deinit {
        /// Confirm the irreversible removal
        #[arg(long, required = true)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Side {
    Theirs,
    Ours,
}

impl From<Side> for ConflictSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Theirs => ConflictSide::Theirs,
            Side::Ours => ConflictSide::Ours,
        }
    }
}
