//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::metadata::EntryStatus;

/// Draftwork - editorial workflow on Git branches and pull requests
#[derive(Parser, Debug)]
#[command(name = "dw")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if dw was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List entries under editorial workflow
    #[command(
        name = "list",
        long_about = "List entries under editorial workflow.\n\n\
            Shows every unpublished entry with its status and pull request. \
            In open authoring mode, statuses are first brought in line with the \
            upstream pull requests, and entries merged upstream are cleaned up.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Everything waiting for review or publication
    dw list

    # Only the content keys, for scripting
    dw list --quiet"
    )]
    List,

    /// Show one unpublished entry
    Show {
        /// Collection name
        collection: String,
        /// Entry slug
        slug: String,
    },

    /// Change the workflow status of an entry
    #[command(
        name = "status",
        after_help = "\
WORKFLOW EXAMPLES:
    # Ask for review
    dw status posts hello pending_review

    # Back to draft (closes the pull request in open authoring mode)
    dw status posts hello draft"
    )]
    Status {
        /// Collection name
        collection: String,
        /// Entry slug
        slug: String,
        /// New status
        #[arg(value_enum)]
        status: StatusArg,
    },

    /// Publish an entry to the default branch
    #[command(
        name = "publish",
        long_about = "Publish an entry to the default branch.\n\n\
            Merges the entry's pull request. If the hosting service refuses the \
            merge, the entry's files are committed directly onto the default \
            branch instead. The entry branch and metadata are removed afterwards."
    )]
    Publish {
        /// Collection name
        collection: String,
        /// Entry slug
        slug: String,
    },

    /// Discard an unpublished entry
    Delete {
        /// Collection name
        collection: String,
        /// Entry slug
        slug: String,
    },

    /// Show CI and deploy preview statuses for an entry
    Checks {
        /// Collection name
        collection: String,
        /// Entry slug
        slug: String,
    },

    /// Show or change configuration
    Config {
        /// Print the config file locations instead of values
        #[arg(long)]
        path: bool,

        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate shell completion scripts for tab-completion.\n\n\
            Outputs a completion script for the specified shell. Add the output \
            to your shell's configuration to enable tab-completion for dw commands.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    dw completion bash >> ~/.bashrc

    # Zsh
    dw completion zsh > ~/.zfunc/_dw

    # Fish
    dw completion fish > ~/.config/fish/completions/dw.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Set a project configuration value
    Set {
        /// Configuration key (repo, branch, fork, merge_method, initial_status)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Workflow status as given on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusArg {
    #[value(name = "draft")]
    Draft,
    #[value(name = "pending_review", alias = "review")]
    PendingReview,
    #[value(name = "pending_publish", alias = "ready")]
    PendingPublish,
}

impl From<StatusArg> for EntryStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Draft => EntryStatus::Draft,
            StatusArg::PendingReview => EntryStatus::PendingReview,
            StatusArg::PendingPublish => EntryStatus::PendingPublish,
        }
    }
}

/// Supported shells for completion
#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
