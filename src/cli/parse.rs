//! CLI parse: clap types for practice-context. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// practice-context CLI - identity context resolution and access decisions
#[derive(Parser)]
#[command(name = "practice-context")]
#[command(about = "Resolve principals to unified contexts, gate routes and poll connection status")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (for workspace config files)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false", conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// sled store directory (overrides storage.path)
    #[arg(long)]
    pub store: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import profiles and delegate records from a JSON fixture
    Import {
        /// Fixture file: {"profiles": [...], "delegates": [...]}
        path: PathBuf,
    },
    /// Resolve a principal to its unified context
    Resolve {
        principal: String,
        /// Bypass the context cache
        #[arg(long)]
        force: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Decide navigation for a route
    Gate {
        route: String,
        /// Principal to resolve first; unauthenticated when omitted
        #[arg(long)]
        principal: Option<String>,
        /// Skip plan and completeness checks
        #[arg(long)]
        bypass: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Check whether a principal may perform an action on a module
    Can {
        principal: String,
        module: String,
        action: String,
    },
    /// Check whether a principal may view a sensitive data category
    Sensitive { principal: String, category: String },
    /// Delegate record management
    Delegate {
        #[command(subcommand)]
        command: DelegateCommands,
    },
    /// Connection status of an external messaging session
    Status {
        #[command(subcommand)]
        command: StatusCommands,
    },
}

#[derive(Subcommand)]
pub enum DelegateCommands {
    /// Activate or deactivate a delegate
    SetActive {
        id: String,
        #[arg(action = clap::ArgAction::Set)]
        active: bool,
    },
    /// Replace a delegate's permissions with "full" or a JSON module map
    SetPermissions { id: String, permissions: String },
}

#[derive(Subcommand)]
pub enum StatusCommands {
    /// Current status of a subject
    Check {
        subject: String,
        /// Skip the cached status (the throttle still applies)
        #[arg(long)]
        force: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Request a pairing artifact
    Pair { subject: String },
    /// Disconnect the subject's session
    Disconnect { subject: String },
}
