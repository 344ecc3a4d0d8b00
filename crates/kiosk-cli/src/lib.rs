//! Kiosk CLI
//!
//! Terminal front end for the survey kiosk:
//! - `kiosk run` presents the active survey on stdin/stdout until `quit`
//! - `kiosk validate` checks a survey file against the authoring rules

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod commands;
pub mod input;
pub mod logging;
pub mod render;
pub mod survey_file;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command line
#[derive(Debug, Parser)]
#[command(name = "kiosk", version, about = "Unattended survey kiosk")]
pub struct Cli {
    /// Log filter, overridden by `RUST_LOG`
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Present a survey on this terminal
    Run(RunArgs),
    /// Check a survey file
    Validate(ValidateArgs),
}

/// Arguments for `kiosk run`
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Survey file (`.json`, `.yaml` or `.yml`)
    #[arg(long)]
    pub survey: PathBuf,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Inactivity timeout in milliseconds
    #[arg(long)]
    pub inactivity_ms: Option<u64>,

    /// Thank-you display in milliseconds
    #[arg(long)]
    pub completion_ms: Option<u64>,

    /// Shuffle seed for reproducible question order
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for `kiosk validate`
#[derive(Debug, Clone, Args)]
pub struct ValidateArgs {
    /// Survey file (`.json`, `.yaml` or `.yml`)
    #[arg(long)]
    pub survey: PathBuf,
}
