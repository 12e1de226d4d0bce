//! CLI interface for Conductor
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Conductor plan engine
///
/// Validates multi-step plans and runs them against the enabled capability
/// modules, group by group.
#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the capabilities of every enabled module
    Capabilities,

    /// Check a plan document without running it
    Validate {
        /// Path to the plan JSON document
        plan: PathBuf,
    },

    /// Validate and execute a plan document
    Run {
        /// Path to the plan JSON document
        plan: PathBuf,

        /// Approve every step that needs confirmation
        #[arg(short, long)]
        yes: bool,

        /// Plan timeout in seconds, overriding the configuration (0 disables)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },
}
