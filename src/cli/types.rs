//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line interface of `optima`.
#[derive(Parser, Debug)]
#[command(name = "optima")]
#[command(about = "Optima - launch, monitor and kill detached optimization jobs", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Display debug information in the terminal
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an optimization, or report on the existing one
    Run(RunArgs),

    /// Attach to a running optimization and follow its progress
    Monitor(MonitorArgs),

    /// Stop a running optimization
    Kill(ConfigArg),

    /// Validate a configuration file and list every problem found
    Lint(ConfigArg),

    /// Show the status of the optimization for a configuration
    Status(ConfigArg),

    /// Run a job process (started by `run`, reads its payload from stdin)
    #[command(hide = true)]
    Server,
}

/// A single configuration file argument.
#[derive(Args, Debug)]
pub struct ConfigArg {
    /// The path to the optimization configuration file
    pub config: PathBuf,
}

/// Arguments of `optima run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// The path to the optimization configuration file
    pub config: PathBuf,

    /// Run the optimization even though results are already available
    #[arg(long)]
    pub new_run: bool,

    /// Option removed. Please use `optima kill <config>`
    #[arg(long, hide = true)]
    pub kill: bool,

    /// Display all jobs executed from the forward model
    #[arg(long)]
    pub show_all_jobs: bool,
}

/// Arguments of `optima monitor`.
#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// The path to the optimization configuration file
    pub config: PathBuf,

    /// Display all jobs executed from the forward model
    #[arg(long)]
    pub show_all_jobs: bool,
}
