//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::provision::StepKind;

/// imgprep - Provision a Python ML serving image.
#[derive(Debug, Parser)]
#[command(name = "imgprep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (overrides default imgprep.yml)
    #[arg(short, long, global = true, env = "IMGPREP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to project root containing requirements.txt (overrides current directory)
    #[arg(short, long, global = true, env = "IMGPREP_PROJECT")]
    pub project: Option<PathBuf>,

    /// Show verbose output, including command output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run every provisioning step (default if no command specified)
    Run(RunArgs),

    /// Show the resolved steps without running them
    Plan(PlanArgs),

    /// Only verify installed package versions
    Verify,

    /// Only remove bytecode and installer caches
    Clean,
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RunArgs {
    /// Print every command without executing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip specified steps (comma-separated)
    #[arg(long, value_delimiter = ',', value_parser = parse_step)]
    pub skip: Vec<StepKind>,
}

/// Arguments for the `plan` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PlanArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = PlanFormat::Text)]
    pub format: PlanFormat,
}

/// Output formats for `plan`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    /// Human-readable list
    #[default]
    Text,
    /// JSON document
    Json,
}

fn parse_step(s: &str) -> Result<StepKind, String> {
    s.parse()
}
