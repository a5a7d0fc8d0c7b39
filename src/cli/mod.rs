//! CLI implementation using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config;

/// Faultline - spectrum-based fault localization reports for Java projects.
#[derive(Parser)]
#[command(name = "faultline")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the repository root
    #[arg(short, long, default_value = ".", global = true)]
    pub path: PathBuf,

    /// Output format (defaults to the configured format)
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build the fault model and print the suspiciousness report
    #[command(alias = "sfl")]
    Report(ReportArgs),

    /// Map new-file line numbers to positions inside a unified diff
    #[command(alias = "pos")]
    Position(PositionArgs),
}

#[derive(Args, Default)]
pub struct ReportArgs {
    /// Directory holding the SFL output (overrides `build_path`)
    #[arg(long)]
    pub build_path: Option<PathBuf>,

    /// Primary ranking algorithm (overrides `ranking_order`)
    #[arg(long)]
    pub order_by: Option<String>,

    /// Maximum line gap inside one block (overrides `gap_threshold`)
    #[arg(long)]
    pub gap: Option<u32>,
}

#[derive(Args)]
pub struct PositionArgs {
    /// Patch of a single file, in unified diff format
    #[arg(long)]
    pub patch: PathBuf,

    /// New-file line numbers to resolve
    #[arg(short, long = "line", required = true, num_args = 1..)]
    pub lines: Vec<u32>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    #[value(alias = "md")]
    Markdown,
}

impl From<OutputFormat> for config::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => config::OutputFormat::Text,
            OutputFormat::Json => config::OutputFormat::Json,
            OutputFormat::Markdown => config::OutputFormat::Markdown,
        }
    }
}

impl ReportArgs {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut config::Config) {
        if let Some(path) = &self.build_path {
            config.build_path = path.clone();
        }
        if let Some(order) = &self.order_by {
            config.ranking_order = Some(order.clone());
        }
        if let Some(gap) = self.gap {
            config.gap_threshold = gap;
        }
    }
}
