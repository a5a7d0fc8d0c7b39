//! Faultline CLI - spectrum-based fault localization reports.

use std::fs;
use std::io::{stdout, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use faultline::cli::{Cli, Command, PositionArgs, ReportArgs};
use faultline::config::Config;
use faultline::diff::DiffPositionMap;
use faultline::loader::{load_model, FsLocator};
use faultline::output::Format;
use faultline::report::Report;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_default(&cli.path)?,
    };

    let format = Format::from(cli.format.map(Into::into).unwrap_or(config.output.format));
    if !config.output.color {
        colored::control::set_override(false);
    }

    match cli.command {
        Command::Report(args) => run_report(&cli.path, &mut config, &args, format),
        Command::Position(args) => run_position(&args, format),
    }
}

fn run_report(
    root: &std::path::Path,
    config: &mut Config,
    args: &ReportArgs,
    format: Format,
) -> anyhow::Result<()> {
    args.apply(config);
    config.validate()?;

    let build = root.join(&config.build_path);
    let locator = FsLocator::new(root, Some(build.clone()));
    let model = load_model(root, config, &locator)
        .with_context(|| format!("failed to load SFL output from {}", build.display()))?;

    let report = Report::build(&model, config);
    debug!("Report has {} blocks", report.blocks.len());

    let mut out = stdout().lock();
    format.write_report(&report, &mut out)?;
    out.flush()?;
    Ok(())
}

fn run_position(args: &PositionArgs, format: Format) -> anyhow::Result<()> {
    let patch = fs::read_to_string(&args.patch)
        .with_context(|| format!("failed to read patch {}", args.patch.display()))?;
    let map = DiffPositionMap::new(&patch)
        .with_context(|| format!("failed to parse patch {}", args.patch.display()))?;
    debug!("Parsed {} hunks", map.hunks().len());

    let positions = map.positions(&args.lines)?;
    let mut out = stdout().lock();
    format.write_positions(&positions, &mut out)?;
    out.flush()?;
    Ok(())
}
