//! Output formatters for reports and diff positions.

use std::io::Write;
use std::path::Path;

use colored::{Color, Colorize};
use serde::Serialize;

use crate::config::OutputFormat;
use crate::core::Result;
use crate::diff::LinePosition;
use crate::report::{BlockReport, LineReport, Report, Score};

/// Output format enum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    Json,
    Markdown,
    #[default]
    Text,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => Format::Json,
            OutputFormat::Markdown => Format::Markdown,
            OutputFormat::Text => Format::Text,
        }
    }
}

impl Format {
    /// Pretty JSON for any serializable value.
    pub fn json<T: Serialize, W: Write>(data: &T, writer: &mut W) -> Result<()> {
        serde_json::to_writer_pretty(&mut *writer, data)?;
        writeln!(writer)?;
        Ok(())
    }

    pub fn write_report<W: Write>(&self, report: &Report, writer: &mut W) -> Result<()> {
        match self {
            Format::Json => Self::json(report, writer),
            Format::Markdown => report_markdown(report, writer),
            Format::Text => report_text(report, writer),
        }
    }

    pub fn write_positions<W: Write>(&self, positions: &[LinePosition], writer: &mut W) -> Result<()> {
        match self {
            Format::Json => Self::json(&positions, writer),
            Format::Markdown => {
                writeln!(writer, "| Line | Position |")?;
                writeln!(writer, "| --- | --- |")?;
                for p in positions {
                    writeln!(writer, "| {} | {} |", p.line, p.position)?;
                }
                Ok(())
            }
            Format::Text => {
                for p in positions {
                    writeln!(writer, "{}\t{}", p.line, p.position)?;
                }
                Ok(())
            }
        }
    }
}

/// Terminal color for a suspiciousness value.
pub fn score_color(value: f64) -> Color {
    if value >= 0.9 {
        Color::Red
    } else if value >= 0.75 {
        Color::BrightRed
    } else if value >= 0.5 {
        Color::Yellow
    } else if value >= 0.25 {
        Color::BrightGreen
    } else {
        Color::Green
    }
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_nan() => "NaN".to_string(),
        Some(v) => format!("{v:.2}"),
        None => "-".to_string(),
    }
}

fn display_path(path: Option<&Path>, fallback: &str) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| fallback.to_string())
}

fn block_anchor(block: &BlockReport) -> String {
    let target = display_path(block.path.as_deref(), &block.method);
    if block.start_line == block.end_line {
        format!("{target}#L{}", block.start_line)
    } else {
        format!("{target}#L{}-L{}", block.start_line, block.end_line)
    }
}

fn report_markdown<W: Write>(report: &Report, writer: &mut W) -> Result<()> {
    writeln!(writer, "# Fault Localization Report\n")?;
    writeln!(
        writer,
        "**Tests**: {} total, {} passed, {} failed\n",
        report.tests.total, report.tests.passed, report.tests.failed
    )?;

    writeln!(writer, "## Suspicious Blocks\n")?;
    if report.blocks.is_empty() {
        writeln!(writer, "_No suspicious lines_\n")?;
    } else {
        write!(writer, "| Block |")?;
        for algorithm in &report.algorithms {
            if *algorithm == report.primary_algorithm {
                write!(writer, " **{algorithm}** |")?;
            } else {
                write!(writer, " {algorithm} |")?;
            }
        }
        writeln!(writer)?;
        writeln!(writer, "|{}", " --- |".repeat(report.algorithms.len() + 1))?;

        for block in &report.blocks {
            write!(writer, "| {} |", block_anchor(block))?;
            for (i, _) in report.algorithms.iter().enumerate() {
                let cell: Vec<String> = block
                    .lines
                    .iter()
                    .map(|l| format!("**L{}** {}", l.line_number, format_value(l.scores[i].value)))
                    .collect();
                write!(writer, " {} |", cell.join("<br>"))?;
            }
            writeln!(writer)?;
        }
        writeln!(writer)?;
    }

    for section in &report.sections {
        writeln!(
            writer,
            "## {} (threshold {})\n",
            section.algorithm, section.threshold
        )?;
        if section.lines.is_empty() {
            writeln!(writer, "_No lines above threshold_\n")?;
            continue;
        }
        writeln!(writer, "| Line | Suspiciousness | Failing Tests |")?;
        writeln!(writer, "| --- | --- | --- |")?;
        for line in &section.lines {
            writeln!(
                writer,
                "| {} | {} | {} |",
                line_anchor(line),
                format_value(value_for(&line.scores, &section.algorithm)),
                line.failing_tests.join(", ")
            )?;
        }
        writeln!(writer)?;
    }

    if !report.statistics.is_empty() {
        writeln!(writer, "## Statistics\n")?;
        writeln!(writer, "| Formula | Metric | Value |")?;
        writeln!(writer, "| --- | --- | --- |")?;
        for stat in &report.statistics {
            writeln!(
                writer,
                "| {} | {} | {} |",
                stat.formula, stat.metric_name, stat.metric_value
            )?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn line_anchor(line: &LineReport) -> String {
    match &line.path {
        Some(path) => format!("{}#L{}", path.display(), line.line_number),
        None => line.location.clone(),
    }
}

fn value_for(scores: &[Score], algorithm: &str) -> Option<f64> {
    scores
        .iter()
        .find(|s| s.algorithm == algorithm)
        .and_then(|s| s.value)
}

fn colored_value(value: Option<f64>) -> String {
    let text = format_value(value);
    match value {
        Some(v) if !v.is_nan() => text.color(score_color(v)).to_string(),
        _ => text.dimmed().to_string(),
    }
}

fn report_text<W: Write>(report: &Report, writer: &mut W) -> Result<()> {
    writeln!(
        writer,
        "{} {} tests, {} passed, {} failed",
        "Tests:".bold(),
        report.tests.total,
        report.tests.passed,
        report.tests.failed
    )?;
    writeln!(writer)?;
    writeln!(
        writer,
        "{}",
        format!("Suspicious blocks (ranked by {})", report.primary_algorithm).bold()
    )?;
    if report.blocks.is_empty() {
        writeln!(writer, "  none")?;
    }
    for (rank, block) in report.blocks.iter().enumerate() {
        let target = display_path(block.path.as_deref(), &block.method);
        writeln!(
            writer,
            "{:>3}. {}:{}-{}  {}",
            rank + 1,
            target.cyan(),
            block.start_line,
            block.end_line,
            colored_value(Some(block.max_suspiciousness))
        )?;
        for line in &block.lines {
            let scores: Vec<String> = line
                .scores
                .iter()
                .map(|s| format!("{} {}", s.algorithm, colored_value(s.value)))
                .collect();
            writeln!(writer, "       L{:<6} {}", line.line_number, scores.join("  "))?;
        }
    }

    for section in &report.sections {
        writeln!(writer)?;
        writeln!(
            writer,
            "{}",
            format!("{} >= {}", section.algorithm, section.threshold).bold()
        )?;
        for line in &section.lines {
            writeln!(
                writer,
                "  {}  {}",
                colored_value(value_for(&line.scores, &section.algorithm)),
                line.location
            )?;
        }
    }

    if !report.statistics.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "{}", "Statistics".bold())?;
        for stat in &report.statistics {
            writeln!(
                writer,
                "  {} {} = {}",
                stat.formula, stat.metric_name, stat.metric_value
            )?;
        }
    }
    Ok(())
}
