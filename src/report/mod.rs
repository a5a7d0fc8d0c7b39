//! Report assembly: the ranked, grouped view of a [`FaultModel`] that the
//! output formatters render.

use std::path::PathBuf;

use rayon::prelude::*;
use serde::Serialize;

use crate::config::{Config, RankingConfig};
use crate::model::{FaultModel, LineId, SourceLine, Statistic, TestSummary};
use crate::ranking::{above_threshold, group_adjacent, order_algorithms, rank_by_metric, Scored};

/// Everything a formatter needs, already ordered.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Algorithm that orders blocks.
    pub primary_algorithm: String,
    /// All configured algorithms, primary first.
    pub algorithms: Vec<String>,
    /// Blocks of nearby suspicious lines, most suspicious first.
    pub blocks: Vec<BlockReport>,
    /// Per-algorithm lines at or above the configured threshold.
    pub sections: Vec<AlgorithmSection>,
    pub tests: TestSummary,
    pub statistics: Vec<Statistic>,
}

/// A block of adjacent suspicious lines inside one method.
#[derive(Debug, Clone, Serialize)]
pub struct BlockReport {
    /// Repository-relative path, when the source was found.
    pub path: Option<PathBuf>,
    /// `package$Class#method(params)`.
    pub method: String,
    pub start_line: u32,
    pub end_line: u32,
    /// Highest primary-algorithm suspiciousness in the block.
    pub max_suspiciousness: f64,
    pub lines: Vec<LineReport>,
}

/// One line with its scores and the failing tests that executed it.
#[derive(Debug, Clone, Serialize)]
pub struct LineReport {
    pub path: Option<PathBuf>,
    pub location: String,
    pub line_number: u32,
    /// One entry per algorithm, in report algorithm order.
    pub scores: Vec<Score>,
    pub failing_tests: Vec<String>,
    pub passing_tests: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Score {
    pub algorithm: String,
    pub value: Option<f64>,
}

/// Lines reported by one algorithm.
#[derive(Debug, Clone, Serialize)]
pub struct AlgorithmSection {
    pub algorithm: String,
    pub threshold: f64,
    pub lines: Vec<LineReport>,
}

impl Report {
    /// Build the report for every ranking in `config`.
    pub fn build(model: &FaultModel, config: &Config) -> Self {
        let primary = config.primary_algorithm().to_string();
        let algorithms = order_algorithms(&config.algorithms(), &primary);
        let all: Vec<&SourceLine> = model.lines().iter().collect();

        let sections: Vec<AlgorithmSection> = config
            .rankings
            .par_iter()
            .map(|ranking| section(model, ranking, &algorithms, &all))
            .collect();

        // A line joins the block view as soon as any algorithm flags it.
        let flagged: Vec<&SourceLine> = all
            .iter()
            .copied()
            .filter(|line| {
                config.rankings.iter().any(|r| {
                    line.metric(&r.algorithm)
                        .is_some_and(|v| v >= r.threshold)
                })
            })
            .collect();

        let blocks = rank_by_metric(group_adjacent(&flagged, config.gap_threshold), &primary)
            .into_iter()
            .map(|group| {
                let first = group.lines[0];
                let lines: Vec<LineReport> = group
                    .lines
                    .iter()
                    .map(|l| line_report(model, l.id, &algorithms))
                    .collect();
                BlockReport {
                    path: model.file_of(first).path.clone(),
                    method: model.line_location(first.id).method.to_string(),
                    start_line: group.start(),
                    end_line: group.end(),
                    max_suspiciousness: group.max_suspiciousness(&primary),
                    lines,
                }
            })
            .collect();

        Self {
            primary_algorithm: primary,
            algorithms,
            blocks,
            sections,
            tests: model.test_summary(),
            statistics: model.statistics().to_vec(),
        }
    }

    /// Whether any algorithm flagged any line.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

fn section(
    model: &FaultModel,
    ranking: &RankingConfig,
    algorithms: &[String],
    lines: &[&SourceLine],
) -> AlgorithmSection {
    let lines = above_threshold(lines, &ranking.algorithm, ranking.threshold)
        .into_iter()
        .map(|l| line_report(model, l.id, algorithms))
        .collect();
    AlgorithmSection {
        algorithm: ranking.algorithm.clone(),
        threshold: ranking.threshold,
        lines,
    }
}

fn line_report(model: &FaultModel, id: LineId, algorithms: &[String]) -> LineReport {
    let line = model.line(id);
    let covering = model.covering_tests(id);
    let failing_tests = covering
        .iter()
        .filter(|t| !t.passed)
        .map(|t| t.name.clone())
        .collect();
    LineReport {
        path: model.file_of(line).path.clone(),
        location: model.line_location(id).to_string(),
        line_number: line.line_number,
        scores: algorithms
            .iter()
            .map(|a| Score {
                algorithm: a.clone(),
                value: line.metric(a),
            })
            .collect(),
        failing_tests,
        passing_tests: covering.iter().filter(|t| t.passed).count(),
    }
}
