//! Ingestion passes for the test list, line inventory, rankings and statistics.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::location::{parse_line_location, LineLocation};
use super::{
    FaultModel, FileId, FileKey, LineId, Method, MethodId, MethodKey, SourceFile, SourceLine,
    Statistic, SuspiciousnessMetric, TestCase, TestId,
};
use crate::core::{Error, InputKind, Result};

const TESTS_HEADER: &str = "name,outcome,runtime,stacktrace";
const SPECTRA_HEADER: &str = "name";
const RANKING_HEADER: &str = "name;suspiciousness_value";
const STATISTICS_HEADER: &str = "formula,metric_name,metric_value";

/// Finds the on-disk path of a source file referenced by the line inventory.
pub trait SourceLocator {
    /// Repository-relative path of the file declaring `class_name` in `package`.
    fn locate(&self, package: &str, class_name: &str) -> Option<PathBuf>;
}

/// Locator that never finds anything; every file keeps `path: None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocator;

impl SourceLocator for NoLocator {
    fn locate(&self, _package: &str, _class_name: &str) -> Option<PathBuf> {
        None
    }
}

/// Non-blank rows with their 1-based row numbers and trailing `\r` removed.
pub(super) fn data_rows<I, S>(rows: I) -> Vec<(usize, String)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| (i + 1, row.as_ref().trim_end_matches('\r').to_string()))
        .filter(|(_, row)| !row.trim().is_empty())
        .collect()
}

fn is_header(row: &str, header: &str) -> bool {
    row.split_whitespace().collect::<String>() == header
}

impl FaultModel {
    /// Ingest the test list (`name,outcome,runtime,stacktrace`).
    ///
    /// Replaces any previously ingested tests. Must run before the line inventory.
    pub fn ingest_test_list<I, S>(&mut self, source: &str, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        info!("Parsing test cases from {source}");
        if !self.lines.is_empty() {
            return Err(Error::Sequencing {
                pass: "test list",
                requires: "it must be ingested before the line inventory",
            });
        }

        let mut tests = Vec::new();
        for (row_number, row) in data_rows(rows) {
            if is_header(&row, TESTS_HEADER) {
                continue;
            }
            let test = parse_test_row(TestId(tests.len()), &row)
                .map_err(|e| e.at_row(InputKind::Tests, source, row_number, &row))?;
            tests.push(test);
        }

        debug!("Parsed {} test cases", tests.len());
        self.tests = tests;
        Ok(())
    }

    /// Ingest the line inventory (`<location>:<line>`), creating files,
    /// methods and lines on first reference.
    ///
    /// All rows are parsed before anything is inserted, so a malformed row
    /// leaves the model unchanged.
    pub fn ingest_line_inventory<I, S>(
        &mut self,
        source: &str,
        rows: I,
        locator: &dyn SourceLocator,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        info!("Parsing spectra from {source}");
        if self.matrix_ingested {
            return Err(Error::Sequencing {
                pass: "line inventory",
                requires: "the coverage matrix has already fixed the line order",
            });
        }

        let mut locations = Vec::new();
        for (row_number, row) in data_rows(rows) {
            if is_header(&row, SPECTRA_HEADER) {
                continue;
            }
            let location = parse_line_location(&row)
                .map_err(|e| e.at_row(InputKind::Spectra, source, row_number, &row))?;
            locations.push(location);
        }

        let before = self.lines.len();
        for location in &locations {
            self.intern_location(location, locator);
        }

        debug!(
            "Inventory has {} files, {} methods, {} lines ({} new)",
            self.files.len(),
            self.methods.len(),
            self.lines.len(),
            self.lines.len() - before
        );
        Ok(())
    }

    /// Ingest one ranking file (`<location>:<line>;<value>`) for `algorithm`.
    ///
    /// Every referenced line must already be in the inventory. Metrics are
    /// attached only after every row validated, so a failing file leaves all
    /// previously recorded metrics untouched.
    pub fn ingest_ranking<I, S>(&mut self, algorithm: &str, source: &str, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        info!("Parsing ranking {algorithm} from {source}");
        if algorithm.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "ranking algorithm name must not be empty".to_string(),
            ));
        }
        if self.tests.is_empty() {
            return Err(Error::Sequencing {
                pass: "ranking",
                requires: "the test list must be ingested first",
            });
        }
        if self.lines.is_empty() {
            return Err(Error::Sequencing {
                pass: "ranking",
                requires: "the line inventory must be ingested first",
            });
        }

        let mut staged: Vec<(LineId, f64)> = Vec::new();
        let mut seen: HashSet<LineId> = HashSet::new();
        for (row_number, row) in data_rows(rows) {
            if is_header(&row, RANKING_HEADER) {
                continue;
            }
            let (line, value) = self
                .parse_ranking_row(algorithm, &row, &seen)
                .map_err(|e| e.at_row(InputKind::Ranking, source, row_number, &row))?;
            seen.insert(line);
            staged.push((line, value));
        }

        debug!("Ranking {algorithm} scored {} lines", staged.len());
        for (line, value) in staged {
            self.lines[line.0].metrics.push(SuspiciousnessMetric {
                algorithm: algorithm.to_string(),
                value,
            });
        }
        Ok(())
    }

    /// Ingest the statistics file (`formula,metric_name,metric_value`),
    /// replacing any previously ingested statistics.
    pub fn ingest_statistics<I, S>(&mut self, source: &str, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        info!("Parsing statistics from {source}");
        let mut statistics = Vec::new();
        for (row_number, row) in data_rows(rows) {
            if is_header(&row, STATISTICS_HEADER) {
                continue;
            }
            let statistic = parse_statistic_row(&row)
                .map_err(|e| e.at_row(InputKind::Statistics, source, row_number, &row))?;
            statistics.push(statistic);
        }
        self.statistics = statistics;
        Ok(())
    }

    fn intern_location(&mut self, location: &LineLocation, locator: &dyn SourceLocator) -> LineId {
        let file = self.intern_file(&location.method.package, &location.method.class_name, locator);
        let method = self.intern_method(file, &location.method.method, &location.method.parameters);

        if let Some(id) = self.find_line(method, location.line) {
            return id;
        }
        let id = LineId(self.lines.len());
        self.lines.push(SourceLine {
            id,
            method,
            line_number: location.line,
            metrics: Vec::new(),
        });
        self.line_index.insert((method, location.line), id);
        id
    }

    fn intern_file(
        &mut self,
        package_name: &str,
        class_name: &str,
        locator: &dyn SourceLocator,
    ) -> FileId {
        if let Some(id) = self.find_file(package_name, class_name) {
            return id;
        }
        let path = locator.locate(package_name, class_name);
        if path.is_none() {
            warn!("Source file for {package_name}${class_name} not found");
        }
        let id = FileId(self.files.len());
        self.files.push(SourceFile {
            id,
            class_name: class_name.to_string(),
            package_name: package_name.to_string(),
            path,
        });
        self.file_index.insert(
            FileKey {
                package_name: package_name.to_string(),
                class_name: class_name.to_string(),
            },
            id,
        );
        id
    }

    fn intern_method(&mut self, file: FileId, name: &str, parameters: &[String]) -> MethodId {
        if let Some(id) = self.find_method(file, name, parameters) {
            return id;
        }
        let id = MethodId(self.methods.len());
        self.methods.push(Method {
            id,
            file,
            name: name.to_string(),
            parameters: parameters.to_vec(),
        });
        self.method_index.insert(
            MethodKey {
                file,
                name: name.to_string(),
                parameters: parameters.to_vec(),
            },
            id,
        );
        id
    }

    fn parse_ranking_row(
        &self,
        algorithm: &str,
        row: &str,
        staged: &HashSet<LineId>,
    ) -> Result<(LineId, f64)> {
        let parts: Vec<&str> = row.split(';').collect();
        if parts.len() != 2 {
            return Err(Error::invalid_format(format!(
                "expected '<location>;<suspiciousness>', found {} fields",
                parts.len()
            )));
        }
        let value = parts[1].trim().parse::<f64>().map_err(|e| {
            Error::invalid_format(format!("suspiciousness '{}' is not a number: {e}", parts[1]))
        })?;
        let location = parse_line_location(parts[0])?;

        let file = self
            .find_file(&location.method.package, &location.method.class_name)
            .ok_or_else(|| Error::InconsistentWithInventory {
                entity: "file",
                location: location.to_string(),
            })?;
        let method = self
            .find_method(file, &location.method.method, &location.method.parameters)
            .ok_or_else(|| Error::InconsistentWithInventory {
                entity: "method",
                location: location.to_string(),
            })?;
        let line = self
            .find_line(method, location.line)
            .ok_or_else(|| Error::InconsistentWithInventory {
                entity: "line",
                location: location.to_string(),
            })?;

        if staged.contains(&line) || self.lines[line.0].metric(algorithm).is_some() {
            return Err(Error::DuplicateMetric {
                algorithm: algorithm.to_string(),
                location: location.to_string(),
            });
        }
        Ok((line, value))
    }
}

fn parse_test_row(id: TestId, row: &str) -> Result<TestCase> {
    let fields: Vec<&str> = row.splitn(4, ',').collect();
    if fields.len() < 3 {
        return Err(Error::invalid_format(format!(
            "expected at least 3 fields (name, outcome, runtime), found {}",
            fields.len()
        )));
    }

    let passed = match fields[1].trim() {
        "PASS" => true,
        "FAIL" => false,
        other => {
            return Err(Error::invalid_format(format!(
                "outcome must be PASS or FAIL, found '{other}'"
            )))
        }
    };
    let runtime = fields[2].trim().parse::<u64>().map_err(|e| {
        Error::invalid_format(format!("runtime '{}' is not an integer: {e}", fields[2]))
    })?;
    // Stack traces may contain commas, so the fourth field runs to the end of the row.
    let stacktrace = if passed {
        None
    } else {
        Some(fields.get(3).copied().unwrap_or_default().to_string())
    };

    Ok(TestCase {
        id,
        name: fields[0].trim().to_string(),
        passed,
        runtime,
        stacktrace,
        coverage: Vec::new(),
    })
}

fn parse_statistic_row(row: &str) -> Result<Statistic> {
    let fields: Vec<&str> = row.split(',').collect();
    if fields.len() != 3 {
        return Err(Error::invalid_format(format!(
            "expected 3 fields (formula, metric_name, metric_value), found {}",
            fields.len()
        )));
    }
    let metric_value = fields[2].trim().parse::<f64>().map_err(|e| {
        Error::invalid_format(format!("metric value '{}' is not a number: {e}", fields[2]))
    })?;
    Ok(Statistic {
        formula: fields[0].trim().to_string(),
        metric_name: fields[1].trim().to_string(),
        metric_value,
    })
}
