//! Coverage matrix ingestion.
//!
//! The matrix has one row per test (test-list order) and one column per
//! inventoried line (inventory order), followed by an outcome marker:
//!
//! ```text
//! 1 0 1 +
//! 0 1 1 -
//! ```
//!
//! `1`/`0` mark a covered/uncovered line, `+`/`-` a passing/failing test.

use tracing::{debug, info};

use super::builder::data_rows;
use super::{FaultModel, LineCoverage, LineId, TestCase};
use crate::core::{Error, InputKind, Result};

impl FaultModel {
    /// Ingest the coverage matrix, populating every test's coverage.
    ///
    /// The whole matrix is validated before any test is touched: on error no
    /// coverage is recorded.
    pub fn ingest_matrix<I, S>(&mut self, source: &str, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        info!("Parsing matrix from {source}");
        if self.tests.is_empty() {
            return Err(Error::Sequencing {
                pass: "coverage matrix",
                requires: "the test list must be ingested first",
            });
        }
        if self.lines.is_empty() {
            return Err(Error::Sequencing {
                pass: "coverage matrix",
                requires: "the line inventory must be ingested first",
            });
        }
        if self.matrix_ingested {
            return Err(Error::Sequencing {
                pass: "coverage matrix",
                requires: "coverage has already been ingested",
            });
        }

        let rows = data_rows(rows);
        if rows.len() != self.tests.len() {
            return Err(Error::RowCountMismatch {
                expected: self.tests.len(),
                found: rows.len(),
            });
        }

        let columns = self.column_order();
        let mut staged = Vec::with_capacity(rows.len());
        for ((row_number, row), test) in rows.iter().zip(&self.tests) {
            let coverage = parse_matrix_row(test, &columns, row)
                .map_err(|e| e.at_row(InputKind::Matrix, source, *row_number, row))?;
            staged.push(coverage);
        }

        for (test, coverage) in self.tests.iter_mut().zip(staged) {
            test.coverage = coverage;
        }
        self.matrix_ingested = true;
        debug!(
            "Matrix covers {} tests x {} lines",
            self.tests.len(),
            columns.len()
        );
        Ok(())
    }

    /// Line ids in matrix column order.
    fn column_order(&self) -> Vec<LineId> {
        let columns: Vec<LineId> = self.lines.iter().map(|l| l.id).collect();
        debug_assert!(
            columns.iter().enumerate().all(|(i, id)| id.index() == i),
            "line ids must match inventory order"
        );
        columns
    }
}

fn parse_matrix_row(test: &TestCase, columns: &[LineId], row: &str) -> Result<Vec<LineCoverage>> {
    let tokens: Vec<&str> = row.split_whitespace().collect();
    if tokens.len() != columns.len() + 1 {
        return Err(Error::MalformedRow {
            expected: columns.len() + 1,
            found: tokens.len(),
        });
    }

    let (marker, cells) = tokens
        .split_last()
        .ok_or(Error::MalformedRow {
            expected: columns.len() + 1,
            found: 0,
        })?;

    let mut coverage = Vec::with_capacity(cells.len());
    for (column, (token, line)) in cells.iter().zip(columns).enumerate() {
        let covered = match *token {
            "1" => true,
            "0" => false,
            other => {
                return Err(Error::InvalidToken {
                    token: other.to_string(),
                    column,
                })
            }
        };
        coverage.push(LineCoverage {
            line: *line,
            covered,
        });
    }

    let matrix_passed = match *marker {
        "+" => true,
        "-" => false,
        other => {
            return Err(Error::InvalidToken {
                token: other.to_string(),
                column: columns.len(),
            })
        }
    };
    if matrix_passed != test.passed {
        return Err(Error::OutcomeMismatch {
            test: test.name.clone(),
            passed: test.passed,
        });
    }

    Ok(coverage)
}
