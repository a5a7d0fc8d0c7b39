//! Error types for the faultline library.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using faultline's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of SFL input a row was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Test list (`tests.csv`).
    Tests,
    /// Line inventory (`spectra.csv`).
    Spectra,
    /// Per-algorithm ranking (`<algorithm>.ranking.csv`).
    Ranking,
    /// Coverage matrix (`matrix.txt`).
    Matrix,
    /// Summary statistics (`statistics.csv`).
    Statistics,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tests => "test list",
            Self::Spectra => "line inventory",
            Self::Ranking => "ranking",
            Self::Matrix => "coverage matrix",
            Self::Statistics => "statistics",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while building or querying the fault-localization model.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found.
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A `package$Class#method(params):line` location could not be parsed.
    #[error("Malformed location '{location}': {reason}")]
    MalformedLocation { location: String, reason: String },

    /// A row does not have the shape its format requires.
    #[error("Invalid format: {reason}")]
    InvalidFormat { reason: String },

    /// An ingestion pass ran before the pass it depends on.
    #[error("Cannot ingest {pass}: {requires}")]
    Sequencing {
        pass: &'static str,
        requires: &'static str,
    },

    /// A ranking or matrix row references an entity absent from the inventory.
    #[error("Unknown {entity} '{location}' is not part of the line inventory")]
    InconsistentWithInventory {
        entity: &'static str,
        location: String,
    },

    /// The same algorithm reported twice for one line.
    #[error("Duplicate '{algorithm}' suspiciousness for line {location}")]
    DuplicateMetric { algorithm: String, location: String },

    /// The matrix outcome marker disagrees with the test list.
    #[error(
        "Outcome mismatch for test '{test}': test list says {}, matrix says {}",
        outcome(.passed),
        matrix_outcome(.passed)
    )]
    OutcomeMismatch { test: String, passed: bool },

    /// The matrix row count differs from the number of tests.
    #[error("Matrix has {found} rows but {expected} tests were ingested")]
    RowCountMismatch { expected: usize, found: usize },

    /// A matrix row has the wrong number of tokens.
    #[error("Matrix row has {found} tokens, expected {expected}")]
    MalformedRow { expected: usize, found: usize },

    /// A matrix token is not valid for its column.
    #[error("Invalid matrix token '{token}' in column {column}")]
    InvalidToken { token: String, column: usize },

    /// The requested new-file line is not inside any hunk of the patch.
    #[error("Line {line} is not part of any diff hunk")]
    LineNotInAnyHunk { line: u32 },

    /// Row-level failure annotated with where it came from.
    #[error("Failed to ingest {input} '{source_name}' at row {row_number} ('{row}'): {source}")]
    Ingest {
        input: InputKind,
        source_name: String,
        row_number: usize,
        row: String,
        #[source]
        source: Box<Error>,
    },
}

fn outcome(passed: &bool) -> &'static str {
    if *passed {
        "PASS"
    } else {
        "FAIL"
    }
}

fn matrix_outcome(passed: &bool) -> &'static str {
    outcome(&!*passed)
}

impl Error {
    /// Create a new invalid format error.
    pub fn invalid_format(reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            reason: reason.into(),
        }
    }

    /// Create a new malformed location error.
    pub fn malformed_location(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedLocation {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Wrap a row-level error with its input, source name and raw row.
    pub fn at_row(
        self,
        input: InputKind,
        source_name: &str,
        row_number: usize,
        row: &str,
    ) -> Self {
        Self::Ingest {
            input,
            source_name: source_name.to_string(),
            row_number,
            row: row.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with all row context stripped.
    pub fn root(&self) -> &Error {
        match self {
            Self::Ingest { source, .. } => source.root(),
            other => other,
        }
    }
}
