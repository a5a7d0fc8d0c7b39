//! Fault-localization model.
//!
//! [`FaultModel`] is the single owner of every entity built from the SFL tool
//! output: source files, methods, lines, tests and statistics. Entities refer
//! to each other through typed indices into the model's collections, and each
//! collection is append-only, so an index handed out once stays valid for the
//! lifetime of the model.
//!
//! The ingestion passes must run in this order:
//!
//! 1. [`FaultModel::ingest_test_list`]
//! 2. [`FaultModel::ingest_line_inventory`]
//! 3. [`FaultModel::ingest_ranking`], once per algorithm
//! 4. [`FaultModel::ingest_matrix`]
//! 5. [`FaultModel::ingest_statistics`]

mod builder;
mod location;
mod matrix;

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;

pub use builder::{NoLocator, SourceLocator};
pub use location::{parse_line_location, parse_method_location, LineLocation, MethodLocation};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            /// Position of the entity in its owning collection.
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

entity_id!(
    /// Handle to a [`SourceFile`] in a [`FaultModel`].
    FileId
);
entity_id!(
    /// Handle to a [`Method`] in a [`FaultModel`].
    MethodId
);
entity_id!(
    /// Handle to a [`SourceLine`]. The index is the line's column in the coverage matrix.
    LineId
);
entity_id!(
    /// Handle to a [`TestCase`]. The index is the test's row in the coverage matrix.
    TestId
);

/// A source file, identified by package and class name.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    pub id: FileId,
    pub class_name: String,
    pub package_name: String,
    /// Repository-relative path, absent when the file was not found on disk.
    pub path: Option<PathBuf>,
}

/// A method, identified by name, owning file and parameter types.
#[derive(Debug, Clone, Serialize)]
pub struct Method {
    pub id: MethodId,
    pub file: FileId,
    pub name: String,
    pub parameters: Vec<String>,
}

/// Suspiciousness of one line according to one ranking algorithm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuspiciousnessMetric {
    pub algorithm: String,
    pub value: f64,
}

/// An instrumented source line.
#[derive(Debug, Clone, Serialize)]
pub struct SourceLine {
    pub id: LineId,
    pub method: MethodId,
    pub line_number: u32,
    /// At most one entry per algorithm, in ingestion order.
    pub metrics: Vec<SuspiciousnessMetric>,
}

impl SourceLine {
    /// Recorded suspiciousness for `algorithm`, if any.
    pub fn metric(&self, algorithm: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|m| m.algorithm == algorithm)
            .map(|m| m.value)
    }
}

/// Coverage of one line by one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineCoverage {
    pub line: LineId,
    pub covered: bool,
}

/// A test case and, once the matrix is ingested, its per-line coverage.
#[derive(Debug, Clone, Serialize)]
pub struct TestCase {
    pub id: TestId,
    pub name: String,
    pub passed: bool,
    /// Runtime as reported by the SFL tool (nanoseconds for GZoltar).
    pub runtime: u64,
    /// Present iff the test failed.
    pub stacktrace: Option<String>,
    /// One entry per inventoried line, in line order.
    pub coverage: Vec<LineCoverage>,
}

impl TestCase {
    /// Whether this test executed `line`.
    pub fn covers(&self, line: LineId) -> bool {
        self.coverage
            .get(line.index())
            .map(|c| c.covered)
            .unwrap_or(false)
    }
}

/// A summary statistic reported by the SFL tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistic {
    pub formula: String,
    pub metric_name: String,
    pub metric_value: f64,
}

/// Pass/fail counts over the ingested tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FileKey {
    package_name: String,
    class_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MethodKey {
    file: FileId,
    name: String,
    parameters: Vec<String>,
}

/// The deduplicated entity graph built from the SFL tool output.
#[derive(Debug, Default, Serialize)]
pub struct FaultModel {
    files: Vec<SourceFile>,
    methods: Vec<Method>,
    lines: Vec<SourceLine>,
    tests: Vec<TestCase>,
    statistics: Vec<Statistic>,
    #[serde(skip)]
    file_index: HashMap<FileKey, FileId>,
    #[serde(skip)]
    method_index: HashMap<MethodKey, MethodId>,
    #[serde(skip)]
    line_index: HashMap<(MethodId, u32), LineId>,
    #[serde(skip)]
    matrix_ingested: bool,
}

impl FaultModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// All source files, in creation order.
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// All methods, in creation order.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// All lines, in inventory order (the matrix column order).
    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }

    /// All tests, in test-list order (the matrix row order).
    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }

    /// Statistics from the most recent statistics pass.
    pub fn statistics(&self) -> &[Statistic] {
        &self.statistics
    }

    /// Whether the coverage matrix has been ingested.
    pub fn has_coverage(&self) -> bool {
        self.matrix_ingested
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0]
    }

    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.0]
    }

    pub fn line(&self, id: LineId) -> &SourceLine {
        &self.lines[id.0]
    }

    /// File that owns `line`.
    pub fn file_of(&self, line: &SourceLine) -> &SourceFile {
        self.file(self.method(line.method).file)
    }

    /// Look up a file by its identity.
    pub fn find_file(&self, package_name: &str, class_name: &str) -> Option<FileId> {
        self.file_index
            .get(&FileKey {
                package_name: package_name.to_string(),
                class_name: class_name.to_string(),
            })
            .copied()
    }

    /// Look up a method by its identity.
    pub fn find_method(&self, file: FileId, name: &str, parameters: &[String]) -> Option<MethodId> {
        self.method_index
            .get(&MethodKey {
                file,
                name: name.to_string(),
                parameters: parameters.to_vec(),
            })
            .copied()
    }

    /// Look up a line by its identity.
    pub fn find_line(&self, method: MethodId, line_number: u32) -> Option<LineId> {
        self.line_index.get(&(method, line_number)).copied()
    }

    /// Resolve a parsed location to a known line.
    pub fn find_location(&self, location: &LineLocation) -> Option<LineId> {
        let file = self.find_file(&location.method.package, &location.method.class_name)?;
        let method = self.find_method(file, &location.method.method, &location.method.parameters)?;
        self.find_line(method, location.line)
    }

    /// Rebuild the textual location of a line.
    pub fn line_location(&self, id: LineId) -> LineLocation {
        let line = self.line(id);
        let method = self.method(line.method);
        let file = self.file(method.file);
        LineLocation {
            method: MethodLocation {
                package: file.package_name.clone(),
                class_name: file.class_name.clone(),
                method: method.name.clone(),
                parameters: method.parameters.clone(),
            },
            line: line.line_number,
        }
    }

    /// Recorded suspiciousness of `line` for `algorithm`.
    pub fn metric(&self, line: LineId, algorithm: &str) -> Option<f64> {
        self.line(line).metric(algorithm)
    }

    /// Tests that executed `line`, failing tests first.
    pub fn covering_tests(&self, line: LineId) -> Vec<&TestCase> {
        let mut tests: Vec<&TestCase> = self.tests.iter().filter(|t| t.covers(line)).collect();
        tests.sort_by_key(|t| t.passed);
        tests
    }

    /// Pass/fail counts.
    pub fn test_summary(&self) -> TestSummary {
        let passed = self.tests.iter().filter(|t| t.passed).count();
        TestSummary {
            total: self.tests.len(),
            passed,
            failed: self.tests.len() - passed,
        }
    }

    /// Names of all algorithms recorded on any line, in first-seen order.
    pub fn algorithms(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for metric in self.lines.iter().flat_map(|l| &l.metrics) {
            if !seen.contains(&metric.algorithm.as_str()) {
                seen.push(&metric.algorithm);
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TESTS: &str = "name,outcome,runtime,stacktrace
pkg.CalcTest#testAdd,PASS,1200,
pkg.CalcTest#testSub,FAIL,3400,java.lang.AssertionError: expected 1
";

    const SPECTRA: &str = "name
pkg$Calc#add(int,int):10
pkg$Calc#add(int,int):11
pkg$Calc#sub(int,int):20
";

    fn model() -> FaultModel {
        let mut model = FaultModel::new();
        model.ingest_test_list("tests.csv", TESTS.lines()).unwrap();
        model
            .ingest_line_inventory("spectra.csv", SPECTRA.lines(), &NoLocator)
            .unwrap();
        model
            .ingest_ranking(
                "ochiai",
                "ochiai.ranking.csv",
                "pkg$Calc#sub(int,int):20;0.9\npkg$Calc#add(int,int):10;0.3".lines(),
            )
            .unwrap();
        model
            .ingest_matrix("matrix.txt", "1 1 1 +\n1 0 1 -".lines())
            .unwrap();
        model
    }

    #[test]
    fn test_find_location() {
        let model = model();
        let loc = parse_line_location("pkg$Calc#add(int,int):11").unwrap();
        let id = model.find_location(&loc).unwrap();
        assert_eq!(model.line(id).line_number, 11);
        assert_eq!(model.line_location(id), loc);
    }

    #[test]
    fn test_find_location_unknown() {
        let model = model();
        let loc = parse_line_location("pkg$Calc#add(int):11").unwrap();
        assert!(model.find_location(&loc).is_none());
    }

    #[test]
    fn test_covering_tests_failed_first() {
        let model = model();
        let tests = model.covering_tests(LineId(0));
        let names: Vec<_> = tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["pkg.CalcTest#testSub", "pkg.CalcTest#testAdd"]);

        let tests = model.covering_tests(LineId(1));
        assert_eq!(tests.len(), 1);
        assert!(tests[0].passed);
    }

    #[test]
    fn test_metric_lookup() {
        let model = model();
        assert_eq!(model.metric(LineId(2), "ochiai"), Some(0.9));
        assert_eq!(model.metric(LineId(1), "ochiai"), None);
        assert_eq!(model.metric(LineId(2), "tarantula"), None);
    }

    #[test]
    fn test_summary() {
        let summary = model().test_summary();
        assert_eq!(
            summary,
            TestSummary {
                total: 2,
                passed: 1,
                failed: 1
            }
        );
    }

    #[test]
    fn test_algorithms_first_seen_order() {
        let mut model = model();
        model
            .ingest_ranking("dstar", "dstar.ranking.csv", "pkg$Calc#add(int,int):11;1.0".lines())
            .unwrap();
        assert_eq!(model.algorithms(), vec!["ochiai", "dstar"]);
    }

    #[test]
    fn test_model_serializes_without_indexes() {
        let json = serde_json::to_value(model()).unwrap();
        assert_eq!(json["lines"].as_array().unwrap().len(), 3);
        assert_eq!(json["tests"][1]["passed"], false);
        assert!(json.get("file_index").is_none());
    }
}
