//! Locating and reading the SFL tool output from disk.
//!
//! The model itself never touches the filesystem; this module resolves the
//! input files, reads them, and feeds the rows to the ingestion passes in
//! the order the model requires.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::Config;
use crate::core::{Error, Result};
use crate::model::{FaultModel, SourceLocator};

const TESTS_FILE: &str = "tests.csv";
const SPECTRA_FILE: &str = "spectra.csv";
const MATRIX_FILE: &str = "matrix.txt";
const STATISTICS_FILE: &str = "statistics.csv";

/// Concrete paths of every input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFiles {
    pub tests: PathBuf,
    pub spectra: PathBuf,
    pub matrix: PathBuf,
    pub statistics: PathBuf,
    /// `(algorithm, path)` in configured order.
    pub rankings: Vec<(String, PathBuf)>,
}

impl InputFiles {
    /// Resolve input files from explicit config paths, falling back to a
    /// by-name search under the build directory.
    pub fn resolve(root: &Path, config: &Config) -> Result<Self> {
        let build = root.join(&config.build_path);
        let pick = |explicit: &Option<PathBuf>, name: &str| -> Result<PathBuf> {
            match explicit {
                Some(path) => existing(root.join(path)),
                None => find_file(&build, name),
            }
        };

        let rankings = config
            .rankings
            .iter()
            .map(|r| {
                let name = format!("{}.ranking.csv", r.algorithm);
                pick(&r.file, &name).map(|path| (r.algorithm.clone(), path))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            tests: pick(&config.inputs.tests, TESTS_FILE)?,
            spectra: pick(&config.inputs.spectra, SPECTRA_FILE)?,
            matrix: pick(&config.inputs.matrix, MATRIX_FILE)?,
            statistics: pick(&config.inputs.statistics, STATISTICS_FILE)?,
            rankings,
        })
    }
}

fn existing(path: PathBuf) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::FileNotFound { path })
    }
}

/// First file named `name` under `dir`, in sorted walk order.
pub fn find_file(dir: &Path, name: &str) -> Result<PathBuf> {
    debug!("Searching {} for {name}", dir.display());
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| e.file_type().is_file() && e.file_name() == name)
        .map(|e| e.into_path())
        .ok_or_else(|| Error::FileNotFound {
            path: dir.join(name),
        })
}

/// Finds Java sources on disk by package and class name.
#[derive(Debug, Clone)]
pub struct FsLocator {
    sources: Vec<PathBuf>,
}

impl FsLocator {
    /// Index every `.java` file under `root`, skipping `exclude` (the build directory).
    pub fn new(root: impl Into<PathBuf>, exclude: Option<PathBuf>) -> Self {
        let root = root.into();
        let sources = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_excluded(e.path(), exclude.as_deref()) && !is_hidden(e.path(), &root))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "java"))
            .filter_map(|e| e.path().strip_prefix(&root).ok().map(Path::to_path_buf))
            .collect::<Vec<_>>();
        debug!("Indexed {} Java sources under {}", sources.len(), root.display());
        Self { sources }
    }
}

fn is_excluded(path: &Path, exclude: Option<&Path>) -> bool {
    exclude.is_some_and(|ex| path.starts_with(ex))
}

fn is_hidden(path: &Path, root: &Path) -> bool {
    path != root
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'))
}

impl SourceLocator for FsLocator {
    fn locate(&self, package: &str, class_name: &str) -> Option<PathBuf> {
        // Nested classes live in their outermost class's file.
        let outer = class_name.split('$').next().unwrap_or(class_name);
        let file_name = format!("{outer}.java");
        let segments: Vec<&str> = package.split('.').filter(|s| !s.is_empty()).collect();

        self.sources
            .iter()
            .find(|path| {
                path.file_name().is_some_and(|n| n == file_name.as_str())
                    && contains_in_order(path, &segments)
            })
            .cloned()
    }
}

/// Whether the directory components of `path` contain `segments` in order.
fn contains_in_order(path: &Path, segments: &[&str]) -> bool {
    let mut wanted = segments.iter().peekable();
    for component in path.parent().into_iter().flat_map(Path::components) {
        if let (Component::Normal(name), Some(next)) = (component, wanted.peek()) {
            if name == **next {
                wanted.next();
            }
        }
    }
    wanted.peek().is_none()
}

fn read_rows(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Read every input and build the model, running the passes in order.
pub fn load_model(root: &Path, config: &Config, locator: &dyn SourceLocator) -> Result<FaultModel> {
    let files = InputFiles::resolve(root, config)?;
    load_files(&files, locator)
}

/// Build the model from already-resolved input files.
pub fn load_files(files: &InputFiles, locator: &dyn SourceLocator) -> Result<FaultModel> {
    let mut model = FaultModel::new();
    let name = |p: &Path| p.display().to_string();

    model.ingest_test_list(&name(&files.tests), read_rows(&files.tests)?)?;
    model.ingest_line_inventory(&name(&files.spectra), read_rows(&files.spectra)?, locator)?;
    for (algorithm, path) in &files.rankings {
        model.ingest_ranking(algorithm, &name(path), read_rows(path)?)?;
    }
    model.ingest_matrix(&name(&files.matrix), read_rows(&files.matrix)?)?;
    model.ingest_statistics(&name(&files.statistics), read_rows(&files.statistics)?)?;

    info!(
        "Loaded {} tests, {} files, {} methods, {} lines",
        model.tests().len(),
        model.files().len(),
        model.methods().len(),
        model.lines().len()
    );
    Ok(model)
}
