//! Configuration loading and management.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::ranking::DEFAULT_GAP_THRESHOLD;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the SFL tool output, relative to the repository root.
    pub build_path: PathBuf,
    /// Explicit input file locations.
    pub inputs: InputsConfig,
    /// Ranking algorithms to ingest, in report order.
    pub rankings: Vec<RankingConfig>,
    /// Algorithm used to order the report; defaults to the first ranking.
    pub ranking_order: Option<String>,
    /// Maximum line distance inside one block of suspicious lines.
    pub gap_threshold: u32,
    /// Output configuration.
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            build_path: PathBuf::from("target"),
            inputs: InputsConfig::default(),
            rankings: vec![RankingConfig::default()],
            ranking_order: None,
            gap_threshold: DEFAULT_GAP_THRESHOLD,
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit file path.
    ///
    /// Errors if the file does not exist. Use this for explicit `--config` flags.
    /// Env vars with `FAULTLINE_` prefix override file values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file_exact(path))
            .merge(Env::prefixed("FAULTLINE_").split("__"))
            .extract()
            .map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from directory, looking for faultline.toml or
    /// .faultline/faultline.toml.
    ///
    /// Missing files are silently skipped (defaults are used).
    /// Env vars with `FAULTLINE_` prefix override file/default values.
    pub fn load_default(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join("faultline.toml")))
            .merge(Toml::file(dir.join(".faultline/faultline.toml")))
            .merge(Env::prefixed("FAULTLINE_").split("__"))
            .extract()
            .map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints figment cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.rankings.is_empty() {
            return Err(Error::config("at least one ranking algorithm is required"));
        }
        let mut seen = HashSet::new();
        for ranking in &self.rankings {
            if ranking.algorithm.trim().is_empty() {
                return Err(Error::config("ranking algorithm name must not be empty"));
            }
            if !seen.insert(ranking.algorithm.as_str()) {
                return Err(Error::config(format!(
                    "ranking algorithm '{}' is listed twice",
                    ranking.algorithm
                )));
            }
            if !ranking.threshold.is_finite() {
                return Err(Error::config(format!(
                    "threshold for '{}' must be a finite number",
                    ranking.algorithm
                )));
            }
        }
        if let Some(order) = &self.ranking_order {
            if !seen.contains(order.as_str()) {
                return Err(Error::config(format!(
                    "ranking_order '{order}' must be one of the configured rankings"
                )));
            }
        }
        Ok(())
    }

    /// Algorithm that orders the report.
    pub fn primary_algorithm(&self) -> &str {
        self.ranking_order
            .as_deref()
            .or_else(|| self.rankings.first().map(|r| r.algorithm.as_str()))
            .unwrap_or_default()
    }

    /// Configured algorithm names, in configured order.
    pub fn algorithms(&self) -> Vec<String> {
        self.rankings.iter().map(|r| r.algorithm.clone()).collect()
    }

    /// Threshold configured for `algorithm`.
    pub fn threshold(&self, algorithm: &str) -> Option<f64> {
        self.rankings
            .iter()
            .find(|r| r.algorithm == algorithm)
            .map(|r| r.threshold)
    }
}

/// Explicit input file paths, relative to the repository root.
///
/// Anything left unset is searched for by file name under `build_path`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    /// Test list (default name `tests.csv`).
    pub tests: Option<PathBuf>,
    /// Line inventory (default name `spectra.csv`).
    pub spectra: Option<PathBuf>,
    /// Coverage matrix (default name `matrix.txt`).
    pub matrix: Option<PathBuf>,
    /// Statistics (default name `statistics.csv`).
    pub statistics: Option<PathBuf>,
}

/// One ranking algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Algorithm name as used in the ranking file name (e.g. `ochiai`).
    pub algorithm: String,
    /// Minimum suspiciousness for a line to be reported.
    pub threshold: f64,
    /// Explicit ranking file; defaults to `<algorithm>.ranking.csv`.
    pub file: Option<PathBuf>,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            algorithm: "ochiai".to_string(),
            threshold: 0.5,
            file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format.
    pub format: OutputFormat,
    /// Color output.
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON format.
    Json,
    /// Markdown format.
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "md" | "markdown" => Ok(Self::Markdown),
            _ => Err(format!("Unknown format: {s}. Use 'text', 'json', or 'md'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.build_path, PathBuf::from("target"));
        assert_eq!(config.gap_threshold, 5);
        assert_eq!(config.primary_algorithm(), "ochiai");
        assert_eq!(config.threshold("ochiai"), Some(0.5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "md".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert_eq!("TXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("html".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_config_from_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "faultline.toml",
                r#"
build_path = "build/sfl"
ranking_order = "tarantula"
gap_threshold = 3

[inputs]
matrix = "out/matrix.txt"

[[rankings]]
algorithm = "ochiai"
threshold = 0.7

[[rankings]]
algorithm = "tarantula"
threshold = 0.8
file = "out/tarantula.csv"
"#,
            )?;
            let config = Config::from_file("faultline.toml").unwrap();
            assert_eq!(config.build_path, PathBuf::from("build/sfl"));
            assert_eq!(config.gap_threshold, 3);
            assert_eq!(config.inputs.matrix, Some(PathBuf::from("out/matrix.txt")));
            assert!(config.inputs.tests.is_none());
            assert_eq!(config.algorithms(), vec!["ochiai", "tarantula"]);
            assert_eq!(config.primary_algorithm(), "tarantula");
            assert_eq!(
                config.rankings[1].file,
                Some(PathBuf::from("out/tarantula.csv"))
            );
            Ok(())
        });
    }

    #[test]
    fn test_config_load_default_dot_dir() {
        Jail::expect_with(|jail| {
            std::fs::create_dir(jail.directory().join(".faultline")).unwrap();
            jail.create_file(".faultline/faultline.toml", "gap_threshold = 9")?;
            let config = Config::load_default(".").unwrap();
            assert_eq!(config.gap_threshold, 9);
            Ok(())
        });
    }

    #[test]
    fn test_config_load_default_no_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load_default(".").unwrap();
            assert_eq!(config.rankings.len(), 1);
            Ok(())
        });
    }

    #[test]
    fn test_from_file_errors_on_missing_file() {
        let result = Config::from_file("/nonexistent/path/faultline.toml");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("not found"), "expected 'not found' in: {err}");
    }

    #[test]
    fn test_env_var_overrides_file_value() {
        Jail::expect_with(|jail| {
            jail.create_file("faultline.toml", "gap_threshold = 3")?;
            jail.set_env("FAULTLINE_GAP_THRESHOLD", "8");
            let config = Config::from_file("faultline.toml").unwrap();
            assert_eq!(config.gap_threshold, 8);
            Ok(())
        });
    }

    #[test]
    fn test_unknown_ranking_order_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("faultline.toml", "ranking_order = \"dstar\"")?;
            let err = Config::from_file("faultline.toml").unwrap_err();
            assert!(err.to_string().contains("dstar"));
            Ok(())
        });
    }

    #[test]
    fn test_validate_rejects_duplicates_and_empty() {
        let mut config = Config::default();
        config.rankings.push(RankingConfig::default());
        assert!(config.validate().is_err());

        config.rankings.clear();
        assert!(config.validate().is_err());

        config.rankings.push(RankingConfig {
            algorithm: "ochiai".to_string(),
            threshold: f64::NAN,
            file: None,
        });
        assert!(config.validate().is_err());
    }
}
