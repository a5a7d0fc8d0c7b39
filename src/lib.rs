//! Faultline - spectrum-based fault localization models for Java projects.
//!
//! Faultline reads the output of an SFL tool (test list, line inventory,
//! per-algorithm rankings, coverage matrix and statistics), builds a
//! deduplicated [`FaultModel`], groups suspicious lines into blocks and
//! renders reports. It also maps new-file line numbers to diff positions so
//! findings can be posted as review comments.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use faultline::config::Config;
//! use faultline::loader::{load_model, FsLocator};
//! use faultline::report::Report;
//!
//! let config = Config::default();
//! let root = Path::new(".");
//! let locator = FsLocator::new(root, Some(root.join(&config.build_path)));
//! let model = load_model(root, &config, &locator).unwrap();
//! let report = Report::build(&model, &config);
//! println!("{} suspicious blocks", report.blocks.len());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod diff;
pub mod loader;
pub mod model;
pub mod output;
pub mod ranking;
pub mod report;

pub use crate::core::{Error, Result};
pub use diff::{resolve_diff_position, DiffPositionMap};
pub use model::FaultModel;
