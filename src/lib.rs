//! # Wine-Quality: Tracked Decision-Tree Training Runs
//!
//! **Version**: 0.1.0
//!
//! Wine-Quality sequences one supervised-learning experiment run end to end:
//! partition a labeled CSV, fit a decision-tree regressor, evaluate it on
//! the holdout rows, and record everything (tags, params, metrics, model,
//! plot, optional registration and export) against a tracked run.
//!
//! ## Design Principles
//!
//! - **Deterministic partitioning**: fixed 30% holdout and seed 42
//! - **Scoped runs**: every run is closed on every exit path
//! - **Two-phase tagging**: timing tags are written after the store closes the run
//! - **Injected collaborators**: tracking store, registrar and exporter are traits
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wine_quality::config::TrainConfig;
//! use wine_quality::recorder::train_from_config;
//! use wine_quality::tracking::LocalTracking;
//!
//! let config = TrainConfig {
//!     data_path: "data/wine-quality-white.csv".to_string(),
//!     max_depth: Some(6),
//!     ..TrainConfig::default()
//! };
//! let client = Arc::new(LocalTracking::open("mlruns")?);
//! let outcome = train_from_config(&config, client)?;
//! println!("{} {}", outcome.experiment_id, outcome.run_id);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod data;
pub mod error;
pub mod experiment;
pub mod export;
pub mod metrics;
pub mod model;
pub mod plot;
pub mod recorder;
pub mod registry;
pub mod timestamp;
pub mod tracking;

pub use error::{Error, Result};
