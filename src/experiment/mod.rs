//! Experiment Tracking Schema
//!
//! Data structures for the tracked experiment store: the unit of
//! reproducibility is a [`RunRecord`] owned by exactly one
//! [`ExperimentRecord`].
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentRecord (1) ──< RunRecord (N)
//!                              │
//!                              ├──< MetricRecord (N) [step-indexed history]
//!                              ├──< ArtifactRecord (N) [CAS]
//!                              └──< ModelVersion (N) [registry, by name]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use wine_quality::experiment::{ExperimentStore, RunStatus};
//!
//! let mut store = ExperimentStore::new();
//! let experiment_id = store.get_or_create_experiment("wine").experiment_id().to_string();
//!
//! let run = store.create_run(&experiment_id, None)?;
//! store.log_param(run.run_id(), "max_leaf_nodes", "32")?;
//! store.log_metric(run.run_id(), "rmse", 0.71)?;
//! store.end_run(run.run_id(), RunStatus::Success)?;
//! # Ok::<(), wine_quality::Error>(())
//! ```

mod artifact_record;
mod experiment_record;
mod metric_record;
mod model_version;
mod run_record;
mod store;

pub use artifact_record::{cas_hash, ArtifactRecord};
pub use experiment_record::{ExperimentRecord, ExperimentRecordBuilder};
pub use metric_record::MetricRecord;
pub use model_version::{ModelStage, ModelVersion};
pub use run_record::{RunRecord, RunRecordBuilder, RunStatus};
pub use store::{ExperimentStore, DEFAULT_EXPERIMENT_ID, DEFAULT_EXPERIMENT_NAME};
