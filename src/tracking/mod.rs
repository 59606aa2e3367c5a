//! Tracking client - the boundary to the experiment/run store
//!
//! The run lifecycle controller only talks to the store through
//! [`TrackingClient`]. [`LocalTracking`] is the bundled implementation
//! (in-memory, or persisted to a directory); [`ActiveRun`] scopes a run so
//! that it is closed on every exit path.

mod active_run;
mod local;

pub use active_run::ActiveRun;
pub use local::{LocalTracking, STORE_FILE};

use crate::experiment::{ArtifactRecord, ExperimentRecord, ModelStage, ModelVersion, RunRecord, RunStatus};
use crate::Result;
use std::collections::BTreeMap;

/// Tag that renames a run when set.
pub const RUN_NAME_TAG: &str = "run_name";

/// Operations the run recorder needs from a tracking backend.
///
/// Implementations must attribute every write under a run id to that run
/// and be safe to share across threads.
pub trait TrackingClient: Send + Sync {
    /// Look up an experiment by name, creating it if absent. `None` selects
    /// the default experiment.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn get_or_create_experiment(&self, name: Option<&str>) -> Result<ExperimentRecord>;

    /// Get an experiment by id.
    ///
    /// # Errors
    ///
    /// [`crate::Error::ExperimentNotFound`] for an unknown id.
    fn get_experiment(&self, experiment_id: &str) -> Result<ExperimentRecord>;

    /// Set an experiment tag.
    ///
    /// # Errors
    ///
    /// [`crate::Error::ExperimentNotFound`] for an unknown id.
    fn set_experiment_tag(&self, experiment_id: &str, key: &str, value: &str) -> Result<()>;

    /// Create a running run; the store assigns its id and start time.
    ///
    /// # Errors
    ///
    /// [`crate::Error::ExperimentNotFound`] for an unknown experiment.
    fn create_run(&self, experiment_id: &str, run_name: Option<&str>) -> Result<RunRecord>;

    /// Get a snapshot of a run.
    ///
    /// # Errors
    ///
    /// [`crate::Error::RunNotFound`] for an unknown id.
    fn get_run(&self, run_id: &str) -> Result<RunRecord>;

    /// All runs of an experiment, oldest first.
    ///
    /// # Errors
    ///
    /// [`crate::Error::ExperimentNotFound`] for an unknown id.
    fn search_runs(&self, experiment_id: &str) -> Result<Vec<RunRecord>>;

    /// Set a run tag; allowed after the run ended.
    ///
    /// # Errors
    ///
    /// [`crate::Error::RunNotFound`] for an unknown id.
    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    /// Log a write-once param.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Persistence`] if the run ended or the param exists
    /// with another value.
    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    /// Log a metric value.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Persistence`] if the run ended.
    fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()>;

    /// Latest value of every metric of a run.
    ///
    /// # Errors
    ///
    /// [`crate::Error::RunNotFound`] for an unknown id.
    fn latest_metrics(&self, run_id: &str) -> Result<BTreeMap<String, f64>>;

    /// Store `bytes` at `path` under the run's artifact root.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Persistence`] if the path is invalid or the write fails.
    fn log_artifact(&self, run_id: &str, path: &str, bytes: &[u8]) -> Result<ArtifactRecord>;

    /// Read back an artifact.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Persistence`] if no such artifact exists.
    fn read_artifact(&self, run_id: &str, path: &str) -> Result<Vec<u8>>;

    /// End a run; the store fixes its end time.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Persistence`] if the run already ended.
    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<()>;

    /// Create a registered model version.
    ///
    /// # Errors
    ///
    /// [`crate::Error::RunNotFound`] if the run is unknown.
    fn create_model_version(&self, name: &str, source: &str, run_id: &str) -> Result<ModelVersion>;

    /// Move a registered model version to another stage.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Registration`] if the model or version is unknown.
    fn transition_model_version_stage(
        &self,
        name: &str,
        version: u32,
        stage: ModelStage,
        archive_existing: bool,
    ) -> Result<ModelVersion>;

    /// All versions of a registered model, oldest first.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn model_versions(&self, name: &str) -> Result<Vec<ModelVersion>>;

    /// URI of a run's artifact root.
    fn artifact_uri(&self, run_id: &str) -> String {
        format!("runs:/{run_id}")
    }
}
