//! Experiment Store - in-memory state of the tracking backend
//!
//! Holds experiments, runs, the metric history and the model registry, and
//! enforces the write rules of the tracking schema. The store is plain data
//! (`&mut self` methods, serde-serializable); sharing and persistence are
//! layered on top by [`crate::tracking::LocalTracking`].

use std::collections::BTreeMap;

use super::{
    ExperimentRecord, MetricRecord, ModelStage, ModelVersion, RunRecord, RunStatus,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the experiment used when none is requested.
pub const DEFAULT_EXPERIMENT_NAME: &str = "Default";

/// Id reserved for the default experiment.
pub const DEFAULT_EXPERIMENT_ID: &str = "0";

/// In-memory store for experiment tracking data.
///
/// ## Write rules
///
/// - Params are write-once per run: re-logging an identical value is a
///   no-op, a different value is rejected.
/// - Params and metrics are only accepted while the run is `Running`.
/// - Metrics append to a step-indexed history; the latest step is the
///   current value.
/// - Tags are accepted at any time, including after the run ended.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ExperimentStore {
    experiments: BTreeMap<String, ExperimentRecord>,
    runs: BTreeMap<String, RunRecord>,
    metrics: Vec<MetricRecord>,
    registered_models: BTreeMap<String, Vec<ModelVersion>>,
    next_experiment_id: u64,
}

impl ExperimentStore {
    /// Create a new empty experiment store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of experiments, the default one included once created.
    #[must_use]
    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    /// Number of runs across all experiments.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Number of metric points logged.
    #[must_use]
    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }

    /// Look up an experiment by name, creating it if absent.
    ///
    /// The default experiment always receives id `"0"`; other experiments
    /// get sequential ids starting at `"1"`.
    pub fn get_or_create_experiment(&mut self, name: &str) -> &ExperimentRecord {
        let existing = self
            .experiment_by_name(name)
            .map(|e| e.experiment_id().to_string());
        let id = match existing {
            Some(id) => id,
            None => {
                let id = if name == DEFAULT_EXPERIMENT_NAME
                    && !self.experiments.contains_key(DEFAULT_EXPERIMENT_ID)
                {
                    DEFAULT_EXPERIMENT_ID.to_string()
                } else {
                    self.allocate_experiment_id()
                };
                tracing::info!(experiment_id = %id, name, "created experiment");
                self.experiments
                    .insert(id.clone(), ExperimentRecord::new(id.clone(), name));
                id
            }
        };
        &self.experiments[&id]
    }

    fn allocate_experiment_id(&mut self) -> String {
        loop {
            self.next_experiment_id += 1;
            let id = self.next_experiment_id.to_string();
            if !self.experiments.contains_key(&id) {
                return id;
            }
        }
    }

    /// Get an experiment by name.
    #[must_use]
    pub fn experiment_by_name(&self, name: &str) -> Option<&ExperimentRecord> {
        self.experiments.values().find(|e| e.name() == name)
    }

    /// Get an experiment by ID.
    #[must_use]
    pub fn get_experiment(&self, experiment_id: &str) -> Option<&ExperimentRecord> {
        self.experiments.get(experiment_id)
    }

    /// Set a tag on an experiment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExperimentNotFound`] for an unknown id.
    pub fn set_experiment_tag(&mut self, experiment_id: &str, key: &str, value: &str) -> Result<()> {
        self.experiments
            .get_mut(experiment_id)
            .ok_or_else(|| Error::ExperimentNotFound(experiment_id.to_string()))?
            .set_tag(key, value);
        Ok(())
    }

    /// Create and start a run under `experiment_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExperimentNotFound`] for an unknown experiment.
    pub fn create_run(&mut self, experiment_id: &str, run_name: Option<&str>) -> Result<RunRecord> {
        if !self.experiments.contains_key(experiment_id) {
            return Err(Error::ExperimentNotFound(experiment_id.to_string()));
        }
        let run_id = Uuid::new_v4().simple().to_string();
        let mut builder = RunRecord::builder(run_id.clone(), experiment_id);
        if let Some(name) = run_name {
            builder = builder.run_name(name);
        }
        let mut run = builder.build();
        run.start();
        self.runs.insert(run_id, run.clone());
        Ok(run)
    }

    /// Get a run by ID.
    #[must_use]
    pub fn get_run(&self, run_id: &str) -> Option<&RunRecord> {
        self.runs.get(run_id)
    }

    /// Get a run by ID for mutation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunNotFound`] for an unknown id.
    pub fn run_mut(&mut self, run_id: &str) -> Result<&mut RunRecord> {
        self.runs
            .get_mut(run_id)
            .ok_or_else(|| Error::RunNotFound(run_id.to_string()))
    }

    /// Get a run that still accepts params and metrics.
    fn active_run_mut(&mut self, run_id: &str, what: &str) -> Result<&mut RunRecord> {
        let run = self.run_mut(run_id)?;
        if run.status() != RunStatus::Running {
            return Err(Error::Persistence(format!(
                "cannot log {what} to run {run_id}: run is {:?}",
                run.status()
            )));
        }
        Ok(run)
    }

    /// Get all runs for an experiment.
    #[must_use]
    pub fn get_runs_for_experiment(&self, experiment_id: &str) -> Vec<&RunRecord> {
        self.runs
            .values()
            .filter(|run| run.experiment_id() == experiment_id)
            .collect()
    }

    /// Set a tag on a run in any status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunNotFound`] for an unknown id.
    pub fn set_tag(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.run_mut(run_id)?.set_tag(key, value);
        Ok(())
    }

    /// Log a write-once param on a running run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the run is not running or the param
    /// was already logged with a different value.
    pub fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.active_run_mut(run_id, "param")?
            .log_param(key, value)
            .map_err(|existing| {
                Error::Persistence(format!(
                    "param '{key}' of run {run_id} already logged as '{existing}', refusing '{value}'"
                ))
            })
    }

    /// Append a metric value on a running run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the run is not running.
    pub fn log_metric(&mut self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.active_run_mut(run_id, "metric")?;
        let step = self
            .metrics
            .iter()
            .filter(|m| m.belongs_to(run_id, key))
            .count() as u64;
        self.add_metric(MetricRecord::new(run_id, key, step, value));
        Ok(())
    }

    /// Add a metric to the store.
    pub fn add_metric(&mut self, metric: MetricRecord) {
        self.metrics.push(metric);
    }

    /// Get metrics for a specific run and key, ordered by step.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use wine_quality::experiment::{ExperimentStore, MetricRecord};
    ///
    /// let mut store = ExperimentStore::new();
    /// for step in 0..10 {
    ///     store.add_metric(MetricRecord::new("run-001", "rmse", step, 1.0 / (step as f64 + 1.0)));
    /// }
    ///
    /// assert_eq!(store.get_metrics_for_run("run-001", "rmse").len(), 10);
    /// ```
    #[must_use]
    pub fn get_metrics_for_run(&self, run_id: &str, key: &str) -> Vec<MetricRecord> {
        let mut metrics: Vec<MetricRecord> = self
            .metrics
            .iter()
            .filter(|m| m.belongs_to(run_id, key))
            .cloned()
            .collect();

        // Sort by step for time-series ordering
        metrics.sort_by_key(MetricRecord::step);

        metrics
    }

    /// Latest value of every metric logged by a run.
    #[must_use]
    pub fn latest_metrics(&self, run_id: &str) -> BTreeMap<String, f64> {
        let mut latest: BTreeMap<&str, &MetricRecord> = BTreeMap::new();
        for m in self.metrics.iter().filter(|m| m.run_id() == run_id) {
            let current = latest.entry(m.key()).or_insert(m);
            if !current.supersedes(m) {
                *current = m;
            }
        }
        latest
            .into_iter()
            .map(|(key, m)| (key.to_string(), m.value()))
            .collect()
    }

    /// End a run with a terminal status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunNotFound`] for an unknown id and
    /// [`Error::Persistence`] if the run already ended or `status` is not
    /// terminal.
    pub fn end_run(&mut self, run_id: &str, status: RunStatus) -> Result<()> {
        if !status.is_terminal() {
            return Err(Error::Persistence(format!(
                "cannot end run {run_id} with non-terminal status {status:?}"
            )));
        }
        let run = self.run_mut(run_id)?;
        if run.status().is_terminal() {
            return Err(Error::Persistence(format!(
                "run {run_id} already ended as {:?}",
                run.status()
            )));
        }
        run.complete(status);
        Ok(())
    }

    /// Register a new version of `name` pointing at `source`.
    ///
    /// The registered model is created on first use; versions are numbered
    /// from 1 per name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunNotFound`] if `run_id` is unknown.
    pub fn create_model_version(&mut self, name: &str, source: &str, run_id: &str) -> Result<ModelVersion> {
        if !self.runs.contains_key(run_id) {
            return Err(Error::RunNotFound(run_id.to_string()));
        }
        let versions = self.registered_models.entry(name.to_string()).or_default();
        let next = versions.iter().map(ModelVersion::version).max().unwrap_or(0) + 1;
        let version = ModelVersion::new(name, next, run_id, source);
        versions.push(version.clone());
        Ok(version)
    }

    /// Move a version to `stage`.
    ///
    /// With `archive_existing` and an active target stage, every other
    /// version of the model currently in that stage becomes `Archived`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Registration`] if the model or version is unknown.
    pub fn transition_model_version_stage(
        &mut self,
        name: &str,
        version: u32,
        stage: ModelStage,
        archive_existing: bool,
    ) -> Result<ModelVersion> {
        let versions = self
            .registered_models
            .get_mut(name)
            .ok_or_else(|| Error::Registration(format!("registered model '{name}' not found")))?;
        if !versions.iter().any(|v| v.version() == version) {
            return Err(Error::Registration(format!(
                "version {version} of registered model '{name}' not found"
            )));
        }

        let mut updated = None;
        for v in versions.iter_mut() {
            if v.version() == version {
                v.set_stage(stage);
                updated = Some(v.clone());
            } else if archive_existing && stage.is_active() && v.stage() == stage {
                tracing::info!(name, version = v.version(), "archiving superseded model version");
                v.set_stage(ModelStage::Archived);
            }
        }
        updated.ok_or_else(|| Error::Registration(format!("version {version} of '{name}' vanished")))
    }

    /// All versions of a registered model, oldest first.
    #[must_use]
    pub fn model_versions(&self, name: &str) -> Vec<ModelVersion> {
        self.registered_models.get(name).cloned().unwrap_or_default()
    }
}
