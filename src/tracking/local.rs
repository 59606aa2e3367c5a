//! Local tracking backend
//!
//! Wraps an [`ExperimentStore`] in a mutex. With a root directory, every
//! write is followed by a JSON snapshot of the store and artifacts are
//! written as plain files, so a later process opening the same directory
//! sees the same experiments, runs and registered models:
//!
//! ```text
//! <root>/store.json
//! <root>/artifacts/<run_id>/<artifact path>
//! ```

use super::{TrackingClient, RUN_NAME_TAG};
use crate::experiment::{
    ArtifactRecord, ExperimentRecord, ExperimentStore, ModelStage, ModelVersion, RunRecord,
    RunStatus, DEFAULT_EXPERIMENT_NAME,
};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Snapshot file name inside the tracking directory.
pub const STORE_FILE: &str = "store.json";

#[derive(Debug, Default)]
struct State {
    store: ExperimentStore,
    /// Artifact bytes keyed by `(run_id, path)`; only used without a root.
    blobs: HashMap<(String, String), Vec<u8>>,
}

/// Tracking backend held in process memory, optionally persisted to disk.
#[derive(Debug)]
pub struct LocalTracking {
    root: Option<PathBuf>,
    state: Mutex<State>,
}

impl LocalTracking {
    /// Create a backend that keeps everything in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            root: None,
            state: Mutex::new(State::default()),
        }
    }

    /// Open (or initialize) a tracking directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the directory cannot be created or
    /// an existing snapshot cannot be parsed.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            Error::Persistence(format!("Failed to create tracking directory {}: {e}", root.display()))
        })?;

        let snapshot = root.join(STORE_FILE);
        let store = if snapshot.exists() {
            let bytes = fs::read(&snapshot).map_err(|e| {
                Error::Persistence(format!("Failed to read {}: {e}", snapshot.display()))
            })?;
            serde_json::from_slice(&bytes).map_err(|e| {
                Error::Persistence(format!("Corrupt tracking snapshot {}: {e}", snapshot.display()))
            })?
        } else {
            ExperimentStore::new()
        };
        tracing::debug!(
            root = %root.display(),
            experiments = store.experiment_count(),
            runs = store.run_count(),
            metrics = store.metric_count(),
            "opened tracking directory"
        );

        Ok(Self {
            root: Some(root),
            state: Mutex::new(State {
                store,
                blobs: HashMap::new(),
            }),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::Persistence("tracking store lock poisoned".to_string()))
    }

    fn read<T>(&self, f: impl FnOnce(&ExperimentStore) -> Result<T>) -> Result<T> {
        let state = self.lock()?;
        f(&state.store)
    }

    fn write<T>(&self, f: impl FnOnce(&mut ExperimentStore) -> Result<T>) -> Result<T> {
        let mut state = self.lock()?;
        let out = f(&mut state.store)?;
        self.persist(&state.store)?;
        Ok(out)
    }

    fn persist(&self, store: &ExperimentStore) -> Result<()> {
        let Some(root) = &self.root else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(store)?;
        let tmp = root.join(format!("{STORE_FILE}.tmp"));
        let target = root.join(STORE_FILE);
        fs::write(&tmp, bytes)
            .and_then(|()| fs::rename(&tmp, &target))
            .map_err(|e| Error::Persistence(format!("Failed to write {}: {e}", target.display())))
    }

    fn artifact_file(root: &Path, run_id: &str, path: &str) -> PathBuf {
        root.join("artifacts").join(run_id).join(path)
    }
}

/// Reject absolute paths and parent-directory escapes.
fn validate_artifact_path(path: &str) -> Result<()> {
    let p = Path::new(path);
    let valid = !path.is_empty()
        && p.components().all(|c| matches!(c, Component::Normal(_)));
    if valid {
        Ok(())
    } else {
        Err(Error::Persistence(format!(
            "artifact path '{path}' must be relative and stay inside the run"
        )))
    }
}

impl TrackingClient for LocalTracking {
    fn get_or_create_experiment(&self, name: Option<&str>) -> Result<ExperimentRecord> {
        let name = name.unwrap_or(DEFAULT_EXPERIMENT_NAME);
        self.write(|store| Ok(store.get_or_create_experiment(name).clone()))
    }

    fn get_experiment(&self, experiment_id: &str) -> Result<ExperimentRecord> {
        self.read(|store| {
            store
                .get_experiment(experiment_id)
                .cloned()
                .ok_or_else(|| Error::ExperimentNotFound(experiment_id.to_string()))
        })
    }

    fn set_experiment_tag(&self, experiment_id: &str, key: &str, value: &str) -> Result<()> {
        self.write(|store| store.set_experiment_tag(experiment_id, key, value))
    }

    fn create_run(&self, experiment_id: &str, run_name: Option<&str>) -> Result<RunRecord> {
        self.write(|store| store.create_run(experiment_id, run_name))
    }

    fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        self.read(|store| {
            store
                .get_run(run_id)
                .cloned()
                .ok_or_else(|| Error::RunNotFound(run_id.to_string()))
        })
    }

    fn search_runs(&self, experiment_id: &str) -> Result<Vec<RunRecord>> {
        self.read(|store| {
            if store.get_experiment(experiment_id).is_none() {
                return Err(Error::ExperimentNotFound(experiment_id.to_string()));
            }
            let mut runs: Vec<RunRecord> = store
                .get_runs_for_experiment(experiment_id)
                .into_iter()
                .cloned()
                .collect();
            runs.sort_by_key(RunRecord::started_at);
            Ok(runs)
        })
    }

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.write(|store| {
            store.set_tag(run_id, key, value)?;
            if key == RUN_NAME_TAG {
                store.run_mut(run_id)?.set_run_name(value);
            }
            Ok(())
        })
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.write(|store| store.log_param(run_id, key, value))
    }

    fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.write(|store| store.log_metric(run_id, key, value))
    }

    fn latest_metrics(&self, run_id: &str) -> Result<BTreeMap<String, f64>> {
        self.read(|store| {
            if store.get_run(run_id).is_none() {
                return Err(Error::RunNotFound(run_id.to_string()));
            }
            Ok(store.latest_metrics(run_id))
        })
    }

    fn log_artifact(&self, run_id: &str, path: &str, bytes: &[u8]) -> Result<ArtifactRecord> {
        validate_artifact_path(path)?;
        let mut state = self.lock()?;
        state.store.get_run(run_id).ok_or_else(|| Error::RunNotFound(run_id.to_string()))?;

        if let Some(root) = &self.root {
            let file = Self::artifact_file(root, run_id, path);
            if let Some(parent) = file.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::Persistence(format!("Failed to create {}: {e}", parent.display()))
                })?;
            }
            fs::write(&file, bytes).map_err(|e| {
                Error::Persistence(format!("Failed to write artifact {}: {e}", file.display()))
            })?;
        } else {
            state
                .blobs
                .insert((run_id.to_string(), path.to_string()), bytes.to_vec());
        }

        let artifact = ArtifactRecord::from_bytes(run_id, path, bytes);
        state.store.run_mut(run_id)?.add_artifact(artifact.clone());
        self.persist(&state.store)?;
        tracing::debug!(run_id, path, size = bytes.len(), "logged artifact");
        Ok(artifact)
    }

    fn read_artifact(&self, run_id: &str, path: &str) -> Result<Vec<u8>> {
        validate_artifact_path(path)?;
        let state = self.lock()?;
        let missing = || Error::Persistence(format!("run {run_id} has no artifact '{path}'"));
        if let Some(root) = &self.root {
            fs::read(Self::artifact_file(root, run_id, path)).map_err(|_| missing())
        } else {
            state
                .blobs
                .get(&(run_id.to_string(), path.to_string()))
                .cloned()
                .ok_or_else(missing)
        }
    }

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<()> {
        self.write(|store| store.end_run(run_id, status))
    }

    fn create_model_version(&self, name: &str, source: &str, run_id: &str) -> Result<ModelVersion> {
        self.write(|store| store.create_model_version(name, source, run_id))
    }

    fn transition_model_version_stage(
        &self,
        name: &str,
        version: u32,
        stage: ModelStage,
        archive_existing: bool,
    ) -> Result<ModelVersion> {
        self.write(|store| store.transition_model_version_stage(name, version, stage, archive_existing))
    }

    fn model_versions(&self, name: &str) -> Result<Vec<ModelVersion>> {
        self.read(|store| Ok(store.model_versions(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_artifact_roundtrip() {
        let tracking = LocalTracking::in_memory();
        let exp = tracking.get_or_create_experiment(None).unwrap();
        let run = tracking.create_run(exp.experiment_id(), None).unwrap();

        let record = tracking.log_artifact(run.run_id(), "plot.svg", b"<svg/>").unwrap();
        assert_eq!(record.size_bytes(), 6);
        assert_eq!(tracking.read_artifact(run.run_id(), "plot.svg").unwrap(), b"<svg/>");
        assert!(tracking.get_run(run.run_id()).unwrap().artifact("plot.svg").is_some());
    }

    #[test]
    fn test_artifact_path_escape_rejected() {
        let tracking = LocalTracking::in_memory();
        let exp = tracking.get_or_create_experiment(None).unwrap();
        let run = tracking.create_run(exp.experiment_id(), None).unwrap();
        assert!(tracking.log_artifact(run.run_id(), "../x", b"").is_err());
        assert!(tracking.log_artifact(run.run_id(), "/etc/x", b"").is_err());
    }

    #[test]
    fn test_run_name_tag_renames() {
        let tracking = LocalTracking::in_memory();
        let exp = tracking.get_or_create_experiment(Some("wine")).unwrap();
        let run = tracking.create_run(exp.experiment_id(), Some("first")).unwrap();
        tracking.set_tag(run.run_id(), RUN_NAME_TAG, run.run_id()).unwrap();
        assert_eq!(tracking.get_run(run.run_id()).unwrap().run_name(), Some(run.run_id()));
    }

    #[test]
    fn test_open_reloads_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let run_id = {
            let tracking = LocalTracking::open(dir.path()).unwrap();
            let exp = tracking.get_or_create_experiment(Some("wine")).unwrap();
            let run = tracking.create_run(exp.experiment_id(), None).unwrap();
            tracking.log_artifact(run.run_id(), "model/model.json", b"{}").unwrap();
            run.run_id().to_string()
        };

        let reopened = LocalTracking::open(dir.path()).unwrap();
        assert!(reopened.get_run(&run_id).is_ok());
        assert_eq!(reopened.read_artifact(&run_id, "model/model.json").unwrap(), b"{}");
        assert_eq!(
            reopened.get_or_create_experiment(Some("wine")).unwrap().experiment_id(),
            "1"
        );
    }
}
