//! Training configuration

use crate::experiment::ModelStage;
use crate::model::{TreeParams, DEFAULT_MAX_LEAF_NODES};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Every option recognized by a training invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    /// Experiment to file the run under; `None` selects the default experiment.
    pub experiment_name: Option<String>,
    /// CSV file with a header row and a `quality` column.
    pub data_path: String,
    /// Registered model name; `None` skips registration.
    pub model_name: Option<String>,
    /// Stage for the new registered version.
    pub model_version_stage: String,
    /// Archive versions already in the target stage.
    pub archive_existing_versions: bool,
    /// Attach an input/output signature to the logged model.
    pub save_signature: bool,
    /// Also log a portable export of the model.
    pub log_as_onnx: bool,
    /// Tree depth bound; `None` is unbounded.
    pub max_depth: Option<usize>,
    /// Leaf count bound.
    pub max_leaf_nodes: usize,
    /// Free-form origin label recorded on the run and used in its name.
    pub run_origin: Option<String>,
    /// File that receives the run id after training.
    pub output_path: Option<String>,
    /// Rename the run to its own id.
    pub use_run_id_as_run_name: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            experiment_name: None,
            data_path: String::new(),
            model_name: None,
            model_version_stage: ModelStage::None.as_str().to_string(),
            archive_existing_versions: false,
            save_signature: false,
            log_as_onnx: false,
            max_depth: None,
            max_leaf_nodes: DEFAULT_MAX_LEAF_NODES,
            run_origin: None,
            output_path: None,
            use_run_id_as_run_name: false,
        }
    }
}

impl TrainConfig {
    /// Load a JSON configuration file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::Config(format!("invalid configuration in {}: {e}", path.display())))
    }

    /// Check option values that can be rejected before any work starts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty data path, a zero bound or an
    /// unknown stage label.
    pub fn validate(&self) -> Result<()> {
        if self.data_path.is_empty() {
            return Err(Error::Config("data_path is required".to_string()));
        }
        if self.max_depth == Some(0) {
            return Err(Error::Config("max_depth must be positive".to_string()));
        }
        if self.max_leaf_nodes == 0 {
            return Err(Error::Config("max_leaf_nodes must be positive".to_string()));
        }
        self.stage()?;
        Ok(())
    }

    /// Parsed target stage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unknown stage label.
    pub fn stage(&self) -> Result<ModelStage> {
        self.model_version_stage.parse()
    }

    /// Tree hyperparameters.
    #[must_use]
    pub const fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            max_leaf_nodes: self.max_leaf_nodes,
        }
    }
}
