//! Decision-tree regression model
//!
//! [`fit`] produces an immutable [`FittedModel`]; [`predict`] scores a
//! feature batch against it. Models serialize to JSON for the primary run
//! artifact.

mod signature;
mod tree;

pub use signature::{infer_signature, ColumnSpec, ModelSignature};
pub use tree::Node;

use crate::data::{column_names, f64_column, f64_columns};
use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default leaf budget.
pub const DEFAULT_MAX_LEAF_NODES: usize = 32;

/// Model flavor recorded in the model metadata artifact.
pub const MODEL_FLAVOR: &str = "decision_tree_regressor";

/// Structural hyperparameters of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth; `None` means unbounded.
    pub max_depth: Option<usize>,
    /// Maximum number of leaves.
    pub max_leaf_nodes: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            max_leaf_nodes: DEFAULT_MAX_LEAF_NODES,
        }
    }
}

impl TreeParams {
    /// Check that both bounds are positive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Training`] on a zero bound.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == Some(0) {
            return Err(Error::Training("max_depth must be positive".to_string()));
        }
        if self.max_leaf_nodes == 0 {
            return Err(Error::Training("max_leaf_nodes must be positive".to_string()));
        }
        Ok(())
    }
}

/// A fitted regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    feature_names: Vec<String>,
    params: TreeParams,
    nodes: Vec<Node>,
}

impl FittedModel {
    /// Feature names seen during fitting, in column order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Number of input features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Hyperparameters the model was fitted with.
    #[must_use]
    pub const fn params(&self) -> &TreeParams {
        &self.params
    }

    /// Flat node arena; index 0 is the root.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of terminal nodes.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Longest root-to-leaf path length.
    #[must_use]
    pub fn depth(&self) -> usize {
        tree::depth(&self.nodes)
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Deserialize from JSON produced by [`FittedModel::to_json`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the bytes are not a valid model.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Fit a tree on training features and a single-column label batch.
///
/// # Errors
///
/// Returns [`Error::Training`] if the training set is empty, row counts
/// disagree, any value is non-finite, or a bound is zero.
pub fn fit(x_train: &RecordBatch, y_train: &RecordBatch, params: &TreeParams) -> Result<FittedModel> {
    params.validate()?;
    if x_train.num_rows() == 0 {
        return Err(Error::Training("training set is empty".to_string()));
    }
    if x_train.num_rows() != y_train.num_rows() || y_train.num_columns() != 1 {
        return Err(Error::Training(format!(
            "expected a single label column with {} rows, got {} column(s) with {} rows",
            x_train.num_rows(),
            y_train.num_columns(),
            y_train.num_rows()
        )));
    }

    let x = f64_columns(x_train)?;
    let y = f64_column(y_train, 0)?;
    let feature_names = column_names(x_train);
    if let Some(name) = x
        .iter()
        .zip(&feature_names)
        .find_map(|(col, name)| (!col.iter().all(|v| v.is_finite())).then_some(name))
    {
        return Err(Error::Training(format!("feature '{name}' has non-finite values")));
    }
    if !y.iter().all(|v| v.is_finite()) {
        return Err(Error::Training("label has non-finite values".to_string()));
    }

    let nodes = tree::grow(&x, y, params.max_depth, params.max_leaf_nodes);
    let model = FittedModel {
        feature_names,
        params: *params,
        nodes,
    };
    tracing::debug!(
        rows = x_train.num_rows(),
        features = model.n_features(),
        leaves = model.leaf_count(),
        depth = model.depth(),
        "fitted decision tree"
    );
    Ok(model)
}

/// Predict one value per row of `x`.
///
/// # Errors
///
/// Returns [`Error::Schema`] if `x` does not carry the model's feature
/// columns in fitting order.
pub fn predict(model: &FittedModel, x: &RecordBatch) -> Result<Vec<f64>> {
    let names = column_names(x);
    if names != model.feature_names {
        return Err(Error::Schema {
            column: model.feature_names.join(", "),
            available: names.join(", "),
        });
    }
    let columns = f64_columns(x)?;
    Ok((0..x.num_rows())
        .map(|row| tree::predict_row(&model.nodes, |feature| columns[feature][row]))
        .collect())
}

/// Descriptive metadata stored next to the serialized model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model flavor
    pub flavor: String,
    /// Run that produced the model
    pub run_id: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Hyperparameters
    pub params: TreeParams,
    /// Input/output schema, if signature saving was enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<ModelSignature>,
}

impl ModelMetadata {
    /// Describe `model` as produced by `run_id`.
    #[must_use]
    pub fn new(model: &FittedModel, run_id: impl Into<String>, signature: Option<ModelSignature>) -> Self {
        Self {
            flavor: MODEL_FLAVOR.to_string(),
            run_id: run_id.into(),
            created_at: Utc::now(),
            params: *model.params(),
            signature,
        }
    }
}
