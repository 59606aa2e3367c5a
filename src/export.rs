//! Portable model export
//!
//! A [`ModelExporter`] converts a fitted model into a self-describing
//! document that other runtimes can score without this crate. The bundled
//! [`TreeEnsembleExporter`] flattens the tree into the parallel attribute
//! arrays used by tree-ensemble regressor operators (one entry per node).

use crate::data::column_names;
use crate::model::{FittedModel, Node};
use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

/// Artifact directory for exported models.
pub const EXPORT_ARTIFACT_PATH: &str = "onnx-model";

/// Converts fitted models into a portable serialized form.
pub trait ModelExporter {
    /// Directory under the run's artifact root that receives the export.
    fn artifact_path(&self) -> &str;

    /// File name of the export inside [`ModelExporter::artifact_path`].
    fn file_name(&self) -> &str;

    /// Serialize `model`. `sample` is a batch of model inputs used to name
    /// and check the exported input columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the model cannot be converted.
    fn export(
        &self,
        model: &FittedModel,
        sample: &RecordBatch,
        registered_model_name: Option<&str>,
    ) -> Result<Vec<u8>>;
}

/// Node mode for an internal node (`x <= threshold` goes to the true branch).
pub const MODE_BRANCH_LEQ: &str = "BRANCH_LEQ";

/// Node mode for a leaf.
pub const MODE_LEAF: &str = "LEAF";

/// Flattened single-tree regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsembleDocument {
    /// Document kind
    pub format: String,
    /// Registered model name the export belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_model_name: Option<String>,
    /// Input column names, in feature-id order
    pub input_names: Vec<String>,
    /// Number of regression targets
    pub n_targets: u32,
    /// Tree id of each node
    pub nodes_treeids: Vec<u32>,
    /// Node id of each node
    pub nodes_nodeids: Vec<u32>,
    /// Feature id tested by each node (0 for leaves)
    pub nodes_featureids: Vec<u32>,
    /// `BRANCH_LEQ` or `LEAF`
    pub nodes_modes: Vec<String>,
    /// Threshold of each node (0.0 for leaves)
    pub nodes_values: Vec<f64>,
    /// Child taken when the test holds
    pub nodes_truenodeids: Vec<u32>,
    /// Child taken when the test fails
    pub nodes_falsenodeids: Vec<u32>,
    /// Leaf node ids carrying a target weight
    pub target_nodeids: Vec<u32>,
    /// Target id per weight
    pub target_ids: Vec<u32>,
    /// Predicted value per leaf
    pub target_weights: Vec<f64>,
    /// Aggregation across trees
    pub aggregate_function: String,
    /// Output transform
    pub post_transform: String,
}

impl TreeEnsembleDocument {
    /// Score one row given as feature values in `input_names` order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the document is structurally invalid.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        let invalid = |what: &str| Error::Persistence(format!("invalid tree ensemble: {what}"));
        let n = self.nodes_nodeids.len();
        let node_arrays = [
            self.nodes_featureids.len(),
            self.nodes_modes.len(),
            self.nodes_values.len(),
            self.nodes_truenodeids.len(),
            self.nodes_falsenodeids.len(),
        ];
        if n == 0 || node_arrays.iter().any(|&len| len != n) {
            return Err(invalid("node arrays differ in length"));
        }
        if self.target_nodeids.len() != self.target_weights.len() {
            return Err(invalid("target arrays differ in length"));
        }

        let mut idx = 0usize;
        for _ in 0..=n {
            let mode = self.nodes_modes.get(idx).ok_or_else(|| invalid("node out of range"))?;
            if mode == MODE_LEAF {
                return self
                    .target_nodeids
                    .iter()
                    .position(|&t| t as usize == idx)
                    .and_then(|pos| self.target_weights.get(pos).copied())
                    .ok_or_else(|| invalid("leaf without weight"));
            }
            let feature = self.nodes_featureids[idx] as usize;
            let value = *row.get(feature).ok_or_else(|| invalid("feature out of range"))?;
            idx = if value <= self.nodes_values[idx] {
                self.nodes_truenodeids[idx]
            } else {
                self.nodes_falsenodeids[idx]
            } as usize;
        }
        Err(invalid("cycle detected"))
    }
}

/// Exports models as [`TreeEnsembleDocument`] JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeEnsembleExporter;

impl TreeEnsembleExporter {
    /// Build the document without serializing it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if `sample` does not carry the model's
    /// feature columns or the tree is too large for 32-bit node ids.
    pub fn document(
        model: &FittedModel,
        sample: &RecordBatch,
        registered_model_name: Option<&str>,
    ) -> Result<TreeEnsembleDocument> {
        let input_names = column_names(sample);
        if input_names != model.feature_names() {
            return Err(Error::Persistence(format!(
                "export sample columns [{}] do not match model features [{}]",
                input_names.join(", "),
                model.feature_names().join(", ")
            )));
        }
        let id = |v: usize| {
            u32::try_from(v).map_err(|_| Error::Persistence(format!("node id {v} exceeds u32")))
        };

        let n = model.nodes().len();
        let mut doc = TreeEnsembleDocument {
            format: "tree_ensemble_regressor".to_string(),
            registered_model_name: registered_model_name.map(str::to_string),
            input_names,
            n_targets: 1,
            nodes_treeids: vec![0; n],
            nodes_nodeids: Vec::with_capacity(n),
            nodes_featureids: Vec::with_capacity(n),
            nodes_modes: Vec::with_capacity(n),
            nodes_values: Vec::with_capacity(n),
            nodes_truenodeids: Vec::with_capacity(n),
            nodes_falsenodeids: Vec::with_capacity(n),
            target_nodeids: Vec::new(),
            target_ids: Vec::new(),
            target_weights: Vec::new(),
            aggregate_function: "SUM".to_string(),
            post_transform: "NONE".to_string(),
        };

        for (i, node) in model.nodes().iter().enumerate() {
            doc.nodes_nodeids.push(id(i)?);
            match node {
                Node::Leaf { value, .. } => {
                    doc.nodes_featureids.push(0);
                    doc.nodes_modes.push(MODE_LEAF.to_string());
                    doc.nodes_values.push(0.0);
                    doc.nodes_truenodeids.push(0);
                    doc.nodes_falsenodeids.push(0);
                    doc.target_nodeids.push(id(i)?);
                    doc.target_ids.push(0);
                    doc.target_weights.push(*value);
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    doc.nodes_featureids.push(id(*feature)?);
                    doc.nodes_modes.push(MODE_BRANCH_LEQ.to_string());
                    doc.nodes_values.push(*threshold);
                    doc.nodes_truenodeids.push(id(*left)?);
                    doc.nodes_falsenodeids.push(id(*right)?);
                }
            }
        }
        Ok(doc)
    }
}

impl ModelExporter for TreeEnsembleExporter {
    fn artifact_path(&self) -> &str {
        EXPORT_ARTIFACT_PATH
    }

    fn file_name(&self) -> &str {
        "model.json"
    }

    fn export(
        &self,
        model: &FittedModel,
        sample: &RecordBatch,
        registered_model_name: Option<&str>,
    ) -> Result<Vec<u8>> {
        let doc = Self::document(model, sample, registered_model_name)?;
        Ok(serde_json::to_vec_pretty(&doc)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::f64_columns;
    use crate::model::{fit, predict, TreeParams};
    use arrow::array::{ArrayRef, Float64Array};
    use std::sync::Arc;

    fn batches() -> (RecordBatch, RecordBatch) {
        let a: Vec<f64> = (0..40).map(f64::from).collect();
        let b: Vec<f64> = (0..40).map(|i| f64::from((i * 7) % 11)).collect();
        let y: Vec<f64> = a.iter().zip(&b).map(|(a, b)| a * 0.1 + b).collect();
        let x = RecordBatch::try_from_iter(vec![
            ("a", Arc::new(Float64Array::from(a)) as ArrayRef),
            ("b", Arc::new(Float64Array::from(b)) as ArrayRef),
        ])
        .unwrap();
        let y = RecordBatch::try_from_iter(vec![(
            "quality",
            Arc::new(Float64Array::from(y)) as ArrayRef,
        )])
        .unwrap();
        (x, y)
    }

    #[test]
    fn test_document_scores_like_model() {
        let (x, y) = batches();
        let model = fit(&x, &y, &TreeParams::default()).unwrap();
        let doc = TreeEnsembleExporter::document(&model, &x, Some("wine-model")).unwrap();

        let expected = predict(&model, &x).unwrap();
        let columns = f64_columns(&x).unwrap();
        for (row, want) in expected.iter().enumerate() {
            let values: Vec<f64> = columns.iter().map(|c| c[row]).collect();
            assert!((doc.predict_row(&values).unwrap() - want).abs() < f64::EPSILON);
        }
        assert_eq!(doc.target_weights.len(), model.leaf_count());
        assert_eq!(doc.registered_model_name.as_deref(), Some("wine-model"));
    }

    #[test]
    fn test_malformed_document_is_error() {
        let (x, y) = batches();
        let model = fit(&x, &y, &TreeParams::default()).unwrap();
        let doc = TreeEnsembleExporter::document(&model, &x, None).unwrap();

        let missing_weight = TreeEnsembleDocument {
            nodes_treeids: vec![0],
            nodes_nodeids: vec![0],
            nodes_featureids: vec![0],
            nodes_modes: vec![MODE_LEAF.to_string()],
            nodes_values: vec![0.0],
            nodes_truenodeids: vec![0],
            nodes_falsenodeids: vec![0],
            target_nodeids: vec![0],
            target_ids: vec![0],
            target_weights: vec![],
            ..doc.clone()
        };
        assert!(matches!(missing_weight.predict_row(&[1.0]), Err(Error::Persistence(_))));

        let mut short_thresholds = doc.clone();
        short_thresholds.nodes_values.pop();
        assert!(matches!(short_thresholds.predict_row(&[1.0, 2.0]), Err(Error::Persistence(_))));

        let mut dangling_child = doc;
        if let Some(pos) = dangling_child.nodes_modes.iter().position(|m| m == MODE_BRANCH_LEQ) {
            dangling_child.nodes_truenodeids[pos] = 10_000;
            dangling_child.nodes_falsenodeids[pos] = 10_000;
        }
        assert!(matches!(dangling_child.predict_row(&[1.0, 2.0]), Err(Error::Persistence(_))));
    }

    #[test]
    fn test_export_rejects_mismatched_sample() {
        let (x, y) = batches();
        let model = fit(&x, &y, &TreeParams::default()).unwrap();
        let sample = x.project(&[0]).unwrap();
        assert!(TreeEnsembleExporter.export(&model, &sample, None).is_err());
    }
}
