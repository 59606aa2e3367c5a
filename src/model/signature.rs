//! Model signature - input/output schema inferred from training data

use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

/// One column of a model signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name; model outputs are unnamed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Logical type (`double`, `long`, `string`, ...)
    #[serde(rename = "type")]
    pub dtype: String,
}

/// Expected model inputs and produced outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSignature {
    /// Feature columns
    pub inputs: Vec<ColumnSpec>,
    /// Prediction columns
    pub outputs: Vec<ColumnSpec>,
}

/// Infer a signature from the training features and the model predictions.
#[must_use]
pub fn infer_signature(x_train: &RecordBatch, _predictions: &[f64]) -> ModelSignature {
    let inputs = x_train
        .schema()
        .fields()
        .iter()
        .map(|f| ColumnSpec {
            name: Some(f.name().clone()),
            dtype: logical_type(f.data_type()),
        })
        .collect();
    ModelSignature {
        inputs,
        outputs: vec![ColumnSpec {
            name: None,
            dtype: logical_type(&DataType::Float64),
        }],
    }
}

fn logical_type(dt: &DataType) -> String {
    match dt {
        DataType::Float64 => "double".to_string(),
        DataType::Float32 | DataType::Float16 => "float".to_string(),
        DataType::Int64 | DataType::UInt64 | DataType::UInt32 => "long".to_string(),
        DataType::Int32 | DataType::Int16 | DataType::Int8 | DataType::UInt16 | DataType::UInt8 => {
            "integer".to_string()
        }
        DataType::Boolean => "boolean".to_string(),
        DataType::Utf8 | DataType::LargeUtf8 => "string".to_string(),
        other => other.to_string().to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Float64Array, Int32Array};
    use std::sync::Arc;

    #[test]
    fn test_infer_signature_names_and_types() {
        let x = RecordBatch::try_from_iter(vec![
            ("alcohol", Arc::new(Float64Array::from(vec![9.4])) as ArrayRef),
            ("year", Arc::new(Int32Array::from(vec![2009])) as ArrayRef),
        ])
        .unwrap();
        let sig = infer_signature(&x, &[5.0]);
        assert_eq!(sig.inputs[0].name.as_deref(), Some("alcohol"));
        assert_eq!(sig.inputs[0].dtype, "double");
        assert_eq!(sig.inputs[1].dtype, "integer");
        assert_eq!(sig.outputs.len(), 1);
        assert!(sig.outputs[0].name.is_none());
    }
}
