//! Tabular dataset ingestion (Arrow columnar format)
//!
//! Datasets are read from CSV files with a header row. Every column is
//! widened to `Float64` on load so that downstream fitting and evaluation
//! can borrow plain `&[f64]` slices straight out of the Arrow buffers.

mod partition;

pub use partition::{partition, Split, DEFAULT_SEED, DEFAULT_TEST_FRACTION};

use crate::{Error, Result};
use arrow::array::{ArrayRef, AsArray};
use arrow::compute::{cast, concat_batches};
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Float64Type, Schema};
use arrow::record_batch::RecordBatch;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

/// Label column of the wine-quality dataset.
pub const LABEL_COLUMN: &str = "quality";

/// Dataset tag value recorded on every run.
pub const DATASET_NAME: &str = "wine-quality";

/// A fully numeric table held as a single Arrow record batch.
#[derive(Debug, Clone)]
pub struct Dataset {
    batch: RecordBatch,
}

impl Dataset {
    /// Load a CSV file with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataLoad`] if the file is missing, cannot be parsed,
    /// has no data rows, or contains a cell that is not a number.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            Error::DataLoad(format!("Failed to read CSV file {}: {e}", path.display()))
        })?;

        let format = Format::default().with_header(true);
        let (schema, _) = format.infer_schema(Cursor::new(&bytes), None).map_err(|e| {
            Error::DataLoad(format!("Failed to infer CSV schema for {}: {e}", path.display()))
        })?;
        let schema = Arc::new(schema);

        let reader = ReaderBuilder::new(schema.clone())
            .with_format(format)
            .build(Cursor::new(&bytes))
            .map_err(|e| {
                Error::DataLoad(format!("Failed to create CSV reader for {}: {e}", path.display()))
            })?;

        let mut batches = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| {
                Error::DataLoad(format!("Failed to parse CSV file {}: {e}", path.display()))
            })?;
            batches.push(batch);
        }

        let batch = concat_batches(&schema, &batches)?;
        Self::from_batch(batch).map_err(|e| match e {
            Error::DataLoad(msg) => Error::DataLoad(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Wrap an existing record batch, widening every column to `Float64`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataLoad`] if the batch is empty or any column holds
    /// null or non-numeric values.
    pub fn from_batch(batch: RecordBatch) -> Result<Self> {
        if batch.num_rows() == 0 {
            return Err(Error::DataLoad("dataset has no data rows".to_string()));
        }

        let mut fields = Vec::with_capacity(batch.num_columns());
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());
        for (field, column) in batch.schema().fields().iter().zip(batch.columns()) {
            let widened = cast(column, &DataType::Float64).map_err(|e| {
                Error::DataLoad(format!("column '{}' is not numeric: {e}", field.name()))
            })?;
            if widened.null_count() > 0 {
                return Err(Error::DataLoad(format!(
                    "column '{}' has {} missing or non-numeric values",
                    field.name(),
                    widened.null_count()
                )));
            }
            fields.push(Field::new(field.name(), DataType::Float64, false));
            columns.push(widened);
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        Ok(Self { batch })
    }

    /// Number of data rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Column names in file order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        column_names(&self.batch)
    }

    /// Underlying record batch.
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Index of `label_column`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if the column does not exist.
    pub fn label_index(&self, label_column: &str) -> Result<usize> {
        self.batch
            .schema()
            .index_of(label_column)
            .map_err(|_| Error::Schema {
                column: label_column.to_string(),
                available: self.column_names().join(", "),
            })
    }
}

/// Column names of a record batch in schema order.
#[must_use]
pub fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}

/// Borrow column `index` of a batch as a contiguous `f64` slice.
///
/// # Errors
///
/// Returns [`Error::Schema`] if the index is out of range or the column is
/// not `Float64`.
pub fn f64_column(batch: &RecordBatch, index: usize) -> Result<&[f64]> {
    let schema = batch.schema();
    let missing = || Error::Schema {
        column: format!("#{index} (Float64)"),
        available: column_names(batch).join(", "),
    };
    if index >= batch.num_columns() || schema.field(index).data_type() != &DataType::Float64 {
        return Err(missing());
    }
    batch
        .column(index)
        .as_primitive_opt::<Float64Type>()
        .map(|array| array.values().as_ref())
        .ok_or_else(missing)
}

/// Borrow every column of a batch as `f64` slices (column-major view).
///
/// # Errors
///
/// Returns [`Error::Schema`] if any column is not `Float64`.
pub fn f64_columns(batch: &RecordBatch) -> Result<Vec<&[f64]>> {
    (0..batch.num_columns())
        .map(|i| f64_column(batch, i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array, StringArray};

    fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
        RecordBatch::try_from_iter(columns).unwrap()
    }

    #[test]
    fn test_from_batch_widens_integers() {
        let b = batch(vec![
            ("alcohol", Arc::new(Float64Array::from(vec![9.4, 9.8])) as ArrayRef),
            ("quality", Arc::new(Int64Array::from(vec![5, 6])) as ArrayRef),
        ]);
        let ds = Dataset::from_batch(b).unwrap();
        assert_eq!(ds.num_rows(), 2);
        assert_eq!(f64_column(ds.batch(), 1).unwrap(), &[5.0, 6.0]);
    }

    #[test]
    fn test_from_batch_rejects_text() {
        let b = batch(vec![(
            "grape",
            Arc::new(StringArray::from(vec!["merlot", "syrah"])) as ArrayRef,
        )]);
        let err = Dataset::from_batch(b).unwrap_err();
        assert!(matches!(err, Error::DataLoad(_)));
        assert!(err.to_string().contains("grape"));
    }

    #[test]
    fn test_label_index_missing_column() {
        let b = batch(vec![(
            "alcohol",
            Arc::new(Float64Array::from(vec![9.4])) as ArrayRef,
        )]);
        let ds = Dataset::from_batch(b).unwrap();
        let err = ds.label_index("quality").unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
        assert!(err.to_string().contains("alcohol"));
    }
}
