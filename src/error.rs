//! Error types for wine-quality training runs
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Training run error types
#[derive(Error, Debug)]
pub enum Error {
    /// Input file missing, unreadable, or malformed
    #[error("Data load error: {0}")]
    DataLoad(String),

    /// Required column absent from the dataset
    #[error("Schema error: column '{column}' not found (available: {available})")]
    Schema {
        /// Column that was requested
        column: String,
        /// Comma-separated list of the columns that do exist
        available: String,
    },

    /// Model fitting failed
    #[error("Training error: {0}")]
    Training(String),

    /// Degenerate evaluation input (empty holdout, length mismatch)
    #[error("Metric error: {0}")]
    Metric(String),

    /// Artifact, model, or run metadata could not be written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Registered model version could not be created or transitioned
    #[error("Registration error: {0}")]
    Registration(String),

    /// Invalid training configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Run id unknown to the tracking store
    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// Experiment id unknown to the tracking store
    #[error("Experiment not found: {0}")]
    ExperimentNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
