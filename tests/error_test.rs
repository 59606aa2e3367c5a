//! Tests for error types

use wine_quality::Error;

#[test]
fn test_data_load_error() {
    let error = Error::DataLoad("Failed to read CSV file wine.csv".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Data load error"));
    assert!(error_str.contains("wine.csv"));
}

#[test]
fn test_schema_error() {
    let error = Error::Schema {
        column: "quality".to_string(),
        available: "alcohol, pH".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("column 'quality' not found"));
    assert!(error_str.contains("alcohol, pH"));
}

#[test]
fn test_training_error() {
    let error = Error::Training("training set is empty".to_string());
    assert!(format!("{error}").contains("Training error: training set is empty"));
}

#[test]
fn test_metric_error() {
    let error = Error::Metric("cannot evaluate an empty holdout set".to_string());
    assert!(format!("{error}").contains("Metric error"));
}

#[test]
fn test_persistence_error() {
    let error = Error::Persistence("Failed to write run id to /tmp/x".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Persistence error"));
    assert!(error_str.contains("/tmp/x"));
}

#[test]
fn test_registration_error() {
    let error = Error::Registration("registered model 'wine-model' not found".to_string());
    assert!(format!("{error}").contains("Registration error"));
}

#[test]
fn test_config_error() {
    let error = Error::Config("max_leaf_nodes must be positive".to_string());
    assert!(format!("{error}").contains("Invalid configuration"));
}

#[test]
fn test_lookup_errors() {
    assert!(format!("{}", Error::RunNotFound("abc".to_string())).contains("Run not found: abc"));
    assert!(format!("{}", Error::ExperimentNotFound("7".to_string()))
        .contains("Experiment not found: 7"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json_error.into();
    assert!(format!("{error}").contains("JSON error"));
}

#[test]
fn test_arrow_error_conversion() {
    let arrow_error = arrow::error::ArrowError::SchemaError("bad schema".to_string());
    let error: Error = arrow_error.into();
    assert!(format!("{error}").contains("Arrow error"));
}

#[test]
fn test_error_debug_format() {
    let error = Error::Training("test".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("Training"));
}
