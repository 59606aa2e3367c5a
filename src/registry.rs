//! Model registration
//!
//! The recorder hands a logged model to a [`Registrar`], which creates a
//! registered model version and moves it to the requested stage.

use crate::experiment::{ModelStage, ModelVersion};
use crate::tracking::TrackingClient;
use crate::{Error, Result};
use std::sync::Arc;

/// What to register and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest<'a> {
    /// Registered model name
    pub name: &'a str,
    /// Run that logged the model
    pub run_id: &'a str,
    /// Model location relative to the run's artifact root
    pub artifact_path: &'a str,
    /// Target stage
    pub stage: ModelStage,
    /// Archive other versions already in the target stage
    pub archive_existing_versions: bool,
}

/// Creates and stages registered model versions.
pub trait Registrar {
    /// Register the model described by `request`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Registration`] if the version cannot be created or
    /// transitioned.
    fn register(&self, request: &RegistrationRequest<'_>) -> Result<ModelVersion>;
}

/// Registrar backed by the tracking store's model registry.
pub struct TrackingRegistrar {
    client: Arc<dyn TrackingClient>,
}

impl TrackingRegistrar {
    /// Register through `client`.
    #[must_use]
    pub fn new(client: Arc<dyn TrackingClient>) -> Self {
        Self { client }
    }
}

impl Registrar for TrackingRegistrar {
    fn register(&self, request: &RegistrationRequest<'_>) -> Result<ModelVersion> {
        let source = format!(
            "{}/{}",
            self.client.artifact_uri(request.run_id),
            request.artifact_path
        );
        let version = self
            .client
            .create_model_version(request.name, &source, request.run_id)
            .map_err(|e| Error::Registration(format!("failed to create version of '{}': {e}", request.name)))?;
        tracing::info!(
            name = request.name,
            version = version.version(),
            source = %source,
            "created registered model version"
        );

        if request.stage == ModelStage::None {
            return Ok(version);
        }
        let version = self
            .client
            .transition_model_version_stage(
                request.name,
                version.version(),
                request.stage,
                request.archive_existing_versions,
            )
            .map_err(|e| match e {
                Error::Registration(_) => e,
                other => Error::Registration(format!(
                    "failed to move '{}' to {}: {other}",
                    request.name, request.stage
                )),
            })?;
        tracing::info!(
            name = request.name,
            version = version.version(),
            stage = %version.stage(),
            archive_existing = request.archive_existing_versions,
            "transitioned model version"
        );
        Ok(version)
    }
}
