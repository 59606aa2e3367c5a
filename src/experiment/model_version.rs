//! Registered Model Version - stage-labelled pointer to a run's model

use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle stage of a registered model version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ModelStage {
    /// Registered but not staged.
    #[default]
    None,
    /// Candidate under validation.
    Staging,
    /// Serving version.
    Production,
    /// Superseded version.
    Archived,
}

impl ModelStage {
    /// Stage label as stored in tags and snapshots.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Staging => "Staging",
            Self::Production => "Production",
            Self::Archived => "Archived",
        }
    }

    /// Whether versions in this stage are displaced by
    /// `archive_existing_versions`.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Staging | Self::Production)
    }
}

impl fmt::Display for ModelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelStage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            "archived" => Ok(Self::Archived),
            _ => Err(Error::Config(format!(
                "unknown model stage '{s}' (expected None, Staging, Production or Archived)"
            ))),
        }
    }
}

/// One version of a registered model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVersion {
    name: String,
    version: u32,
    run_id: String,
    source: String,
    stage: ModelStage,
    created_at: DateTime<Utc>,
    last_updated_at: DateTime<Utc>,
}

impl ModelVersion {
    /// Create version `version` of `name` in stage `None`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: u32,
        run_id: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            version,
            run_id: run_id.into(),
            source: source.into(),
            stage: ModelStage::None,
            created_at: now,
            last_updated_at: now,
        }
    }

    /// Registered model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 1-based version number.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Run whose model this version points at.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Artifact location of the model.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> ModelStage {
        self.stage
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Timestamp of the last stage change.
    #[must_use]
    pub const fn last_updated_at(&self) -> DateTime<Utc> {
        self.last_updated_at
    }

    /// Move to `stage`.
    pub fn set_stage(&mut self, stage: ModelStage) {
        self.stage = stage;
        self.last_updated_at = Utc::now();
    }
}
