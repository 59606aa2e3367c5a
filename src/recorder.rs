//! Run recorder - sequences one tracked training run
//!
//! A [`Trainer`] owns the partitioned dataset and the collaborators of a
//! training session. [`Trainer::train`] drives a run through
//!
//! ```text
//! NOT_STARTED ──open──> OPEN ──close──> CLOSED ──timing tags──> FINALIZED
//! ```
//!
//! The run body is strictly ordered: descriptive tags, fit/predict, params,
//! metrics, optional signature, model artifact, optional registration,
//! optional export, evaluation plot, optional run-id output file. Any
//! failure in the body closes the run as `Failed` before the error reaches
//! the caller. Timing tags are written after closure, once the store has
//! fixed the run's end time.

use crate::config::TrainConfig;
use crate::data::{f64_column, Dataset, Split, DATASET_NAME, DEFAULT_SEED, DEFAULT_TEST_FRACTION, LABEL_COLUMN};
use crate::experiment::{ModelStage, ModelVersion, RunStatus};
use crate::export::{ModelExporter, TreeEnsembleExporter};
use crate::metrics::{evaluate, RegressionMetrics};
use crate::model::{fit, infer_signature, predict, FittedModel, ModelMetadata, TreeParams};
use crate::plot::{render_prediction_plot, PLOT_ARTIFACT};
use crate::registry::{RegistrationRequest, Registrar, TrackingRegistrar};
use crate::timestamp::{fmt_ts_millis, fmt_ts_seconds};
use crate::tracking::{ActiveRun, TrackingClient, RUN_NAME_TAG};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Crate version recorded on runs and experiments.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Artifact directory of the primary model.
pub const MODEL_ARTIFACT_PATH: &str = "model";

/// Tag and param keys written by the recorder.
pub mod keys {
    /// Run id
    pub const RUN_ID: &str = "run_id";
    /// Whether a signature was requested
    pub const SAVE_SIGNATURE: &str = "save_signature";
    /// Input data location
    pub const DATA_PATH: &str = "data_path";
    /// Target registered model name
    pub const REGISTERED_MODEL_NAME: &str = "registered_model_name";
    /// Target registered model stage
    pub const REGISTERED_MODEL_VERSION_STAGE: &str = "registered_model_version_stage";
    /// Fresh per-run uniqueness token
    pub const UUID: &str = "uuid";
    /// Dataset label
    pub const DATASET: &str = "dataset";
    /// Run origin
    pub const RUN_ORIGIN: &str = "run_origin";
    /// Session timestamp
    pub const TIMESTAMP: &str = "timestamp";
    /// Crate version
    pub const VERSION_CRATE: &str = "version.wine_quality";
    /// OS and architecture
    pub const VERSION_PLATFORM: &str = "version.platform";
    /// Registered name attached to the portable export
    pub const EXPORT_REGISTERED_MODEL_NAME: &str = "onnx.registered_model_name";
    /// Requested run-id output file
    pub const OUTPUT_PATH: &str = "output_path";
    /// Raw start time (ms since epoch)
    pub const START_TIME: &str = "run.info.start_time";
    /// Raw end time (ms since epoch)
    pub const END_TIME: &str = "run.info.end_time";
    /// Formatted start time
    pub const START_TIME_FMT: &str = "run.info._start_time";
    /// Formatted end time
    pub const END_TIME_FMT: &str = "run.info._end_time";
    /// Experiment tag: crate version
    pub const EXPERIMENT_VERSION: &str = "version_wine_quality";
    /// Experiment tag: first selection time
    pub const EXPERIMENT_CREATED: &str = "experiment_created";
    /// Param: depth bound
    pub const MAX_DEPTH: &str = "max_depth";
    /// Param: leaf bound
    pub const MAX_LEAF_NODES: &str = "max_leaf_nodes";
}

/// Per-invocation context: the tracking client and the session clock.
#[derive(Clone)]
pub struct Session {
    client: Arc<dyn TrackingClient>,
    now: DateTime<Utc>,
}

impl Session {
    /// Start a session at the current time.
    #[must_use]
    pub fn new(client: Arc<dyn TrackingClient>) -> Self {
        Self::at(client, Utc::now())
    }

    /// Start a session with a fixed clock.
    #[must_use]
    pub fn at(client: Arc<dyn TrackingClient>, now: DateTime<Utc>) -> Self {
        Self { client, now }
    }

    /// Tracking client.
    #[must_use]
    pub fn client(&self) -> &Arc<dyn TrackingClient> {
        &self.client
    }

    /// Session start, second precision.
    #[must_use]
    pub fn timestamp(&self) -> String {
        fmt_ts_seconds(self.now)
    }
}

/// Session-wide options fixed when the trainer is built.
#[derive(Debug, Clone, Default)]
pub struct TrainerOptions {
    /// Experiment name; `None` selects the default experiment.
    pub experiment_name: Option<String>,
    /// CSV input.
    pub data_path: String,
    /// Attach a signature to the logged model.
    pub save_signature: bool,
    /// Origin label.
    pub run_origin: Option<String>,
    /// Rename each run to its id.
    pub use_run_id_as_run_name: bool,
}

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct TrainRequest {
    /// Registered model name; `None` skips registration.
    pub registered_model_name: Option<String>,
    /// Stage for the new registered version.
    pub stage: ModelStage,
    /// Archive versions already in the target stage.
    pub archive_existing_versions: bool,
    /// File that receives the run id.
    pub output_path: Option<String>,
    /// Tree hyperparameters.
    pub params: TreeParams,
}

/// Result of a finalized run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Owning experiment
    pub experiment_id: String,
    /// Run id
    pub run_id: String,
    /// Holdout metrics
    pub metrics: RegressionMetrics,
    /// Registered version, if registration was requested
    pub model_version: Option<ModelVersion>,
}

/// Orchestrates tracked training runs over one partitioned dataset.
pub struct Trainer {
    session: Session,
    options: TrainerOptions,
    experiment_id: String,
    split: Split,
    registrar: Box<dyn Registrar>,
    exporter: Option<Box<dyn ModelExporter>>,
}

impl Trainer {
    /// Partition the data, select the experiment and set its tags.
    ///
    /// # Errors
    ///
    /// [`Error::DataLoad`] / [`Error::Schema`] from partitioning, or store
    /// failures while selecting the experiment.
    pub fn new(session: Session, options: TrainerOptions) -> Result<Self> {
        let split = Dataset::from_csv(&options.data_path)?.partition(
            LABEL_COLUMN,
            DEFAULT_TEST_FRACTION,
            DEFAULT_SEED,
        )?;
        tracing::info!(
            data_path = %options.data_path,
            train_rows = split.x_train.num_rows(),
            test_rows = split.x_test.num_rows(),
            features = split.x_train.num_columns(),
            "loaded dataset"
        );

        let client = session.client().clone();
        let experiment = client.get_or_create_experiment(options.experiment_name.as_deref())?;
        let experiment_id = experiment.experiment_id().to_string();
        client.set_experiment_tag(&experiment_id, keys::EXPERIMENT_VERSION, VERSION)?;
        if experiment.tag(keys::EXPERIMENT_CREATED).is_none() {
            client.set_experiment_tag(&experiment_id, keys::EXPERIMENT_CREATED, &session.timestamp())?;
        }
        tracing::info!(experiment_id = %experiment_id, name = experiment.name(), "selected experiment");

        Ok(Self {
            registrar: Box::new(TrackingRegistrar::new(client)),
            session,
            options,
            experiment_id,
            split,
            exporter: None,
        })
    }

    /// Replace the registrar.
    #[must_use]
    pub fn with_registrar(mut self, registrar: Box<dyn Registrar>) -> Self {
        self.registrar = registrar;
        self
    }

    /// Set the exporter; `None` disables export.
    #[must_use]
    pub fn with_exporter(mut self, exporter: Option<Box<dyn ModelExporter>>) -> Self {
        self.exporter = exporter;
        self
    }

    /// Selected experiment.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Train/test partition.
    #[must_use]
    pub const fn split(&self) -> &Split {
        &self.split
    }

    /// Run one tracked training pass.
    ///
    /// # Errors
    ///
    /// Any failure of the run body, after the run has been closed as
    /// `Failed`; or a store failure while opening, closing or finalizing.
    pub fn train(&self, request: &TrainRequest) -> Result<RunOutcome> {
        let client = self.session.client();
        let run_name = self
            .options
            .run_origin
            .as_ref()
            .map(|origin| format!("{} {origin} {VERSION}", self.session.timestamp()));

        let active = ActiveRun::start(client.as_ref(), &self.experiment_id, run_name.as_deref())?;
        let run_id = active.run_id().to_string();
        let experiment_id = active.experiment_id().to_string();

        let (metrics, model_version) = match self.run_body(&run_id, request) {
            Ok(result) => {
                active.end(RunStatus::Success)?;
                result
            }
            Err(e) => {
                tracing::warn!(run_id = %run_id, error = %e, "run failed");
                if let Err(close) = active.end(RunStatus::Failed) {
                    tracing::warn!(run_id = %run_id, error = %close, "failed to close run");
                }
                return Err(e);
            }
        };

        self.finalize(&run_id)?;
        Ok(RunOutcome {
            experiment_id,
            run_id,
            metrics,
            model_version,
        })
    }

    fn run_body(
        &self,
        run_id: &str,
        request: &TrainRequest,
    ) -> Result<(RegressionMetrics, Option<ModelVersion>)> {
        let client = self.session.client();
        let split = &self.split;

        self.tag_run(run_id, request)?;

        let model = fit(&split.x_train, &split.y_train, &request.params)?;
        let predictions = predict(&model, &split.x_test)?;
        tracing::info!(run_id, leaves = model.leaf_count(), depth = model.depth(), "fitted model");

        let max_depth = request
            .params
            .max_depth
            .map_or_else(|| "None".to_string(), |d| d.to_string());
        client.log_param(run_id, keys::MAX_DEPTH, &max_depth)?;
        client.log_param(run_id, keys::MAX_LEAF_NODES, &request.params.max_leaf_nodes.to_string())?;

        let y_test = f64_column(&split.y_test, 0)?;
        let metrics = evaluate(y_test, &predictions)?;
        for (name, value) in metrics.named() {
            client.log_metric(run_id, name, value)?;
        }
        tracing::info!(run_id, rmse = metrics.rmse, mae = metrics.mae, r2 = metrics.r2, "logged metrics");

        let signature = self
            .options
            .save_signature
            .then(|| infer_signature(&split.x_train, &predictions));
        self.log_model(run_id, &model, ModelMetadata::new(&model, run_id, signature))?;

        let model_version = match &request.registered_model_name {
            Some(name) => Some(self.registrar.register(&RegistrationRequest {
                name,
                run_id,
                artifact_path: MODEL_ARTIFACT_PATH,
                stage: request.stage,
                archive_existing_versions: request.archive_existing_versions,
            })?),
            None => None,
        };

        if let Some(exporter) = &self.exporter {
            let name = request.registered_model_name.as_deref();
            let bytes = exporter.export(&model, &split.x_test, name)?;
            let path = format!("{}/{}", exporter.artifact_path(), exporter.file_name());
            client.log_artifact(run_id, &path, &bytes)?;
            if let Some(name) = name {
                client.set_tag(run_id, keys::EXPORT_REGISTERED_MODEL_NAME, name)?;
            }
            tracing::info!(run_id, path = %path, "logged portable model");
        }

        let plot = render_prediction_plot(y_test, &predictions);
        client.log_artifact(run_id, PLOT_ARTIFACT, plot.as_bytes())?;

        if let Some(output_path) = &request.output_path {
            client.set_tag(run_id, keys::OUTPUT_PATH, output_path)?;
            let local = local_output_path(output_path);
            std::fs::write(&local, run_id).map_err(|e| {
                Error::Persistence(format!("Failed to write run id to {local}: {e}"))
            })?;
            tracing::info!(run_id, output_path = %local, "wrote run id");
        }

        Ok((metrics, model_version))
    }

    /// Descriptive tags; all written before fitting starts.
    fn tag_run(&self, run_id: &str, request: &TrainRequest) -> Result<()> {
        let client = self.session.client();
        if self.options.use_run_id_as_run_name {
            client.set_tag(run_id, RUN_NAME_TAG, run_id)?;
        }

        let mut tags = vec![
            (keys::RUN_ID, run_id.to_string()),
            (keys::SAVE_SIGNATURE, self.options.save_signature.to_string()),
            (keys::DATA_PATH, self.options.data_path.clone()),
            (keys::REGISTERED_MODEL_VERSION_STAGE, request.stage.to_string()),
            (keys::UUID, Uuid::new_v4().simple().to_string()),
            (keys::DATASET, DATASET_NAME.to_string()),
            (keys::TIMESTAMP, self.session.timestamp()),
            (keys::VERSION_CRATE, VERSION.to_string()),
            (
                keys::VERSION_PLATFORM,
                format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            ),
        ];
        if let Some(name) = &request.registered_model_name {
            tags.push((keys::REGISTERED_MODEL_NAME, name.clone()));
        }
        if let Some(origin) = &self.options.run_origin {
            tags.push((keys::RUN_ORIGIN, origin.clone()));
        }
        for (key, value) in &tags {
            client.set_tag(run_id, key, value)?;
        }
        Ok(())
    }

    fn log_model(&self, run_id: &str, model: &FittedModel, metadata: ModelMetadata) -> Result<()> {
        let client = self.session.client();
        let model_bytes = model
            .to_json()
            .map_err(|e| Error::Persistence(format!("Failed to serialize model: {e}")))?;
        let meta_bytes = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| Error::Persistence(format!("Failed to serialize model metadata: {e}")))?;
        client.log_artifact(run_id, &format!("{MODEL_ARTIFACT_PATH}/model.json"), &model_bytes)?;
        client.log_artifact(run_id, &format!("{MODEL_ARTIFACT_PATH}/meta.json"), &meta_bytes)?;
        tracing::info!(
            run_id,
            signature = metadata.signature.is_some(),
            size = model_bytes.len(),
            "logged model"
        );
        Ok(())
    }

    /// Post-close timing tags.
    fn finalize(&self, run_id: &str) -> Result<()> {
        let client = self.session.client();
        let run = client.get_run(run_id)?;
        let (Some(start), Some(end)) = (run.start_time_ms(), run.end_time_ms()) else {
            return Err(Error::Persistence(format!(
                "run {run_id} has no recorded start/end time after closing"
            )));
        };
        client.set_tag(run_id, keys::START_TIME, &start.to_string())?;
        client.set_tag(run_id, keys::END_TIME, &end.to_string())?;
        client.set_tag(run_id, keys::START_TIME_FMT, &fmt_ts_millis(start))?;
        client.set_tag(run_id, keys::END_TIME_FMT, &fmt_ts_millis(end))?;
        tracing::info!(run_id, duration_ms = end - start, "run finalized");
        Ok(())
    }
}

/// Rewrite a `dbfs:` URI prefix to its local `/dbfs` mount.
#[must_use]
pub fn local_output_path(path: &str) -> String {
    path.strip_prefix("dbfs:")
        .map_or_else(|| path.to_string(), |rest| format!("/dbfs{rest}"))
}

/// Run one training invocation described by `config` against `client`.
///
/// # Errors
///
/// [`Error::Config`] for invalid options, otherwise any error of
/// [`Trainer::new`] or [`Trainer::train`].
pub fn train_from_config(config: &TrainConfig, client: Arc<dyn TrackingClient>) -> Result<RunOutcome> {
    config.validate()?;
    let options = TrainerOptions {
        experiment_name: config.experiment_name.clone(),
        data_path: config.data_path.clone(),
        save_signature: config.save_signature,
        run_origin: config.run_origin.clone(),
        use_run_id_as_run_name: config.use_run_id_as_run_name,
    };
    let exporter = config
        .log_as_onnx
        .then(|| Box::new(TreeEnsembleExporter) as Box<dyn ModelExporter>);
    let trainer = Trainer::new(Session::new(client), options)?.with_exporter(exporter);

    trainer.train(&TrainRequest {
        registered_model_name: config.model_name.clone(),
        stage: config.stage()?,
        archive_existing_versions: config.archive_existing_versions,
        output_path: config.output_path.clone(),
        params: config.tree_params(),
    })
}
