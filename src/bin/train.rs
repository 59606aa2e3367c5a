//! Wine-Quality training CLI
//!
//! The `wine-quality-train` command runs one tracked training pass and
//! prints the experiment id and run id on stdout.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wine_quality::config::TrainConfig;
use wine_quality::recorder::train_from_config;
use wine_quality::tracking::LocalTracking;

#[derive(Parser)]
#[command(name = "wine-quality-train")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train and track a wine-quality decision tree", long_about = None)]
struct Cli {
    /// Experiment name (default experiment if omitted)
    #[arg(long)]
    experiment_name: Option<String>,

    /// CSV file with a `quality` label column
    #[arg(long, required_unless_present = "config")]
    data_path: Option<String>,

    /// Registered model name
    #[arg(long)]
    model_name: Option<String>,

    /// Stage for the registered version (None, Staging, Production, Archived)
    #[arg(long, default_value = "None")]
    model_version_stage: String,

    /// Archive versions already in the target stage
    #[arg(long)]
    archive_existing_versions: bool,

    /// Attach an input/output signature to the model
    #[arg(long)]
    save_signature: bool,

    /// Also log a portable tree-ensemble export
    #[arg(long)]
    log_as_onnx: bool,

    /// Maximum tree depth (unbounded if omitted)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Maximum number of leaves
    #[arg(long, default_value_t = 32)]
    max_leaf_nodes: usize,

    /// Origin label recorded on the run
    #[arg(long)]
    run_origin: Option<String>,

    /// File that receives the run id
    #[arg(long)]
    output_path: Option<String>,

    /// Rename the run to its own id
    #[arg(long)]
    use_run_id_as_run_name: bool,

    /// JSON configuration file; replaces all training flags
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tracking store directory
    #[arg(long, env = "WINE_QUALITY_TRACKING_DIR", default_value = "mlruns")]
    tracking_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn train_config(&self) -> Result<TrainConfig> {
        if let Some(path) = &self.config {
            return TrainConfig::from_json_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()));
        }
        Ok(TrainConfig {
            experiment_name: self.experiment_name.clone(),
            data_path: self.data_path.clone().unwrap_or_default(),
            model_name: self.model_name.clone(),
            model_version_stage: self.model_version_stage.clone(),
            archive_existing_versions: self.archive_existing_versions,
            save_signature: self.save_signature,
            log_as_onnx: self.log_as_onnx,
            max_depth: self.max_depth,
            max_leaf_nodes: self.max_leaf_nodes,
            run_origin: self.run_origin.clone(),
            output_path: self.output_path.clone(),
            use_run_id_as_run_name: self.use_run_id_as_run_name,
        })
    }
}

fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    let config = cli.train_config()?;
    let client = LocalTracking::open(&cli.tracking_dir).with_context(|| {
        format!("Failed to open tracking store at {}", cli.tracking_dir.display())
    })?;

    let outcome = train_from_config(&config, Arc::new(client))
        .with_context(|| format!("Training run on {} failed", config.data_path))?;

    println!("Experiment ID: {}", outcome.experiment_id);
    println!("Run ID: {}", outcome.run_id);
    Ok(())
}
