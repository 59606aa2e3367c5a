//! Scoped run context

use super::TrackingClient;
use crate::experiment::{RunRecord, RunStatus};
use crate::Result;

/// A run that is open in the tracking store.
///
/// Call [`ActiveRun::end`] to close it with an explicit status. If the guard
/// is dropped while still open (early return, panic unwinding), the run is
/// closed as `Failed` so that no run stays open in the store.
pub struct ActiveRun<'a> {
    client: &'a dyn TrackingClient,
    run: RunRecord,
    open: bool,
}

impl<'a> ActiveRun<'a> {
    /// Create a run under `experiment_id` and take ownership of its context.
    ///
    /// # Errors
    ///
    /// Propagates store failures from run creation.
    pub fn start(
        client: &'a dyn TrackingClient,
        experiment_id: &str,
        run_name: Option<&str>,
    ) -> Result<Self> {
        let run = client.create_run(experiment_id, run_name)?;
        tracing::info!(
            run_id = run.run_id(),
            experiment_id,
            run_name = run_name.unwrap_or_default(),
            "run opened"
        );
        Ok(Self {
            client,
            run,
            open: true,
        })
    }

    /// Id assigned by the store.
    #[must_use]
    pub fn run_id(&self) -> &str {
        self.run.run_id()
    }

    /// Owning experiment.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        self.run.experiment_id()
    }

    /// Close the run with `status`.
    ///
    /// # Errors
    ///
    /// Propagates store failures. The run then stays open and the guard
    /// closes it as `Failed` when dropped.
    pub fn end(mut self, status: RunStatus) -> Result<()> {
        self.client.end_run(self.run.run_id(), status)?;
        self.open = false;
        tracing::info!(run_id = self.run.run_id(), ?status, "run closed");
        Ok(())
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        tracing::warn!(run_id = self.run.run_id(), "run context dropped while open; closing as failed");
        if let Err(e) = self.client.end_run(self.run.run_id(), RunStatus::Failed) {
            tracing::warn!(run_id = self.run.run_id(), error = %e, "failed to close run");
        }
    }
}
