use super::command::{CommandSummary, ManagedCommand};
use super::config::PipelineConfig;
use super::error::{PipelineError, ToolFailure};
use super::progress::{Progress, ProgressReporter};
use super::state::Stage;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::info;

pub const LOG_DIR_NAME: &str = "logs";

/// Everything a stage task needs to run: where artifacts go, how to reach the tools,
/// where to report progress, and whether the run has been cancelled.
pub struct RunContext<'a> {
    pub work_dir: PathBuf,
    pub log_dir: PathBuf,
    pub config: &'a PipelineConfig,
    pub reporter: &'a ProgressReporter<'a>,
    cancel: watch::Receiver<bool>,
}

impl<'a> RunContext<'a> {
    /// Creates the working and log directories if needed.
    pub fn new(
        work_dir: impl Into<PathBuf>,
        config: &'a PipelineConfig,
        reporter: &'a ProgressReporter<'a>,
        cancel: watch::Receiver<bool>,
    ) -> Result<Self, PipelineError> {
        let work_dir = work_dir.into();
        let log_dir = work_dir.join(LOG_DIR_NAME);
        fs::create_dir_all(&log_dir).map_err(|e| PipelineError::io(&log_dir, e))?;
        Ok(Self {
            work_dir,
            log_dir,
            config,
            reporter,
            cancel,
        })
    }

    /// The path of an artifact inside the working directory.
    pub fn artifact(&self, name: impl AsRef<Path>) -> PathBuf {
        self.work_dir.join(name)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    pub fn ensure_not_cancelled(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Announces the start of a stage. A cancelled run never enters another stage.
    pub fn enter(&self, stage: Stage) -> Result<(), PipelineError> {
        self.ensure_not_cancelled()?;
        info!(stage = %stage, "Entering stage.");
        self.reporter.report(Progress::PhaseStart { stage });
        Ok(())
    }

    pub fn finish(&self, stage: Stage) {
        self.reporter.report(Progress::PhaseFinish { stage });
    }

    pub fn message(&self, text: impl Into<String>) {
        self.reporter.report(Progress::Message(text.into()));
    }

    /// Runs a tool through the managed command, wrapping its failure with `stage`.
    pub async fn run_tool(
        &self,
        command: ManagedCommand<'_>,
        stage: fn(ToolFailure) -> PipelineError,
    ) -> Result<CommandSummary, PipelineError> {
        let mut cancel = self.cancel.clone();
        command
            .run(&self.log_dir, self.reporter, &mut cancel)
            .await
            .map_err(|e| e.into_stage_error(stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_creates_the_log_directory() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::default();
        let reporter = ProgressReporter::new();
        let (_tx, rx) = watch::channel(false);

        let ctx = RunContext::new(dir.path().join("work"), &config, &reporter, rx).unwrap();
        assert!(ctx.log_dir.is_dir());
        assert_eq!(ctx.artifact("query.fasta"), dir.path().join("work/query.fasta"));
    }

    #[test]
    fn cancelled_runs_refuse_to_enter_a_stage() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::default();
        let reporter = ProgressReporter::new();
        let (tx, rx) = watch::channel(false);
        let ctx = RunContext::new(dir.path(), &config, &reporter, rx).unwrap();

        assert!(ctx.enter(Stage::Preparing).is_ok());
        tx.send(true).unwrap();
        assert!(matches!(
            ctx.enter(Stage::Searching),
            Err(PipelineError::Cancelled)
        ));
    }
}
