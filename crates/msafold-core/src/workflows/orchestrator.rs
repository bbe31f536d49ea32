//! The public entry point for running pipelines.
//!
//! An [`Orchestrator`] runs at most one pipeline at a time. [`Orchestrator::start`]
//! returns immediately with a [`RunHandle`]; the run itself is driven on its own tokio
//! task, so the caller stays free to render progress, handle input, or cancel. The
//! handle yields the run's progress events in order and, once the run is over, its
//! [`RunReport`].

use super::pipeline::{self, QueryInput};
use crate::engine::config::PipelineConfig;
use crate::engine::context::{LOG_DIR_NAME, RunContext};
use crate::engine::error::PipelineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::RunState;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub const LOCK_FILE: &str = ".msafold.lock";
pub const PIPELINE_LOG: &str = "pipeline.log";
pub const DEFAULT_OUTPUT_DIR: &str = "predictions";

/// Everything needed to start one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub query: QueryInput,
    pub database: PathBuf,
    pub work_dir: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub config: PipelineConfig,
}

impl RunRequest {
    pub fn new(query: QueryInput, database: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            query,
            database: database.into(),
            work_dir: work_dir.into(),
            output_dir: None,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// The predictor's output directory; `<work_dir>/predictions` unless overridden.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.work_dir.join(DEFAULT_OUTPUT_DIR))
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(PathBuf),
    Failed(PipelineError),
    Aborted,
}

impl RunOutcome {
    pub fn state(&self) -> RunState {
        match self {
            RunOutcome::Completed(_) => RunState::Completed,
            RunOutcome::Failed(_) => RunState::Failed,
            RunOutcome::Aborted => RunState::Aborted,
        }
    }
}

/// The terminal result of a run together with every log line it produced.
#[derive(Debug)]
pub struct RunReport {
    pub id: u64,
    pub outcome: RunOutcome,
    pub log: Vec<String>,
}

/// Requests cancellation of one run. Cheap to clone and usable after the
/// [`RunHandle`] has been consumed by [`RunHandle::wait`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

pub struct RunHandle {
    id: u64,
    events: mpsc::UnboundedReceiver<Progress>,
    cancel: CancelHandle,
    task: JoinHandle<RunReport>,
}

impl RunHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The next progress event, in emission order. `None` once the run has ended and
    /// every event has been delivered.
    pub async fn next_event(&mut self) -> Option<Progress> {
        self.events.recv().await
    }

    /// Kills the running tool and stops the run; it ends as [`RunOutcome::Aborted`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Waits for the run to end. Events not yet read are dropped.
    pub async fn wait(self) -> RunReport {
        match self.task.await {
            Ok(report) => report,
            Err(e) => RunReport {
                id: self.id,
                outcome: RunOutcome::Failed(PipelineError::Internal(format!(
                    "pipeline task ended abnormally: {e}"
                ))),
                log: Vec::new(),
            },
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: RunState,
    runs_started: u64,
    active: Option<CancelHandle>,
}

#[derive(Debug, Clone)]
pub struct Orchestrator {
    inner: Arc<Mutex<Inner>>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: RunState::Idle,
                runs_started: 0,
                active: None,
            })),
        }
    }

    pub fn state(&self) -> RunState {
        lock(&self.inner).state
    }

    /// Starts a run on the current tokio runtime.
    ///
    /// Fails with [`PipelineError::Busy`] while another run of this orchestrator is in a
    /// non-terminal state, or while any run holds the lock of the same working
    /// directory.
    pub fn start(&self, request: RunRequest) -> Result<RunHandle, PipelineError> {
        request.config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PipelineError::Internal(format!("no tokio runtime available: {e}")))?;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let cancel = CancelHandle {
            sender: Arc::new(cancel_tx),
        };
        let (id, guard) = {
            let mut inner = lock(&self.inner);
            if !inner.state.accepts_new_run() {
                return Err(PipelineError::Busy(format!(
                    "run {} is still {}",
                    inner.runs_started, inner.state
                )));
            }
            let work_lock = WorkDirLock::acquire(&request.work_dir)?;
            inner.runs_started += 1;
            inner.state = RunState::Preparing;
            inner.active = Some(cancel.clone());
            let guard = RunGuard {
                inner: Arc::clone(&self.inner),
                work_lock: Some(work_lock),
                finished: false,
            };
            (inner.runs_started, guard)
        };

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        info!(run = id, work_dir = %request.work_dir.display(), "Starting pipeline run.");

        let task = runtime.spawn(drive(id, request, guard, cancel_rx, event_tx));
        Ok(RunHandle {
            id,
            events: event_rx,
            cancel,
            task,
        })
    }

    pub fn cancel(&self, handle: &RunHandle) {
        info!(run = handle.id(), "Cancellation requested.");
        handle.cancel();
    }

    /// Cancels whichever run is in flight, even if its [`RunHandle`] was dropped.
    /// Returns `false` when no run is active.
    pub fn cancel_active(&self) -> bool {
        let inner = lock(&self.inner);
        match &inner.active {
            Some(cancel) => {
                info!(run = inner.runs_started, "Cancellation requested.");
                cancel.cancel();
                true
            }
            None => false,
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn drive(
    id: u64,
    request: RunRequest,
    mut guard: RunGuard,
    cancel: watch::Receiver<bool>,
    events: mpsc::UnboundedSender<Progress>,
) -> RunReport {
    let log_lines = Arc::new(Mutex::new(Vec::new()));
    let pipeline_log = open_pipeline_log(&request.work_dir);
    if let Err(e) = &pipeline_log {
        warn!(error = %e, "Pipeline log could not be opened; continuing without it.");
    }
    let pipeline_log = Mutex::new(pipeline_log.ok());

    let reporter = {
        let inner = Arc::clone(&guard.inner);
        let log_lines = Arc::clone(&log_lines);
        ProgressReporter::with_callback(Box::new(move |event: Progress| {
            if let Progress::PhaseStart { stage } = &event {
                lock(&inner).state = RunState::from(*stage);
            }
            let line = event.log_line();
            if let Some(file) = pipeline_log
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .as_mut()
            {
                let _ = writeln!(file, "{}", line);
            }
            log_lines
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .push(line);
            let _ = events.send(event);
        }))
    };

    reporter.report(Progress::Message(format!(
        "Run {} started (strategy {})",
        id, request.config.strategy
    )));

    let cancel_seen = cancel.clone();
    let result = match RunContext::new(&request.work_dir, &request.config, &reporter, cancel) {
        Ok(ctx) => {
            let output_dir = request.output_dir();
            pipeline::run(&ctx, &request.query, &request.database, &output_dir).await
        }
        Err(e) => Err(e),
    };

    let outcome = match result {
        Ok(dir) => RunOutcome::Completed(dir),
        Err(PipelineError::Cancelled) => RunOutcome::Aborted,
        Err(_) if *cancel_seen.borrow() => RunOutcome::Aborted,
        Err(e) => RunOutcome::Failed(e),
    };

    let summary = match &outcome {
        RunOutcome::Completed(dir) => format!("Run {} completed: {}", id, dir.display()),
        RunOutcome::Failed(e) => format!("Run {} failed: {}", id, e),
        RunOutcome::Aborted => format!("Run {} aborted", id),
    };
    match &outcome {
        RunOutcome::Failed(_) => error!(run = id, "{}", summary),
        _ => info!(run = id, "{}", summary),
    }
    reporter.report(Progress::Message(summary));
    // Closes the event stream.
    drop(reporter);

    guard.finish(outcome.state());
    let log = std::mem::take(&mut *log_lines.lock().unwrap_or_else(|p| p.into_inner()));
    RunReport { id, outcome, log }
}

fn open_pipeline_log(work_dir: &Path) -> io::Result<File> {
    let log_dir = work_dir.join(LOG_DIR_NAME);
    fs::create_dir_all(&log_dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(PIPELINE_LOG))
}

/// Exclusive claim on a working directory, held for the lifetime of a run.
#[derive(Debug)]
struct WorkDirLock {
    path: PathBuf,
}

impl WorkDirLock {
    fn acquire(work_dir: &Path) -> Result<Self, PipelineError> {
        fs::create_dir_all(work_dir).map_err(|e| PipelineError::io(work_dir, e))?;
        let path = work_dir.join(LOCK_FILE);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Self { path })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(PipelineError::Busy(format!(
                "working directory '{}' is in use by another run (remove '{}' if that run is gone)",
                work_dir.display(),
                path.display()
            ))),
            Err(e) => Err(PipelineError::io(&path, e)),
        }
    }
}

impl Drop for WorkDirLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove working directory lock.");
        }
    }
}

/// Releases the working directory and moves the orchestrator to a terminal state, even
/// if the run's task is torn down early.
struct RunGuard {
    inner: Arc<Mutex<Inner>>,
    work_lock: Option<WorkDirLock>,
    finished: bool,
}

impl RunGuard {
    fn finish(&mut self, state: RunState) {
        // The lock goes first: once the state is terminal a new run may claim the
        // directory.
        self.work_lock.take();
        let mut inner = lock(&self.inner);
        inner.state = state;
        inner.active = None;
        self.finished = true;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(RunState::Failed);
        }
    }
}
