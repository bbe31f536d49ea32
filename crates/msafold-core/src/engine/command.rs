//! The managed external command shared by every pipeline stage.
//!
//! A tool is spawned with its stderr (and, unless redirected to a file, its stdout)
//! attached to the write end of a single OS pipe, so the caller observes one stream in
//! the order the process emitted it. A reader thread forwards that stream line by line;
//! each line is appended to the tool's log file, kept in a bounded tail for error
//! reports, and published as a [`Progress::ToolOutput`] event. Cancellation is a
//! `watch` flag: once it flips to `true` the child is killed on the spot.
//!
//! On unix the tool leads its own process group, and cancellation (or dropping a run
//! mid-flight) signals the whole group, so wrapper scripts cannot leave workers behind.

use super::config::ToolCommand;
use super::error::{PipelineError, ToolFailure};
use super::progress::{Progress, ProgressReporter};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

const DEFAULT_TAIL_LINES: usize = 20;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        log_path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("I/O error at '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited unsuccessfully (code {code:?})")]
    Failed {
        program: String,
        code: Option<i32>,
        log_path: PathBuf,
        tail: Vec<String>,
    },
    #[error("`{program}` was cancelled")]
    Cancelled { program: String },
}

impl CommandError {
    /// Wraps this error into the stage error built by `stage`. Cancellation and local
    /// I/O problems keep their own classes.
    pub fn into_stage_error(self, stage: fn(ToolFailure) -> PipelineError) -> PipelineError {
        match self {
            CommandError::Spawn {
                program,
                log_path,
                source,
            } => stage(ToolFailure {
                tool: program,
                exit_code: None,
                log_path,
                tail: Vec::new(),
                detail: Some(source.to_string()),
            }),
            CommandError::Failed {
                program,
                code,
                log_path,
                tail,
            } => stage(ToolFailure {
                tool: program,
                exit_code: code,
                log_path,
                tail,
                detail: None,
            }),
            CommandError::Io { path, source } => PipelineError::Io { path, source },
            CommandError::Cancelled { .. } => PipelineError::Cancelled,
        }
    }
}

/// What a successful invocation left behind.
#[derive(Debug, Clone)]
pub struct CommandSummary {
    pub log_path: PathBuf,
    pub lines: usize,
    pub tail: Vec<String>,
}

pub struct ManagedCommand<'a> {
    tool: &'a ToolCommand,
    label: String,
    args: Vec<OsString>,
    stdout_path: Option<PathBuf>,
    tail_lines: usize,
}

impl<'a> ManagedCommand<'a> {
    pub fn new(tool: &'a ToolCommand) -> Self {
        Self {
            tool,
            label: tool.name().to_string(),
            args: Vec::new(),
            stdout_path: None,
            tail_lines: DEFAULT_TAIL_LINES,
        }
    }

    /// Overrides the name used for the log file and progress events.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sends stdout to `path` instead of the merged stream; stderr is still streamed.
    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout_path = Some(path.into());
        self
    }

    pub fn tail_lines(mut self, n: usize) -> Self {
        self.tail_lines = n;
        self
    }

    fn command_line(&self) -> String {
        let mut line = self.tool.to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    /// Runs the tool to completion, streaming its output until it exits.
    ///
    /// Returns [`CommandError::Cancelled`] as soon as `cancel` holds `true`; the child's
    /// process group is killed and the reader thread is left to drain on its own.
    pub async fn run(
        self,
        log_dir: &Path,
        reporter: &ProgressReporter<'_>,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<CommandSummary, CommandError> {
        let program = self.tool.program.clone();
        if *cancel.borrow() {
            return Err(CommandError::Cancelled { program });
        }

        let log_path = log_dir.join(format!("{}.log", self.label));
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| CommandError::Io { path, source }
        };

        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(io_err(&log_path))?;
        let command_line = self.command_line();
        writeln!(log, "$ {}", command_line).map_err(io_err(&log_path))?;
        info!(tool = %self.label, command = %command_line, "Launching external tool.");

        let (pipe_reader, pipe_writer) = io::pipe().map_err(io_err(log_dir))?;

        // The command (and with it the parent's copies of the pipe's write end) is
        // dropped at the end of this block so the reader sees EOF once the child exits.
        let mut child = {
            let mut cmd = Command::new(&self.tool.program);
            cmd.args(&self.tool.args)
                .args(&self.args)
                .stdin(Stdio::null())
                .kill_on_drop(true);
            #[cfg(unix)]
            cmd.process_group(0);
            match &self.stdout_path {
                Some(path) => {
                    let file = File::create(path).map_err(io_err(path))?;
                    cmd.stdout(Stdio::from(file));
                }
                None => {
                    let writer = pipe_writer.try_clone().map_err(io_err(log_dir))?;
                    cmd.stdout(Stdio::from(writer));
                }
            }
            cmd.stderr(Stdio::from(pipe_writer));

            match cmd.spawn() {
                Ok(child) => child,
                Err(source) => {
                    let _ = writeln!(log, "failed to start: {}", source);
                    return Err(CommandError::Spawn {
                        program,
                        log_path,
                        source,
                    });
                }
            }
        };

        let mut group = ProcessGroup::new(child.id());
        let (line_tx, mut line_rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || forward_lines(pipe_reader, line_tx));

        let mut tail = VecDeque::with_capacity(self.tail_lines);
        let mut lines = 0usize;
        let mut status: Option<ExitStatus> = None;
        let mut output_open = true;
        let mut watching_cancel = true;

        while status.is_none() || output_open {
            tokio::select! {
                biased;

                changed = cancel.changed(), if watching_cancel => {
                    if changed.is_err() {
                        // Sender gone: nobody can cancel any more.
                        watching_cancel = false;
                    } else if *cancel.borrow() {
                        warn!(tool = %self.label, "Cancellation requested; killing external tool.");
                        if let Err(e) = group.kill() {
                            warn!(tool = %self.label, error = %e, "Failed to signal the tool's process group.");
                        }
                        if status.is_none() {
                            if let Err(e) = child.kill().await {
                                warn!(tool = %self.label, error = %e, "Failed to kill external tool.");
                            }
                        }
                        let _ = writeln!(log, "cancelled");
                        return Err(CommandError::Cancelled { program });
                    }
                }

                line = line_rx.recv(), if output_open => match line {
                    Some(Ok(line)) => {
                        writeln!(log, "{}", line).map_err(io_err(&log_path))?;
                        debug!(tool = %self.label, "{}", line);
                        if tail.len() == self.tail_lines {
                            tail.pop_front();
                        }
                        if self.tail_lines > 0 {
                            tail.push_back(line.clone());
                        }
                        lines += 1;
                        reporter.report(Progress::ToolOutput {
                            tool: self.label.clone(),
                            line,
                        });
                    }
                    Some(Err(source)) => return Err(CommandError::Io { path: log_path, source }),
                    None => output_open = false,
                },

                exit = child.wait(), if status.is_none() => {
                    status = Some(exit.map_err(io_err(&log_path))?);
                }
            }
        }

        group.release();
        let tail: Vec<String> = tail.into();
        let code = status.and_then(|s| s.code());
        writeln!(log, "exit status: {:?}", code).map_err(io_err(&log_path))?;

        if status.is_some_and(|s| s.success()) {
            info!(tool = %self.label, lines, "External tool finished.");
            Ok(CommandSummary {
                log_path,
                lines,
                tail,
            })
        } else {
            warn!(tool = %self.label, code = ?code, "External tool failed.");
            Err(CommandError::Failed {
                program,
                code,
                log_path,
                tail,
            })
        }
    }
}

/// The process group led by a spawned tool. Killed on drop unless released.
struct ProcessGroup {
    id: Option<u32>,
}

impl ProcessGroup {
    fn new(id: Option<u32>) -> Self {
        Self { id }
    }

    #[cfg(unix)]
    fn kill(&mut self) -> io::Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        let Some(id) = self.id.take() else {
            return Ok(());
        };
        let Ok(pgid) = i32::try_from(id) else {
            return Ok(());
        };
        match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(io::Error::from(errno)),
        }
    }

    #[cfg(not(unix))]
    fn kill(&mut self) -> io::Result<()> {
        self.id = None;
        Ok(())
    }

    /// Forgets the group once the tool has exited on its own.
    fn release(&mut self) {
        self.id = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        let _ = self.kill();
    }
}

fn forward_lines(pipe: io::PipeReader, tx: mpsc::UnboundedSender<io::Result<String>>) {
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\n', '\r'])
                    .to_string();
                if tx.send(Ok(line)).is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e));
                break;
            }
        }
    }
}
