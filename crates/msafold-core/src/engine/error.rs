use super::config::ConfigError;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Diagnostic context of an external tool that did not finish successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    pub tool: String,
    /// `None` when the tool could not be started or was terminated by a signal.
    pub exit_code: Option<i32>,
    pub log_path: PathBuf,
    /// Last lines the tool printed, oldest first.
    pub tail: Vec<String>,
    pub detail: Option<String>,
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.exit_code, &self.detail) {
            (Some(code), None) => write!(f, "`{}` exited with code {}", self.tool, code)?,
            (Some(code), Some(detail)) => {
                write!(f, "`{}` exited with code {}: {}", self.tool, code, detail)?
            }
            (None, Some(detail)) => write!(f, "`{}` failed: {}", self.tool, detail)?,
            (None, None) => write!(f, "`{}` was terminated by a signal", self.tool)?,
        }
        write!(f, "; see {} for details", self.log_path.display())?;
        if !self.tail.is_empty() {
            write!(f, "\n  last output:")?;
            for line in &self.tail {
                write!(f, "\n    {}", line)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Database build failed: {0}")]
    DatabaseBuild(ToolFailure),

    #[error("Homology search failed: {0}")]
    Search(ToolFailure),

    #[error("Failed to read search results from '{path}': {reason}", path = path.display())]
    SearchOutput { path: PathBuf, reason: String },

    #[error("Alignment failed: {0}")]
    Alignment(ToolFailure),

    #[error("Aligner produced an unusable alignment in '{path}': {reason}", path = path.display())]
    AlignmentOutput { path: PathBuf, reason: String },

    #[error("Structure prediction failed: {0}")]
    Prediction(ToolFailure),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Pipeline is busy: {0}")]
    Busy(String),

    #[error("Pipeline run was cancelled")]
    Cancelled,

    #[error("I/O error at '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// The taxonomy class of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DatabaseBuild,
    Search,
    Alignment,
    Prediction,
    InvalidInput,
    Busy,
    Cancelled,
    Io,
    Config,
    Internal,
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DatabaseBuild(_) => ErrorKind::DatabaseBuild,
            Self::Search(_) | Self::SearchOutput { .. } => ErrorKind::Search,
            Self::Alignment(_) | Self::AlignmentOutput { .. } => ErrorKind::Alignment,
            Self::Prediction(_) => ErrorKind::Prediction,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Busy(_) => ErrorKind::Busy,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io { .. } => ErrorKind::Io,
            Self::Config(_) => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The failure record of an external tool, if this error came from one.
    pub fn tool_failure(&self) -> Option<&ToolFailure> {
        match self {
            Self::DatabaseBuild(f)
            | Self::Search(f)
            | Self::Alignment(f)
            | Self::Prediction(f) => Some(f),
            _ => None,
        }
    }
}
