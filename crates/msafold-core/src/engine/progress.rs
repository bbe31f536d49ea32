use super::state::Stage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    PhaseStart { stage: Stage },
    PhaseFinish { stage: Stage },

    /// One line of merged stdout/stderr from an external tool, in emission order.
    ToolOutput { tool: String, line: String },

    Message(String),
}

impl Progress {
    /// The line this event contributes to the run log.
    pub fn log_line(&self) -> String {
        match self {
            Progress::PhaseStart { stage } => format!("==> {}", stage),
            Progress::PhaseFinish { stage } => format!("<== {} done", stage),
            Progress::ToolOutput { tool, line } => format!("[{}] {}", tool, line),
            Progress::Message(msg) => msg.clone(),
        }
    }
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
