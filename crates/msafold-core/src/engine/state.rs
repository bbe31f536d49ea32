use std::fmt;

/// The four working stages of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Preparing,
    Searching,
    Aligning,
    Predicting,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Preparing,
        Stage::Searching,
        Stage::Aligning,
        Stage::Predicting,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Preparing => "Preparing",
            Stage::Searching => "Searching",
            Stage::Aligning => "Aligning",
            Stage::Predicting => "Predicting",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a pipeline run as observed through the orchestrator.
///
/// `Idle` is only ever the state of a freshly constructed orchestrator. From there a run
/// moves strictly forward through the stages and ends in exactly one of the terminal
/// states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Idle,
    Preparing,
    Searching,
    Aligning,
    Predicting,
    Completed,
    Failed,
    Aborted,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed | RunState::Aborted)
    }

    /// Whether a new run may start from this state.
    pub fn accepts_new_run(self) -> bool {
        self == RunState::Idle || self.is_terminal()
    }
}

impl From<Stage> for RunState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Preparing => RunState::Preparing,
            Stage::Searching => RunState::Searching,
            Stage::Aligning => RunState::Aligning,
            Stage::Predicting => RunState::Predicting,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "Idle",
            RunState::Preparing => "Preparing",
            RunState::Searching => "Searching",
            RunState::Aligning => "Aligning",
            RunState::Predicting => "Predicting",
            RunState::Completed => "Completed",
            RunState::Failed => "Failed",
            RunState::Aborted => "Aborted",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_idle_and_terminal_states_accept_a_new_run() {
        assert!(RunState::Idle.accepts_new_run());
        assert!(RunState::Aborted.accepts_new_run());
        assert!(RunState::Failed.accepts_new_run());
        for stage in Stage::ALL {
            assert!(!RunState::from(stage).accepts_new_run());
            assert!(!RunState::from(stage).is_terminal());
        }
    }

    #[test]
    fn stages_are_ordered_by_execution() {
        let mut shuffled = [
            Stage::Predicting,
            Stage::Preparing,
            Stage::Aligning,
            Stage::Searching,
        ];
        shuffled.sort();
        assert_eq!(shuffled, Stage::ALL);
    }
}
