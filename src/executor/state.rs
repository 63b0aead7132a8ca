use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    /// Agent returned a finish
    Finished,
    StoppedMaxIterations,
    StoppedMaxTime,
    /// A fatal error ended the run
    AbortedError,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunState::Running)
    }
}

/// Stopping condition that ended a run early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxIterations(usize),
    MaxExecutionTime(Duration),
}

impl StopReason {
    pub fn state(&self) -> RunState {
        match self {
            StopReason::MaxIterations(_) => RunState::StoppedMaxIterations,
            StopReason::MaxExecutionTime(_) => RunState::StoppedMaxTime,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::MaxIterations(n) => write!(f, "max iterations ({}) reached", n),
            StopReason::MaxExecutionTime(d) => {
                write!(f, "max execution time ({:?}) exceeded", d)
            }
        }
    }
}
