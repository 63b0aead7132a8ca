use thiserror::Error;

use super::state::{RunState, StopReason};
use crate::agent::AgentError;
use crate::schema::Step;

/// Why a run ended without outputs.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Declared input keys were missing from the call.
    #[error("missing input values: {}", .missing.join(", "))]
    InvalidInput { missing: Vec<String> },

    /// The agent's output could not be parsed and no handler was configured.
    #[error(transparent)]
    ParseFailure(AgentError),

    /// A tool failed while tool errors are configured to be fatal.
    #[error("tool {tool} failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// A stopping condition fired before the agent finished.
    #[error("agent not finished: {reason}")]
    NotFinished { reason: StopReason, steps: Vec<Step> },

    #[error("run cancelled")]
    Cancelled,

    /// The finish did not carry every declared output key.
    #[error("agent did not return output values: {}", .missing.join(", "))]
    InvalidOutput { missing: Vec<String> },

    /// Any other planning failure.
    #[error("agent failed: {0}")]
    Agent(anyhow::Error),
}

impl ExecutorError {
    /// Terminal state the run ended in.
    pub fn state(&self) -> RunState {
        match self {
            ExecutorError::NotFinished { reason, .. } => reason.state(),
            _ => RunState::AbortedError,
        }
    }

    /// History accumulated before a stopping condition fired.
    pub fn steps(&self) -> Option<&[Step]> {
        match self {
            ExecutorError::NotFinished { steps, .. } => Some(steps),
            _ => None,
        }
    }

    pub fn is_not_finished(&self) -> bool {
        matches!(self, ExecutorError::NotFinished { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutorError::Cancelled)
    }
}

impl From<AgentError> for ExecutorError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::UnableToParseOutput { .. } => ExecutorError::ParseFailure(err),
            AgentError::Other(e) => ExecutorError::Agent(e),
        }
    }
}
