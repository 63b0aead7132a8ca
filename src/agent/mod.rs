//! Agent module - the decision-making policy driven by the executor.
//!
//! An agent looks at the history of completed steps and the run inputs and
//! either proposes tool calls or declares the run finished. The executor
//! owns the loop; agents only decide.

mod functions;
mod parser;
mod prompt;
mod react;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::schema::{Decision, Inputs, Step};
use crate::tools::Tool;

pub use functions::{function_definition, FunctionsAgent};
pub use parser::parse_output;
pub use prompt::{build_prompt, build_scratchpad};
pub use react::ReactAgent;

/// Why an agent could not produce a decision.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent's raw output was neither an action nor a final answer.
    #[error("unable to parse agent output")]
    UnableToParseOutput {
        /// The text that failed to parse
        output: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AgentError {
    pub fn unparsable(output: impl Into<String>) -> Self {
        AgentError::UnableToParseOutput {
            output: output.into(),
        }
    }

    pub fn is_parse_failure(&self) -> bool {
        matches!(self, AgentError::UnableToParseOutput { .. })
    }

    /// Raw output that failed to parse, if this is a parse failure.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            AgentError::UnableToParseOutput { output } => Some(output),
            AgentError::Other(_) => None,
        }
    }
}

/// The policy deciding what happens next.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Decide the next actions, or finish.
    ///
    /// `history` holds every step completed so far in this run, oldest first.
    /// `cancel` fires when the run is cancelled.
    async fn plan(
        &self,
        cancel: &CancellationToken,
        history: &[Step],
        inputs: &Inputs,
    ) -> Result<Decision, AgentError>;

    /// Input keys a run must supply.
    fn input_keys(&self) -> Vec<String>;

    /// Output keys a finish must produce.
    fn output_keys(&self) -> Vec<String>;

    /// Tools this agent knows how to call.
    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        Vec::new()
    }
}
