use serde::Serialize;
use uuid::Uuid;

use super::state::StopReason;
use crate::schema::{Action, Outputs};

/// Something that happened during a run, tagged with the run it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionEvent {
    pub run_id: Uuid,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    /// Agent proposed an action.
    AgentAction { iteration: usize, action: Action },
    /// A registered tool is being called.
    ToolCall { tool: String, input: String },
    /// The action named a tool that is not registered.
    ToolNotFound { tool: String },
    /// Tool execution completed (or failed, when `is_error`).
    ToolResult {
        tool: String,
        observation: String,
        is_error: bool,
    },
    /// An unparsable agent output was turned into an observation.
    ParserErrorRecovered { observation: String },
    /// Run finished with outputs.
    Finished { outputs: Outputs },
    /// Stopping condition fired.
    Stopped { reason: StopReason },
    /// Run aborted.
    Error { message: String },
}
