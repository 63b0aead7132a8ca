//! Data exchanged between the executor, agents and tools.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Named input values supplied by the caller of a run.
pub type Inputs = HashMap<String, String>;

/// Named output values produced by a finished run.
pub type Outputs = HashMap<String, String>;

/// Output key used when an agent only produces a single answer.
pub const DEFAULT_OUTPUT_KEY: &str = "output";

/// A proposed tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Name of the tool to call
    pub tool: String,

    /// Raw text handed to the tool
    pub tool_input: String,

    /// Agent rationale, kept for diagnostics only
    #[serde(default)]
    pub log: String,

    /// Id of the model tool call this action came from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Action {
    pub fn new(tool: impl Into<String>, tool_input: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            tool_input: tool_input.into(),
            log: String::new(),
            tool_call_id: None,
        }
    }

    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = log.into();
        self
    }

    pub fn with_tool_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = Some(id.into());
        self
    }
}

/// One completed round: the action taken and what came back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub action: Action,
    pub observation: String,
}

impl Step {
    pub fn new(action: Action, observation: impl Into<String>) -> Self {
        Self {
            action,
            observation: observation.into(),
        }
    }
}

/// The agent's terminal decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finish {
    pub outputs: Outputs,

    #[serde(default)]
    pub log: String,
}

impl Finish {
    pub fn new(outputs: Outputs) -> Self {
        Self {
            outputs,
            log: String::new(),
        }
    }

    /// Finish with a single value under [`DEFAULT_OUTPUT_KEY`].
    pub fn output(value: impl Into<String>) -> Self {
        let mut outputs = Outputs::new();
        outputs.insert(DEFAULT_OUTPUT_KEY.to_string(), value.into());
        Self::new(outputs)
    }

    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = log.into();
        self
    }
}

/// What an agent decided to do next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Run these tools, in order
    Actions(Vec<Action>),
    /// Stop and return these outputs
    Finish(Finish),
}

impl Decision {
    pub fn action(action: Action) -> Self {
        Decision::Actions(vec![action])
    }
}
