//! Model-backed ReAct agent.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::parser::parse_output;
use super::prompt::build_prompt;
use super::{Agent, AgentError};
use crate::llm::LlmClient;
use crate::schema::{Decision, Inputs, Step, DEFAULT_OUTPUT_KEY};
use crate::tools::{Tool, ToolInfo};

/// Asks a language model for `Action:` / `Final Answer:` text each iteration.
pub struct ReactAgent {
    llm: Arc<dyn LlmClient>,
    tools: Vec<Arc<dyn Tool>>,
    input_key: String,
    output_key: String,
}

impl ReactAgent {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            llm,
            tools,
            input_key: "input".to_string(),
            output_key: DEFAULT_OUTPUT_KEY.to_string(),
        }
    }

    pub fn with_input_key(mut self, key: impl Into<String>) -> Self {
        self.input_key = key.into();
        self
    }

    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = key.into();
        self
    }

    fn tool_infos(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }
}

#[async_trait]
impl Agent for ReactAgent {
    async fn plan(
        &self,
        cancel: &CancellationToken,
        history: &[Step],
        inputs: &Inputs,
    ) -> Result<Decision, AgentError> {
        let question = inputs
            .get(&self.input_key)
            .map(String::as_str)
            .unwrap_or_default();
        let prompt = build_prompt(question, &self.tool_infos(), history);
        let stop = vec!["\nObservation:".to_string()];

        tracing::trace!("ReactAgent prompt:\n{}", prompt);
        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(anyhow::anyhow!("planning cancelled").into()),
            output = self.llm.complete(&prompt, &stop) => output?,
        };
        tracing::debug!("ReactAgent output: {}", output);

        parse_output(&output, &self.output_key)
    }

    fn input_keys(&self) -> Vec<String> {
        vec![self.input_key.clone()]
    }

    fn output_keys(&self) -> Vec<String> {
        vec![self.output_key.clone()]
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.clone()
    }
}
