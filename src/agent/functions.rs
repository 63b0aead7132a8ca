//! Function-calling agent.
//!
//! The model sees every tool as a function with a single string argument and
//! picks tools through structured tool calls. One turn may request several
//! calls; each becomes an action. A turn with text and no calls finishes.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::{Agent, AgentError};
use crate::llm::{ChatClient, ChatMessage, FunctionDefinition, ToolCall};
use crate::schema::{Action, Decision, Finish, Inputs, Outputs, Step, DEFAULT_OUTPUT_KEY};
use crate::tools::Tool;

/// Argument name carrying a tool's text input.
const ARG_KEY: &str = "__arg1";

const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful assistant.";

/// Asks a chat model with native tool calling for the next actions.
pub struct FunctionsAgent {
    llm: Arc<dyn ChatClient>,
    tools: Vec<Arc<dyn Tool>>,
    system_message: String,
    extra_messages: Vec<ChatMessage>,
    input_key: String,
    output_key: String,
}

impl FunctionsAgent {
    pub fn new(llm: Arc<dyn ChatClient>, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            llm,
            tools,
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            extra_messages: Vec::new(),
            input_key: "input".to_string(),
            output_key: DEFAULT_OUTPUT_KEY.to_string(),
        }
    }

    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = message.into();
        self
    }

    /// Message placed after the question, before the history.
    pub fn with_extra_message(mut self, message: ChatMessage) -> Self {
        self.extra_messages.push(message);
        self
    }

    pub fn with_input_key(mut self, key: impl Into<String>) -> Self {
        self.input_key = key.into();
        self
    }

    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = key.into();
        self
    }

    fn functions(&self) -> Vec<FunctionDefinition> {
        self.tools
            .iter()
            .map(|tool| function_definition(tool.as_ref()))
            .collect()
    }

    /// Transcript for one planning call: system, question, extras, then history.
    fn messages(&self, question: &str, history: &[Step]) -> Vec<ChatMessage> {
        let mut messages = vec![
            ChatMessage::system(self.system_message.clone()),
            ChatMessage::user(question),
        ];
        messages.extend(self.extra_messages.iter().cloned());

        for step in history {
            match &step.action.tool_call_id {
                Some(id) => {
                    let arguments = json!({ ARG_KEY: step.action.tool_input }).to_string();
                    messages.push(ChatMessage::tool_calls(vec![ToolCall::new(
                        id.clone(),
                        step.action.tool.clone(),
                        arguments,
                    )]));
                    messages.push(ChatMessage::tool_result(id.clone(), step.observation.clone()));
                }
                // recovered parse failure, not a tool call
                None => {
                    if !step.action.log.is_empty() {
                        messages.push(ChatMessage::assistant(step.action.log.clone()));
                    }
                    messages.push(ChatMessage::user(step.observation.clone()));
                }
            }
        }
        messages
    }
}

#[async_trait]
impl Agent for FunctionsAgent {
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
        let messages = self.messages(question, history);
        let functions = self.functions();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(anyhow::anyhow!("planning cancelled").into()),
            response = self.llm.chat_completion(&messages, &functions) => response?,
        };
        let content = response.content.unwrap_or_default();

        let calls = response.tool_calls.unwrap_or_default();
        if !calls.is_empty() {
            tracing::debug!("FunctionsAgent requested {} tool calls", calls.len());
            let actions = calls
                .into_iter()
                .map(|call| {
                    let input = tool_input(&call.function.arguments);
                    let log = if content.trim().is_empty() {
                        format!("Invoking {} with {}", call.function.name, input)
                    } else {
                        content.clone()
                    };
                    Action::new(call.function.name, input)
                        .with_log(log)
                        .with_tool_call_id(call.id)
                })
                .collect();
            return Ok(Decision::Actions(actions));
        }

        if content.trim().is_empty() {
            return Err(AgentError::unparsable(content));
        }
        tracing::debug!("FunctionsAgent answered: {}", content);
        let mut outputs = Outputs::new();
        outputs.insert(self.output_key.clone(), content.clone());
        Ok(Decision::Finish(Finish::new(outputs).with_log(content)))
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

/// Describe `tool` as a function taking one string argument.
pub fn function_definition(tool: &dyn Tool) -> FunctionDefinition {
    FunctionDefinition {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                ARG_KEY: { "type": "string", "description": "Input for the tool" }
            },
            "required": [ARG_KEY],
        }),
    }
}

/// Text input for a tool from the model's JSON arguments.
///
/// `{"__arg1": "..."}` yields the string, a bare JSON string yields itself,
/// anything else is passed through as written.
fn tool_input(arguments: &str) -> String {
    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(map)) => match map.get(ARG_KEY) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => arguments.to_string(),
        },
        Ok(Value::String(s)) => s,
        _ => arguments.to_string(),
    }
}
