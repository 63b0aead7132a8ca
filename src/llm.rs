//! Language model seams used by model-backed agents.
//!
//! Transport to real providers lives outside this crate. Implement
//! [`LlmClient`] for a text completion model and hand it to
//! [`crate::agent::ReactAgent`], or [`ChatClient`] for a model with native
//! tool calls and hand it to [`crate::agent::FunctionsAgent`].

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Text-in, text-out completion.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete `prompt`, cutting generation at any of `stop`.
    async fn complete(&self, prompt: &str, stop: &[String]) -> anyhow::Result<String>;
}

/// Who sent a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One message of a chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Calls requested by an assistant message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// The call a tool message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn new(role: Role, content: Option<String>) -> Self {
        Self {
            role,
            content,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, Some(content.into()))
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, Some(content.into()))
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Some(content.into()))
    }

    /// Assistant turn requesting tool calls.
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(calls),
            ..Self::new(Role::Assistant, None)
        }
    }

    /// Result of the call with id `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, Some(content.into()))
        }
    }
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as produced by the model
    pub arguments: String,
}

/// A function offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments
    pub parameters: serde_json::Value,
}

/// One model turn: text, tool calls, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// Chat completion with native tool calling.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        functions: &[FunctionDefinition],
    ) -> anyhow::Result<ChatResponse>;
}

/// A recorded session: the model replies, in order.
///
/// `replies` feeds a text completion model, `responses` a chat model.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayScript {
    #[serde(default)]
    pub replies: Vec<String>,

    #[serde(default)]
    pub responses: Vec<ChatResponse>,
}

impl ReplayScript {
    /// Load a script from a JSON file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        serde_json::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Invalid replay script {}: {}", path.display(), e))
    }
}

/// Client that plays back canned replies, one per call.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
        }
    }

    /// Load the `replies` of a [`ReplayScript`] file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(ReplayScript::from_file(path)?.replies))
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, _prompt: &str, _stop: &[String]) -> anyhow::Result<String> {
        let mut replies = self
            .replies
            .lock()
            .map_err(|_| anyhow::anyhow!("replay script lock poisoned"))?;
        replies
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("replay script exhausted"))
    }
}

/// Chat client that plays back canned responses and records every request.
#[derive(Debug, Default)]
pub struct ScriptedChatClient {
    responses: Mutex<VecDeque<ChatResponse>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChatClient {
    pub fn new(responses: impl IntoIterator<Item = ChatResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Transcripts sent so far, one per call.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        _functions: &[FunctionDefinition],
    ) -> anyhow::Result<ChatResponse> {
        self.requests
            .lock()
            .map_err(|_| anyhow::anyhow!("replay script lock poisoned"))?
            .push(messages.to_vec());
        let mut responses = self
            .responses
            .lock()
            .map_err(|_| anyhow::anyhow!("replay script lock poisoned"))?;
        responses
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("replay script exhausted"))
    }
}
