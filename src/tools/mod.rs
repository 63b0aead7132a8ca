//! Tool contract and the registry the executor dispatches through.
//!
//! Built-in tools:
//! - `calculator` - evaluate an arithmetic expression
//! - `run_command` - run a shell command in a working directory
//! - `web_search` - search the web via DuckDuckGo

mod calculator;
mod terminal;
mod web;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use calculator::{evaluate, Calculator, ParseError};
pub use terminal::RunCommand;
pub use web::WebSearch;

/// A named capability the agent can invoke with a text input.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable name, unique within a registry.
    fn name(&self) -> &str;

    /// Human-readable description, shown to the agent.
    fn description(&self) -> &str;

    /// Run the tool. Failures are returned, never panicked.
    ///
    /// `cancel` fires when the run is cancelled or over. Tools that hand work
    /// to spawned tasks or threads should pass it along.
    async fn call(&self, cancel: &CancellationToken, input: &str) -> anyhow::Result<String>;
}

/// Name and description of a registered tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Immutable-after-build mapping from tool name to tool.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Registration order, for stable listing
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in tools, with `run_command` rooted at `workspace`.
    pub fn with_defaults(workspace: impl Into<PathBuf>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(Calculator));
        registry.register(Arc::new(RunCommand::new(workspace)));
        registry.register(Arc::new(WebSearch::new()));
        registry
    }

    /// Add a tool. A later tool with the same name replaces the earlier one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!("Tool {} registered twice, keeping the last one", name);
        } else {
            self.order.push(name);
        }
    }

    /// Look up a tool by exact (case-sensitive) name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Names and descriptions in registration order.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    /// The registered tools, in registration order.
    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .cloned()
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl FromIterator<Arc<dyn Tool>> for ToolRegistry {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Tool>>>(iter: I) -> Self {
        let mut registry = Self::new();
        for tool in iter {
            registry.register(tool);
        }
        registry
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.order)
            .finish()
    }
}
