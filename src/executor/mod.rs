//! Executor module - owns the plan / act / observe loop.
//!
//! Each iteration:
//! 1. Ask the agent to plan against the history so far
//! 2. If it finishes, validate and return its outputs
//! 3. Otherwise dispatch each action to its tool and record the observation
//! 4. Stop when the agent finishes or a limit is hit
//!
//! Tool failures and unknown tools become observations so the agent can
//! correct itself. Everything mutable lives inside a single run, so one
//! executor can serve concurrent runs.
//!
//! Agents and tools receive a child of the caller's cancellation token. It
//! fires when the caller's token does, and also once the run returns.

mod error;
mod events;
mod parser_error;
mod state;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::agent::{Agent, AgentError};
use crate::config::{EarlyStopping, ExecutorConfig};
use crate::schema::{Action, Decision, Finish, Inputs, Outputs, Step, DEFAULT_OUTPUT_KEY};
use crate::tools::{Tool, ToolRegistry};

pub use error::ExecutorError;
pub use events::{EventKind, ExecutionEvent};
pub use parser_error::ParserErrorHandler;
pub use state::{RunState, StopReason};

/// Output value used by [`EarlyStopping::Force`].
pub const FORCED_STOP_MESSAGE: &str = "Agent stopped due to iteration limit or time limit.";

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub outputs: Outputs,
    pub steps: Vec<Step>,
    /// `Finished`, or a stopped state when early stopping supplied the outputs
    pub state: RunState,
    pub iterations: usize,
}

/// Drives an [`Agent`] against a fixed set of tools.
pub struct Executor {
    agent: Arc<dyn Agent>,
    tools: ToolRegistry,
    config: ExecutorConfig,
    parser_error_handler: Option<ParserErrorHandler>,
    extra_return_fields: Outputs,
    events: Option<mpsc::UnboundedSender<ExecutionEvent>>,
}

impl Executor {
    /// Executor with default configuration over the agent's own tools.
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self::builder(agent).build()
    }

    pub fn builder(agent: Arc<dyn Agent>) -> ExecutorBuilder {
        ExecutorBuilder::new(agent)
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run the loop to completion and return the outputs.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        inputs: Inputs,
    ) -> Result<Outputs, ExecutorError> {
        self.run_with_steps(cancel, inputs)
            .await
            .map(|outcome| outcome.outputs)
    }

    /// Run the loop and also return the history and final state.
    pub async fn run_with_steps(
        &self,
        cancel: &CancellationToken,
        inputs: Inputs,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        let run = Run {
            executor: self,
            cancel: cancel.child_token(),
            run_id: Uuid::new_v4(),
            started: Instant::now(),
        };
        let span = tracing::info_span!("agent_run", run_id = %run.run_id);
        let result = run.execute(inputs).instrument(span).await;
        // release work that agents or tools detached from the run
        run.cancel.cancel();
        if let Err(e) = &result {
            if !e.is_not_finished() {
                run.emit(EventKind::Error {
                    message: e.to_string(),
                });
            }
        }
        result
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("tools", &self.tools)
            .field("config", &self.config)
            .field("parser_error_handler", &self.parser_error_handler)
            .field("extra_return_fields", &self.extra_return_fields)
            .finish()
    }
}

/// Collects optional settings before the executor is frozen.
pub struct ExecutorBuilder {
    agent: Arc<dyn Agent>,
    tools: ToolRegistry,
    config: ExecutorConfig,
    parser_error_handler: Option<ParserErrorHandler>,
    extra_return_fields: Outputs,
    events: Option<mpsc::UnboundedSender<ExecutionEvent>>,
}

impl ExecutorBuilder {
    fn new(agent: Arc<dyn Agent>) -> Self {
        let tools = agent.tools().into_iter().collect();
        Self {
            agent,
            tools,
            config: ExecutorConfig::default(),
            parser_error_handler: None,
            extra_return_fields: Outputs::new(),
            events: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// 0 means unlimited.
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn max_execution_time(mut self, limit: Duration) -> Self {
        self.config.max_execution_time = Some(limit);
        self
    }

    pub fn parser_error_handler(mut self, handler: ParserErrorHandler) -> Self {
        self.parser_error_handler = Some(handler);
        self
    }

    pub fn early_stopping(mut self, strategy: EarlyStopping) -> Self {
        self.config.early_stopping = Some(strategy);
        self
    }

    /// Static output added to every finish. Wins over a finish value with the same key.
    pub fn extra_return_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_return_fields.insert(key.into(), value.into());
        self
    }

    pub fn extra_return_fields<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.extra_return_fields
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn tool_errors_fatal(mut self, fatal: bool) -> Self {
        self.config.tool_errors_fatal = fatal;
        self
    }

    pub fn concurrent_tool_calls(mut self, concurrent: bool) -> Self {
        self.config.concurrent_tool_calls = concurrent;
        self
    }

    /// Register a tool in addition to the agent's own.
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.register(tool);
        self
    }

    /// Receive an [`ExecutionEvent`] for everything that happens in a run.
    pub fn event_sink(mut self, tx: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn build(self) -> Executor {
        Executor {
            agent: self.agent,
            tools: self.tools,
            config: self.config,
            parser_error_handler: self.parser_error_handler,
            extra_return_fields: self.extra_return_fields,
            events: self.events,
        }
    }
}

/// State of a single run.
struct Run<'a> {
    executor: &'a Executor,
    cancel: CancellationToken,
    run_id: Uuid,
    started: Instant,
}

impl Run<'_> {
    async fn execute(&self, inputs: Inputs) -> Result<ExecutionOutcome, ExecutorError> {
        let missing = missing_keys(&self.executor.agent.input_keys(), &inputs);
        if !missing.is_empty() {
            return Err(ExecutorError::InvalidInput { missing });
        }

        tracing::info!(
            "Starting run with {} tools, max_iterations={}",
            self.executor.tools.len(),
            self.executor.config.max_iterations
        );

        let mut steps: Vec<Step> = Vec::new();
        let mut iterations = 0usize;

        loop {
            iterations += 1;
            tracing::debug!("Executor iteration {}", iterations);

            let decision = self.plan(&steps, &inputs).await?;
            match decision {
                Err(err) if err.is_parse_failure() => {
                    let Some(handler) = &self.executor.parser_error_handler else {
                        tracing::warn!("Agent output could not be parsed, aborting");
                        return Err(ExecutorError::ParseFailure(err));
                    };
                    let observation = handler.observation(&err);
                    tracing::warn!("Agent output could not be parsed, observing: {}", observation);
                    let action = Action::default().with_log(err.raw_output().unwrap_or_default());
                    self.emit(EventKind::ParserErrorRecovered {
                        observation: observation.clone(),
                    });
                    steps.push(Step::new(action, observation));
                }
                Err(err) => return Err(err.into()),
                Ok(Decision::Finish(finish)) => {
                    return self.finish(finish, steps, iterations, RunState::Finished);
                }
                Ok(Decision::Actions(actions)) => {
                    if actions.is_empty() {
                        return Err(ExecutorError::Agent(anyhow::anyhow!(
                            "agent returned no actions"
                        )));
                    }
                    for action in &actions {
                        self.emit(EventKind::AgentAction {
                            iteration: iterations,
                            action: action.clone(),
                        });
                    }
                    let new_steps = self.dispatch(actions).await?;
                    steps.extend(new_steps);
                }
            }

            if let Some(reason) = self.stop_reason(iterations) {
                tracing::info!("Stopping run: {}", reason);
                self.emit(EventKind::Stopped { reason });
                return self.stop(reason, steps, &inputs, iterations).await;
            }
        }
    }

    /// Plan, unless the caller cancels first.
    async fn plan(
        &self,
        steps: &[Step],
        inputs: &Inputs,
    ) -> Result<Result<Decision, AgentError>, ExecutorError> {
        self.guarded(self.executor.agent.plan(&self.cancel, steps, inputs))
            .await
    }

    /// Await `fut`, giving up with `Cancelled` as soon as the token fires.
    async fn guarded<F: Future>(&self, fut: F) -> Result<F::Output, ExecutorError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ExecutorError::Cancelled),
            out = fut => Ok(out),
        }
    }

    /// Run the actions of one iteration; steps come back in action order.
    ///
    /// In concurrent mode the first fatal tool error drops the sibling calls.
    async fn dispatch(&self, actions: Vec<Action>) -> Result<Vec<Step>, ExecutorError> {
        if self.executor.config.concurrent_tool_calls && actions.len() > 1 {
            return self
                .guarded(try_join_all(actions.into_iter().map(|a| self.call_tool(a))))
                .await?;
        }

        let mut steps = Vec::with_capacity(actions.len());
        for action in actions {
            steps.push(self.guarded(self.call_tool(action)).await??);
        }
        Ok(steps)
    }

    async fn call_tool(&self, action: Action) -> Result<Step, ExecutorError> {
        let Some(tool) = self.executor.tools.get(&action.tool) else {
            tracing::warn!("Agent requested unknown tool: {}", action.tool);
            self.emit(EventKind::ToolNotFound {
                tool: action.tool.clone(),
            });
            let observation = format!("{} is not a valid tool, try another one", action.tool);
            return Ok(Step::new(action, observation));
        };

        tracing::debug!("Calling tool {} with input: {}", action.tool, action.tool_input);
        self.emit(EventKind::ToolCall {
            tool: action.tool.clone(),
            input: action.tool_input.clone(),
        });

        let (observation, is_error) = match tool.call(&self.cancel, &action.tool_input).await {
            Ok(output) => (output, false),
            Err(e) if self.executor.config.tool_errors_fatal => {
                return Err(ExecutorError::ToolExecution {
                    tool: action.tool,
                    message: e.to_string(),
                });
            }
            Err(e) => {
                tracing::warn!("Tool {} failed: {}", action.tool, e);
                (format!("Error: {}", e), true)
            }
        };

        self.emit(EventKind::ToolResult {
            tool: action.tool.clone(),
            observation: truncate_for_log(&observation, 1000),
            is_error,
        });
        Ok(Step::new(action, observation))
    }

    fn stop_reason(&self, iterations: usize) -> Option<StopReason> {
        let config = &self.executor.config;
        if config.max_iterations > 0 && iterations >= config.max_iterations {
            return Some(StopReason::MaxIterations(config.max_iterations));
        }
        match config.max_execution_time {
            Some(limit) if self.started.elapsed() >= limit => {
                Some(StopReason::MaxExecutionTime(limit))
            }
            _ => None,
        }
    }

    async fn stop(
        &self,
        reason: StopReason,
        steps: Vec<Step>,
        inputs: &Inputs,
        iterations: usize,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        match self.executor.config.early_stopping {
            None => Err(ExecutorError::NotFinished { reason, steps }),
            Some(EarlyStopping::Force) => Ok(self.forced(reason, steps, iterations)),
            Some(EarlyStopping::Generate) => {
                let decision = self.plan(&steps, inputs).await?;
                match decision {
                    Ok(Decision::Finish(finish)) => {
                        self.finish(finish, steps, iterations, reason.state())
                    }
                    Ok(Decision::Actions(_)) => {
                        tracing::debug!("Final planning call did not finish, forcing output");
                        Ok(self.forced(reason, steps, iterations))
                    }
                    Err(e) => {
                        tracing::warn!("Final planning call failed: {}, forcing output", e);
                        Ok(self.forced(reason, steps, iterations))
                    }
                }
            }
        }
    }

    fn forced(&self, reason: StopReason, steps: Vec<Step>, iterations: usize) -> ExecutionOutcome {
        let mut keys = self.executor.agent.output_keys();
        if keys.is_empty() {
            keys.push(DEFAULT_OUTPUT_KEY.to_string());
        }
        let mut outputs: Outputs = keys
            .into_iter()
            .map(|k| (k, FORCED_STOP_MESSAGE.to_string()))
            .collect();
        outputs.extend(self.executor.extra_return_fields.clone());
        self.emit(EventKind::Finished {
            outputs: outputs.clone(),
        });
        ExecutionOutcome {
            outputs,
            steps,
            state: reason.state(),
            iterations,
        }
    }

    fn finish(
        &self,
        finish: Finish,
        steps: Vec<Step>,
        iterations: usize,
        state: RunState,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        let missing = missing_keys(&self.executor.agent.output_keys(), &finish.outputs);
        if !missing.is_empty() {
            return Err(ExecutorError::InvalidOutput { missing });
        }

        let mut outputs = finish.outputs;
        // configured fields win over the agent's
        outputs.extend(self.executor.extra_return_fields.clone());

        tracing::info!(
            "Run finished after {} iterations and {} steps",
            iterations,
            steps.len()
        );
        self.emit(EventKind::Finished {
            outputs: outputs.clone(),
        });
        Ok(ExecutionOutcome {
            outputs,
            steps,
            state,
            iterations,
        })
    }

    fn emit(&self, kind: EventKind) {
        if let Some(tx) = &self.executor.events {
            let _ = tx.send(ExecutionEvent {
                run_id: self.run_id,
                kind,
            });
        }
    }
}

fn missing_keys(required: &[String], present: &Outputs) -> Vec<String> {
    required
        .iter()
        .filter(|k| !present.contains_key(k.as_str()))
        .cloned()
        .collect()
}

/// Truncate a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut cut = max_len;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... [truncated]", &s[..cut])
}
