//! # Tool Loop
//!
//! An agent execution loop: a pluggable policy decides, tools act, and the
//! results are fed back until the policy finishes or a limit is hit.
//!
//! This library provides:
//! - The [`executor::Executor`] that owns the loop, its stopping conditions and recovery policy
//! - The [`agent::Agent`] and [`tools::Tool`] contracts it drives
//! - A ReAct-style text agent, a function-calling chat agent and a few built-in tools
//!
//! ## Architecture
//!
//! The executor follows the "tools in a loop" pattern:
//! 1. Validate the run inputs against the agent's declared keys
//! 2. Ask the agent to plan against the history of completed steps
//! 3. Dispatch each proposed action to its tool, record the observation
//! 4. Repeat until the agent finishes or a stopping condition fires
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use tool_loop::{agent::ReactAgent, executor::{Executor, ParserErrorHandler}};
//!
//! let agent = Arc::new(ReactAgent::new(llm, tools));
//! let executor = Executor::builder(agent)
//!     .max_iterations(5)
//!     .parser_error_handler(ParserErrorHandler::default_text())
//!     .build();
//! let outputs = executor.run(&CancellationToken::new(), inputs).await?;
//! ```

pub mod agent;
pub mod config;
pub mod executor;
pub mod llm;
pub mod schema;
pub mod tools;

pub use config::ExecutorConfig;
pub use executor::{Executor, ExecutorError};
