//! Tool Loop - replay entry point
//!
//! Runs an agent over the built-in tools, with model replies taken from a
//! recorded script instead of a live model. A script with chat `responses`
//! drives the function-calling agent; one with text `replies` drives the
//! ReAct agent.
//!
//! Usage: `tool-loop-replay <script.json> <question>`

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tool_loop::agent::{Agent, FunctionsAgent, ReactAgent};
use tool_loop::executor::{Executor, ParserErrorHandler};
use tool_loop::llm::{ReplayScript, ScriptedChatClient, ScriptedClient};
use tool_loop::schema::Inputs;
use tool_loop::tools::ToolRegistry;
use tool_loop::ExecutorConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tool_loop=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(script), Some(question)) = (args.next(), args.next()) else {
        anyhow::bail!("usage: tool-loop-replay <script.json> <question>");
    };

    let config = ExecutorConfig::from_env()?;
    info!("Loaded configuration: {:?}", config);

    let workspace = std::env::var("TOOL_LOOP_WORKSPACE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let script = ReplayScript::from_file(&PathBuf::from(script))?;
    let tools = ToolRegistry::with_defaults(workspace).tools();
    let agent: Arc<dyn Agent> = if script.responses.is_empty() {
        info!("Replaying {} text replies", script.replies.len());
        Arc::new(ReactAgent::new(
            Arc::new(ScriptedClient::new(script.replies)),
            tools,
        ))
    } else {
        info!("Replaying {} chat responses", script.responses.len());
        Arc::new(FunctionsAgent::new(
            Arc::new(ScriptedChatClient::new(script.responses)),
            tools,
        ))
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let executor = Executor::builder(agent)
        .config(config)
        .parser_error_handler(ParserErrorHandler::default_text())
        .event_sink(tx)
        .build();

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => eprintln!("{}", line),
                Err(e) => tracing::warn!("Failed to serialize event: {}", e),
            }
        }
    });

    let mut inputs = Inputs::new();
    inputs.insert("input".to_string(), question);

    let result = executor.run_with_steps(&cancel, inputs).await;
    drop(executor);
    let _ = printer.await;

    let outcome = result?;
    info!(
        "Run ended in state {:?} after {} iterations",
        outcome.state, outcome.iterations
    );
    println!("{}", serde_json::to_string_pretty(&outcome.outputs)?);

    Ok(())
}
