//! Executor configuration.
//!
//! Configuration can be set via environment variables:
//! - `AGENT_MAX_ITERATIONS` - Optional. Maximum loop iterations, `0` for unlimited. Defaults to `5`.
//! - `AGENT_MAX_EXECUTION_SECS` - Optional. Wall-clock limit per run in seconds. Unlimited when unset.
//! - `AGENT_TOOL_ERRORS_FATAL` - Optional. Abort the run when a tool fails. Defaults to `false`.
//! - `AGENT_CONCURRENT_TOOLS` - Optional. Run the actions of one iteration concurrently. Defaults to `false`.
//! - `AGENT_EARLY_STOPPING` - Optional. `force` or `generate`. When unset, a stopped run is an error.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_MAX_ITERATIONS: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// What to return when a run hits a stopping condition before finishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyStopping {
    /// Return a fixed "agent stopped" message for every output key.
    Force,
    /// Ask the agent for one last decision; fall back to `Force` if it does not finish.
    Generate,
}

impl FromStr for EarlyStopping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "force" => Ok(EarlyStopping::Force),
            "generate" => Ok(EarlyStopping::Generate),
            other => Err(format!("expected 'force' or 'generate', got: {}", other)),
        }
    }
}

/// Loop limits and failure policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Maximum iterations per run; 0 means unlimited
    pub max_iterations: usize,

    /// Maximum wall-clock time per run
    pub max_execution_time: Option<Duration>,

    /// Abort the run on a tool failure instead of observing it
    pub tool_errors_fatal: bool,

    /// Dispatch the actions of one iteration concurrently
    pub concurrent_tool_calls: bool,

    pub early_stopping: Option<EarlyStopping>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_execution_time: None,
            tool_errors_fatal: false,
            concurrent_tool_calls: false,
            early_stopping: None,
        }
    }
}

impl ExecutorConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_iterations = lookup("AGENT_MAX_ITERATIONS")
            .map(|v| {
                v.trim().parse::<usize>().map_err(|e| {
                    ConfigError::InvalidValue("AGENT_MAX_ITERATIONS".to_string(), format!("{}", e))
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAX_ITERATIONS);

        let max_execution_time = lookup("AGENT_MAX_EXECUTION_SECS")
            .map(|v| {
                v.trim().parse::<u64>().map(Duration::from_secs).map_err(|e| {
                    ConfigError::InvalidValue(
                        "AGENT_MAX_EXECUTION_SECS".to_string(),
                        format!("{}", e),
                    )
                })
            })
            .transpose()?;

        let tool_errors_fatal = lookup_bool(&lookup, "AGENT_TOOL_ERRORS_FATAL")?.unwrap_or(false);
        let concurrent_tool_calls = lookup_bool(&lookup, "AGENT_CONCURRENT_TOOLS")?.unwrap_or(false);

        let early_stopping = lookup("AGENT_EARLY_STOPPING")
            .map(|v| {
                v.parse::<EarlyStopping>()
                    .map_err(|e| ConfigError::InvalidValue("AGENT_EARLY_STOPPING".to_string(), e))
            })
            .transpose()?;

        Ok(Self {
            max_iterations,
            max_execution_time,
            tool_errors_fatal,
            concurrent_tool_calls,
            early_stopping,
        })
    }
}

fn lookup_bool<F>(lookup: &F, name: &str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| parse_bool(&v).map_err(|e| ConfigError::InvalidValue(name.to_string(), e)))
        .transpose()
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected boolean-like value, got: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = ExecutorConfig::from_lookup(lookup_from(&[])).expect("config");
        assert_eq!(config, ExecutorConfig::default());
        assert_eq!(config.max_iterations, 5);
    }

    #[test]
    fn reads_every_variable() {
        let config = ExecutorConfig::from_lookup(lookup_from(&[
            ("AGENT_MAX_ITERATIONS", "0"),
            ("AGENT_MAX_EXECUTION_SECS", "30"),
            ("AGENT_TOOL_ERRORS_FATAL", "yes"),
            ("AGENT_CONCURRENT_TOOLS", "on"),
            ("AGENT_EARLY_STOPPING", "Generate"),
        ]))
        .expect("config");

        assert_eq!(config.max_iterations, 0);
        assert_eq!(config.max_execution_time, Some(Duration::from_secs(30)));
        assert!(config.tool_errors_fatal);
        assert!(config.concurrent_tool_calls);
        assert_eq!(config.early_stopping, Some(EarlyStopping::Generate));
    }

    #[test]
    fn rejects_malformed_values() {
        let err = ExecutorConfig::from_lookup(lookup_from(&[("AGENT_MAX_ITERATIONS", "many")]))
            .expect_err("should fail");
        assert!(matches!(err, ConfigError::InvalidValue(ref name, _) if name == "AGENT_MAX_ITERATIONS"));

        let err = ExecutorConfig::from_lookup(lookup_from(&[("AGENT_TOOL_ERRORS_FATAL", "maybe")]))
            .expect_err("should fail");
        assert_eq!(
            err,
            ConfigError::InvalidValue(
                "AGENT_TOOL_ERRORS_FATAL".to_string(),
                "expected boolean-like value, got: maybe".to_string()
            )
        );

        assert!(ExecutorConfig::from_lookup(lookup_from(&[("AGENT_EARLY_STOPPING", "never")])).is_err());
    }
}
