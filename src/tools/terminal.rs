//! Shell command tool.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::Tool;

const MAX_OUTPUT_LEN: usize = 10_000;

/// Run the input as a shell command inside a fixed working directory.
pub struct RunCommand {
    workspace: PathBuf,
    timeout: Duration,
}

impl RunCommand {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Tool for RunCommand {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Execute a shell command in the working directory. The input is the command line. Returns the exit code, stdout and stderr."
    }

    async fn call(&self, cancel: &CancellationToken, input: &str) -> anyhow::Result<String> {
        let command = input.trim();
        if command.is_empty() {
            return Err(anyhow::anyhow!("Missing command"));
        }

        tracing::info!("Executing command: {}", command);

        let (shell, shell_arg) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };

        // kill_on_drop so a cancelled run does not leave the child behind
        let child = Command::new(shell)
            .arg(shell_arg)
            .arg(command)
            .current_dir(&self.workspace)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(anyhow::anyhow!("Command cancelled")),
            result = tokio::time::timeout(self.timeout, child) => result
                .map_err(|_| anyhow::anyhow!("Command timed out after {} seconds", self.timeout.as_secs()))?
                .map_err(|e| anyhow::anyhow!("Failed to execute command: {}", e))?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);

        let mut result = format!("Exit code: {}\n", exit_code);

        if !stdout.is_empty() {
            result.push_str("\n--- stdout ---\n");
            result.push_str(&stdout);
        }

        if !stderr.is_empty() {
            result.push_str("\n--- stderr ---\n");
            result.push_str(&stderr);
        }

        if result.len() > MAX_OUTPUT_LEN {
            let mut cut = MAX_OUTPUT_LEN;
            while !result.is_char_boundary(cut) {
                cut -= 1;
            }
            result.truncate(cut);
            result.push_str("\n... [output truncated]");
        }

        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tool = RunCommand::new(dir.path());

        let out = tool
            .call(&CancellationToken::new(), "echo hello; exit 3")
            .await
            .expect("run");
        assert!(out.starts_with("Exit code: 3\n"));
        assert!(out.contains("--- stdout ---\nhello"));
    }

    #[tokio::test]
    async fn runs_inside_workspace() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("marker.txt"), "x").expect("write marker");
        let tool = RunCommand::new(dir.path());

        let out = tool.call(&CancellationToken::new(), "ls").await.expect("run");
        assert!(out.contains("marker.txt"));
    }

    #[tokio::test]
    async fn empty_command_is_an_error() {
        let tool = RunCommand::new(".");
        assert!(tool.call(&CancellationToken::new(), "   ").await.is_err());
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let tool = RunCommand::new(".").with_timeout(Duration::from_millis(100));
        let err = tool
            .call(&CancellationToken::new(), "sleep 5")
            .await
            .expect_err("should time out");
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn cancellation_stops_the_command() {
        let tool = RunCommand::new(".");
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        let err = tool.call(&cancel, "sleep 30").await.expect_err("cancelled");
        assert_eq!(err.to_string(), "Command cancelled");
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
