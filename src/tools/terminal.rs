//! Shell and Python execution tools.
//!
//! No sandboxing happens here: commands run as the current user inside the
//! workspace directory.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;

use super::Tool;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_OUTPUT_CHARS: usize = 10_000;

/// Run a shell command.
pub struct RunCommand {
    workspace: PathBuf,
}

impl RunCommand {
    pub fn new(workspace: PathBuf) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for RunCommand {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Run a shell command (e.g., ls, curl, git status) in the workspace directory. Use for task automation."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to run."
                },
                "timeout_secs": {
                    "type": "integer",
                    "description": "Timeout in seconds (default: 30)"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let command = args["command"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'command' argument"))?;
        let timeout_secs = args["timeout_secs"].as_u64().unwrap_or(DEFAULT_TIMEOUT_SECS);

        tracing::info!("Executing command: {}", command);

        let (shell, shell_arg) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };

        let mut cmd = Command::new(shell);
        cmd.arg(shell_arg).arg(command);
        run_captured(cmd, &self.workspace, timeout_secs).await
    }
}

/// Execute a Python snippet.
pub struct RunPython {
    workspace: PathBuf,
}

impl RunPython {
    pub fn new(workspace: PathBuf) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for RunPython {
    fn name(&self) -> &str {
        "run_python"
    }

    fn description(&self) -> &str {
        "Execute a short Python code snippet and return the output."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Python code to execute."
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let code = args["code"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'code' argument"))?;

        tracing::info!(chars = code.len(), "Executing python snippet");

        let mut cmd = Command::new("python3");
        cmd.arg("-c").arg(code);
        run_captured(cmd, &self.workspace, DEFAULT_TIMEOUT_SECS).await
    }
}

/// Run `cmd` in `workspace` and render its output for the model.
async fn run_captured(
    mut cmd: Command,
    workspace: &std::path::Path,
    timeout_secs: u64,
) -> anyhow::Result<String> {
    let output = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        cmd.current_dir(workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| anyhow::anyhow!("Command timed out after {}s", timeout_secs))?
    .map_err(|e| anyhow::anyhow!("Command failed: {}", e))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let exit_code = output.status.code().unwrap_or(-1);

    Ok(format_output(&stdout, &stderr, exit_code))
}

fn format_output(stdout: &str, stderr: &str, exit_code: i32) -> String {
    let mut result = stdout.to_string();

    if !stderr.is_empty() {
        result.push_str(&format!("\n[stderr]: {}", stderr));
    }
    if exit_code != 0 {
        result.push_str(&format!("\n[exit code]: {}", exit_code));
    }

    let result = result.trim();
    if result.is_empty() {
        return "(no output)".to_string();
    }
    super::truncate_chars(result, MAX_OUTPUT_CHARS, "\n... [output truncated]")
}
