//! Tool invoker
//!
//! Resolves a requested tool, runs it under a timeout and folds every way it
//! can go wrong (unknown name, `Err`, timeout, panic) into a failed
//! [`ToolOutcome`]. Each invocation emits one structured audit line.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{stream, FutureExt, StreamExt};
use serde_json::Value;

use super::{ToolOutcome, ToolRegistry};
use crate::llm::ToolCall;

/// Runs tools by name on behalf of the agent loop.
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolInvoker {
    pub fn new(registry: Arc<ToolRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Invoke one tool. Never fails: problems come back as `ok: false`.
    pub async fn invoke(&self, name: &str, args: Value) -> ToolOutcome {
        let start = Instant::now();
        let preview = args_preview(&args);

        let (outcome, class) = match self.registry.resolve(name) {
            Err(e) => (ToolOutcome::failure(e.to_string()), "unknown_tool"),
            Ok(tool) => {
                let run = AssertUnwindSafe(tool.execute(args)).catch_unwind();
                match tokio::time::timeout(self.timeout, run).await {
                    Ok(Ok(Ok(output))) => (ToolOutcome::success(output), "ok"),
                    Ok(Ok(Err(e))) => (
                        ToolOutcome::failure(format!("Tool error ({}): {:#}", name, e)),
                        "error",
                    ),
                    Ok(Err(panic)) => (
                        ToolOutcome::failure(format!(
                            "Tool error ({}): tool panicked: {}",
                            name,
                            panic_message(panic.as_ref())
                        )),
                        "panic",
                    ),
                    Err(_) => (
                        ToolOutcome::failure(format!(
                            "Tool error ({}): timed out after {:?}",
                            name,
                            self.timeout
                        )),
                        "timeout",
                    ),
                }
            }
        };

        tracing::info!(
            tool = %name,
            ok = outcome.ok,
            outcome = class,
            duration_ms = start.elapsed().as_millis() as u64,
            args_preview = %preview,
            "tool invocation"
        );

        outcome
    }

    /// Invoke every call of one round, at most `concurrency` at a time.
    ///
    /// Outcomes come back in the order of `calls`, whatever order the tools
    /// finish in.
    pub async fn invoke_round(&self, calls: &[ToolCall], concurrency: usize) -> Vec<ToolOutcome> {
        stream::iter(calls)
            .map(|call| self.invoke(&call.name, call.input.clone()))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn args_preview(args: &Value) -> String {
    super::truncate_chars(&args.to_string(), 200, "...")
}
