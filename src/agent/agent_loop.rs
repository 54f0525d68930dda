//! Core agent loop implementation.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::llm::{text_in, LlmClient, ModelRequest, ToolCall};
use crate::tools::{ToolInvoker, ToolRegistry};

use super::conversation::Conversation;
use super::error::AgentError;
use super::prompt::build_system_prompt;

/// One chat session: a model client, a fixed tool set and the conversation so far.
///
/// `chat` takes `&mut self`, so turns on one session cannot overlap. Share a
/// session between tasks behind a `tokio::sync::Mutex`.
pub struct Agent {
    llm: Arc<dyn LlmClient>,
    invoker: ToolInvoker,
    system_prompt: String,
    conversation: Conversation,
    max_tool_rounds: usize,
    tool_concurrency: usize,
    max_tokens: u32,
    session_id: Uuid,
}

impl Agent {
    /// Create a new session with an empty conversation.
    pub fn new(config: &Config, llm: Arc<dyn LlmClient>, tools: ToolRegistry) -> Self {
        let workspace_str = config.workspace_path.to_string_lossy().to_string();
        let system_prompt = build_system_prompt(&workspace_str, tools.specs());
        let invoker = ToolInvoker::new(
            Arc::new(tools),
            Duration::from_secs(config.tool_timeout_secs),
        );

        Self {
            llm,
            invoker,
            system_prompt,
            conversation: Conversation::new(),
            max_tool_rounds: config.max_tool_rounds.max(1),
            tool_concurrency: config.tool_concurrency.max(1),
            max_tokens: config.max_tokens,
            session_id: Uuid::new_v4(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// The conversation so far (read-only).
    pub fn history(&self) -> &Conversation {
        &self.conversation
    }

    /// Clear conversation history to start fresh.
    pub fn clear_history(&mut self) {
        tracing::info!(session = %self.session_id, dropped = self.conversation.len(), "History cleared");
        self.conversation.clear();
    }

    /// Send a user message and drive tool rounds until the model answers in plain text.
    pub async fn chat(&mut self, user_text: &str) -> Result<String, AgentError> {
        self.chat_with_cancel(user_text, &CancellationToken::new())
            .await
    }

    /// Like [`Agent::chat`], but stops early once `cancel` fires.
    ///
    /// Rounds already committed stay in the history; the round in flight is
    /// dropped whole.
    pub async fn chat_with_cancel(
        &mut self,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        let span = tracing::info_span!("chat", session = %self.session_id);
        self.run_turn(user_text, cancel).instrument(span).await
    }

    async fn run_turn(
        &mut self,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        self.conversation.push_user(user_text);
        let turn_start = self.conversation.len();

        for round in 1..=self.max_tool_rounds {
            tracing::debug!(round, history_len = self.conversation.len(), "Calling model");

            let request = ModelRequest {
                system: &self.system_prompt,
                history: self.conversation.turns(),
                tools: self.invoker.registry().specs(),
                max_tokens: self.max_tokens,
            };

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(round, "Chat cancelled while waiting for the model");
                    return Err(AgentError::Cancelled);
                }
                result = self.llm.complete(&request) => result?,
            };

            let calls: Vec<ToolCall> = response.tool_calls().into_iter().cloned().collect();
            tracing::info!(
                round,
                model = %self.llm.model_id(),
                stop_reason = response.stop_reason.as_deref().unwrap_or("unknown"),
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                tool_calls = calls.len(),
                "Model responded"
            );

            // No tool calls - this is the final response
            if calls.is_empty() {
                let text = text_in(&response.content);
                self.conversation.record_round(response.content, Vec::new())?;
                return Ok(text);
            }

            let outcomes = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(round, "Chat cancelled during tool execution");
                    return Err(AgentError::Cancelled);
                }
                outcomes = self.invoker.invoke_round(&calls, self.tool_concurrency) => outcomes,
            };

            self.conversation.record_round(response.content, outcomes)?;
        }

        tracing::warn!(rounds = self.max_tool_rounds, "Tool round limit reached");
        Err(AgentError::ToolLoopExceeded {
            rounds: self.max_tool_rounds,
            last_text: self.conversation.last_assistant_text(turn_start),
        })
    }
}
