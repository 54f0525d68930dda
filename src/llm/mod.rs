//! Model client abstraction
//!
//! The loop talks to the language model through [`LlmClient`]: one request,
//! one assistant turn back. [`AnthropicClient`] is the production backend;
//! [`ScriptedClient`] replays canned turns for tests.

mod anthropic;
mod error;
mod scripted;
mod types;

pub use anthropic::AnthropicClient;
pub use error::{LlmError, LlmErrorKind};
pub use scripted::{RecordedRequest, ScriptedClient};
pub use types::*;

use async_trait::async_trait;

/// Common interface for model backends
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send the conversation and tool schema, get one assistant turn back.
    async fn complete(&self, request: &ModelRequest<'_>) -> Result<ModelResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}
