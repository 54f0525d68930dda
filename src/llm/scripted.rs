//! Scripted model client (for tests and offline runs, no API needed)
//!
//! Plays back a queue of canned replies in order and records every request it
//! receives, so a test can assert what the loop sent and how often.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::types::{ModelRequest, ModelResponse, Turn};
use super::{LlmClient, LlmError};

/// What the client saw on one `complete` call.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub history: Vec<Turn>,
    pub tool_names: Vec<String>,
}

/// Replays queued responses; once the queue drains, repeats `fallback` if set.
#[derive(Default)]
pub struct ScriptedClient {
    queue: Mutex<VecDeque<Result<ModelResponse, LlmError>>>,
    fallback: Option<ModelResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedClient {
    pub fn new(responses: impl IntoIterator<Item = ModelResponse>) -> Self {
        Self {
            queue: Mutex::new(responses.into_iter().map(Ok).collect()),
            ..Self::default()
        }
    }

    /// Returns `response` on every call.
    pub fn repeating(response: ModelResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::default()
        }
    }

    /// Queue a failure at the back of the script.
    pub fn then_fail(self, error: LlmError) -> Self {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(Err(error));
        }
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: &ModelRequest<'_>) -> Result<ModelResponse, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                history: request.history.to_vec(),
                tool_names: request.tools.iter().map(|t| t.name.to_string()).collect(),
            });
        }

        let next = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        match (next, &self.fallback) {
            (Some(result), _) => result,
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(LlmError::invalid_request("scripted client has no responses left")),
        }
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}
