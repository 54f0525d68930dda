//! Anthropic Messages API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::types::{ContentBlock, ModelRequest, ModelResponse, ToolCall, Turn, Usage};
use super::{LlmClient, LlmError};
use crate::config::Config;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic client: one HTTP exchange per `complete`, retried on transient failures.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    max_retries: u32,
}

impl AnthropicClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
        max_retries: u32,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: format!("{}/v1/messages", base_url.trim_end_matches('/')),
            max_retries,
        })
    }

    /// Build a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        Self::new(
            config.api_key.clone(),
            config.default_model.clone(),
            &config.api_base_url,
            config.model_max_retries,
        )
    }

    fn translate_request(&self, request: &ModelRequest<'_>) -> AnthropicRequest {
        let tools: Vec<AnthropicTool> = request
            .tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.to_string(),
                description: t.description.clone(),
                input_schema: t.input_schema.clone(),
            })
            .collect();

        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            system: request.system.to_string(),
            messages: translate_history(request.history),
            tools: if tools.is_empty() { None } else { Some(tools) },
        }
    }

    async fn send_once(&self, body: &AnthropicRequest) -> Result<ModelResponse, LlmError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {}", e))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {}", e))
                } else {
                    LlmError::unknown(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let err = classify_error(status, &body);
            return Err(match retry_after {
                Some(after) => err.with_retry_after(after),
                None => err,
            });
        }

        let parsed: AnthropicResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {} - body: {}", e, body))
        })?;

        Ok(normalize_response(parsed))
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: &ModelRequest<'_>) -> Result<ModelResponse, LlmError> {
        let body = self.translate_request(request);
        let mut attempt = 0;

        loop {
            match self.send_once(&body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = e
                        .retry_after
                        .unwrap_or_else(|| Duration::from_millis(500 * 2u64.pow(attempt)));
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = %delay.as_millis(),
                        error = %e,
                        "Retrying model request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Fold the turn log into API messages.
///
/// User text and tool results share the `user` role, so consecutive turns of
/// the same role are merged into one message. Tool results therefore land in
/// the message right after the assistant turn that requested them.
fn translate_history(history: &[Turn]) -> Vec<AnthropicMessage> {
    let mut messages: Vec<AnthropicMessage> = Vec::new();

    for turn in history {
        let (role, blocks) = match turn {
            Turn::User { text } => ("user", vec![AnthropicContentBlock::Text { text: text.clone() }]),
            Turn::ToolResult {
                call_id,
                content,
                is_error,
            } => (
                "user",
                vec![AnthropicContentBlock::ToolResult {
                    tool_use_id: call_id.clone(),
                    content: content.clone(),
                    is_error: *is_error,
                }],
            ),
            Turn::Assistant { content } => (
                "assistant",
                content
                    .iter()
                    .map(|block| match block {
                        ContentBlock::Text { text } => AnthropicContentBlock::Text { text: text.clone() },
                        ContentBlock::ToolCall(call) => AnthropicContentBlock::ToolUse {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            input: call.input.clone(),
                        },
                    })
                    .collect(),
            ),
        };

        // The API rejects empty assistant messages
        if blocks.is_empty() {
            continue;
        }

        match messages.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => messages.push(AnthropicMessage {
                role,
                content: blocks,
            }),
        }
    }

    messages
}

fn normalize_response(resp: AnthropicResponse) -> ModelResponse {
    let content = resp
        .content
        .into_iter()
        .filter_map(|block| match block {
            AnthropicResponseBlock::Text { text } => Some(ContentBlock::Text { text }),
            AnthropicResponseBlock::ToolUse { id, name, input } => {
                Some(ContentBlock::ToolCall(ToolCall { id, name, input }))
            }
            AnthropicResponseBlock::Other => None,
        })
        .collect();

    ModelResponse {
        content,
        stop_reason: resp.stop_reason,
        usage: Usage {
            input_tokens: resp.usage.input_tokens,
            output_tokens: resp.usage.output_tokens,
        },
    }
}

fn classify_error(status: reqwest::StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string());

    match status.as_u16() {
        401 | 403 => LlmError::auth(format!("Authentication failed: {}", message)),
        429 => LlmError::rate_limit(format!("Rate limited: {}", message)),
        400 | 404 | 413 | 422 => LlmError::invalid_request(format!("Invalid request: {}", message)),
        // 529 is Anthropic's "overloaded"
        500..=599 => LlmError::server_error(format!("Server error: {}", message)),
        _ => LlmError::unknown(format!("HTTP {}: {}", status, message)),
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

/// Seconds from a `retry-after` header. Negative, NaN and infinite values are ignored.
fn parse_retry_after(value: &str) -> Option<Duration> {
    let secs = value.trim().parse::<f64>().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmErrorKind;
    use serde_json::json;

    fn client() -> AnthropicClient {
        AnthropicClient::new("test-key", "claude-test", "https://example.invalid/", 0).unwrap()
    }

    #[test]
    fn retry_after_rejects_unusable_values() {
        assert_eq!(parse_retry_after("2"), Some(Duration::from_secs(2)));
        assert_eq!(parse_retry_after(" 0.5 "), Some(Duration::from_millis(500)));
        assert_eq!(parse_retry_after("-1"), None);
        assert_eq!(parse_retry_after("NaN"), None);
        assert_eq!(parse_retry_after("inf"), None);
        assert_eq!(parse_retry_after("Wed, 21 Oct 2026 07:28:00 GMT"), None);
    }

    #[tokio::test]
    async fn negative_retry_after_surfaces_as_rate_limit() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            // Drain the whole request so closing the socket doesn't reset it
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            let body = r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#;
            let reply = format!(
                "HTTP/1.1 429 Too Many Requests\r\nretry-after: -1\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
        });

        let client =
            AnthropicClient::new("test-key", "claude-test", &format!("http://{}", addr), 0).unwrap();
        let request = ModelRequest {
            system: "",
            history: &[Turn::user("hi")],
            tools: &[],
            max_tokens: 16,
        };

        let err = client.complete(&request).await.unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::RateLimit);
        assert_eq!(err.retry_after, None);
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        assert_eq!(client().endpoint, "https://example.invalid/v1/messages");
    }

    #[test]
    fn tool_results_fold_into_one_user_message() {
        let history = vec![
            Turn::user("check two things"),
            Turn::Assistant {
                content: vec![
                    ContentBlock::text("On it."),
                    ContentBlock::tool_call("a", "list_files", json!({})),
                    ContentBlock::tool_call("b", "read_file", json!({"file_path": "x"})),
                ],
            },
            Turn::ToolResult {
                call_id: "a".to_string(),
                content: "[FILE] x".to_string(),
                is_error: false,
            },
            Turn::ToolResult {
                call_id: "b".to_string(),
                content: "boom".to_string(),
                is_error: true,
            },
            Turn::user("thanks"),
        ];

        let messages = serde_json::to_value(translate_history(&history)).unwrap();
        let messages = messages.as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["content"][1]["type"], "tool_use");
        assert_eq!(messages[2]["role"], "user");
        let folded = messages[2]["content"].as_array().unwrap();
        assert_eq!(folded.len(), 3);
        assert_eq!(folded[0]["tool_use_id"], "a");
        assert_eq!(folded[1]["tool_use_id"], "b");
        assert_eq!(folded[1]["is_error"], true);
        assert_eq!(folded[2]["type"], "text");
    }

    #[test]
    fn empty_assistant_turns_are_skipped() {
        let history = vec![
            Turn::user("hi"),
            Turn::Assistant { content: vec![] },
            Turn::user("hello?"),
        ];
        let messages = translate_history(&history);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content.len(), 2);
    }

    #[test]
    fn request_omits_tools_when_registry_is_empty() {
        let history = vec![Turn::user("hi")];
        let request = ModelRequest {
            system: "be brief",
            history: &history,
            tools: &[],
            max_tokens: 128,
        };
        let body = serde_json::to_value(client().translate_request(&request)).unwrap();
        assert!(body.get("tools").is_none());
        assert_eq!(body["system"], "be brief");
        assert_eq!(body["max_tokens"], 128);
        assert_eq!(body["model"], "claude-test");
    }

    #[test]
    fn response_keeps_block_order_and_drops_unknown_blocks() {
        let raw = json!({
            "content": [
                {"type": "thinking", "thinking": "hmm", "signature": "s"},
                {"type": "text", "text": "Let me look."},
                {"type": "tool_use", "id": "toolu_1", "name": "search_web", "input": {"query": "tokio"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 12, "output_tokens": 7}
        });
        let parsed: AnthropicResponse = serde_json::from_value(raw).unwrap();
        let response = normalize_response(parsed);

        assert_eq!(response.content.len(), 2);
        assert_eq!(response.tool_calls()[0].id, "toolu_1");
        assert_eq!(response.stop_reason.as_deref(), Some("tool_use"));
        assert_eq!(response.usage.input_tokens, 12);
    }

    #[test]
    fn errors_are_classified_by_status() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err = classify_error(reqwest::StatusCode::from_u16(529).unwrap(), body);
        assert_eq!(err.kind, LlmErrorKind::ServerError);
        assert!(err.message.contains("Overloaded"));

        let err = classify_error(reqwest::StatusCode::UNAUTHORIZED, "nope");
        assert_eq!(err.kind, LlmErrorKind::Auth);
        assert!(!err.is_retryable());

        let err = classify_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "{}");
        assert!(err.is_retryable());
    }
}
