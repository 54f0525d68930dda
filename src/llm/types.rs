//! Conversation and request/response types shared by the loop and model clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolSpec;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier, unique within the response that emitted it
    pub id: String,

    /// Name of the requested tool
    pub name: String,

    /// Argument mapping, passed to the handler as-is
    pub input: Value,
}

/// One block of assistant output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolCall(ToolCall),
}

impl ContentBlock {
    pub fn text(s: impl Into<String>) -> Self {
        ContentBlock::Text { text: s.into() }
    }

    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        ContentBlock::ToolCall(ToolCall {
            id: id.into(),
            name: name.into(),
            input,
        })
    }
}

/// One unit of conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    User {
        text: String,
    },
    Assistant {
        content: Vec<ContentBlock>,
    },
    ToolResult {
        call_id: String,
        content: String,
        is_error: bool,
    },
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Turn::User { text: text.into() }
    }

    /// Tool calls carried by an assistant turn, in emission order.
    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        match self {
            Turn::Assistant { content } => tool_calls_in(content),
            _ => Vec::new(),
        }
    }
}

/// Tool calls in a block sequence, in emission order.
pub fn tool_calls_in(content: &[ContentBlock]) -> Vec<&ToolCall> {
    content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolCall(call) => Some(call),
            ContentBlock::Text { .. } => None,
        })
        .collect()
}

/// Text blocks of a block sequence joined with newlines.
pub fn text_in(content: &[ContentBlock]) -> String {
    content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::ToolCall(_) => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Everything a model client needs for one exchange.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub system: &'a str,
    pub history: &'a [Turn],
    pub tools: &'a [ToolSpec],
    pub max_tokens: u32,
}

/// Model reply: a single assistant turn plus bookkeeping the loop only logs.
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

impl ModelResponse {
    /// Plain-text reply with no tool calls.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            stop_reason: Some("end_turn".to_string()),
            usage: Usage::default(),
        }
    }

    /// Reply built from arbitrary blocks; stop reason follows the blocks.
    pub fn from_blocks(content: Vec<ContentBlock>) -> Self {
        let stop_reason = if tool_calls_in(&content).is_empty() {
            "end_turn"
        } else {
            "tool_use"
        };
        Self {
            content,
            stop_reason: Some(stop_reason.to_string()),
            usage: Usage::default(),
        }
    }

    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        tool_calls_in(&self.content)
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_joins_only_text_blocks() {
        let content = vec![
            ContentBlock::text("first"),
            ContentBlock::tool_call("c1", "search_web", json!({"query": "rust"})),
            ContentBlock::text("second"),
        ];
        assert_eq!(text_in(&content), "first\nsecond");
        assert_eq!(tool_calls_in(&content).len(), 1);
    }

    #[test]
    fn from_blocks_sets_stop_reason() {
        let plain = ModelResponse::from_blocks(vec![ContentBlock::text("done")]);
        assert_eq!(plain.stop_reason.as_deref(), Some("end_turn"));
        assert!(plain.tool_calls().is_empty());

        let calling = ModelResponse::from_blocks(vec![ContentBlock::tool_call(
            "c1",
            "list_files",
            json!({}),
        )]);
        assert_eq!(calling.stop_reason.as_deref(), Some("tool_use"));
        assert_eq!(calling.tool_calls()[0].name, "list_files");
    }

    #[test]
    fn turn_serializes_with_role_tag() {
        let turn = Turn::ToolResult {
            call_id: "c1".to_string(),
            content: "ok".to_string(),
            is_error: false,
        };
        let value = serde_json::to_value(&turn).unwrap();
        assert_eq!(value["role"], "tool_result");
        assert_eq!(value["call_id"], "c1");
    }
}
