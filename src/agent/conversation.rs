//! Conversation state: the ordered turn log of one session.
//!
//! The log only grows, except for an explicit [`Conversation::clear`]. A tool
//! round is committed in one step (the assistant turn followed by one result
//! per tool call, in call order), so the log never holds a half-finished round.

use thiserror::Error;

use crate::llm::{text_in, tool_calls_in, ContentBlock, Turn};
use crate::tools::ToolOutcome;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("round has {calls} tool calls but {results} results")]
    ResultCountMismatch { calls: usize, results: usize },

    #[error("tool result at position {index} references unknown call {call_id}")]
    UnpairedResult { index: usize, call_id: String },
}

#[derive(Debug, Default, Clone)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub(crate) fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::user(text));
    }

    /// Append an assistant turn and one tool_result turn per tool call.
    ///
    /// `outcomes[i]` answers the i-th tool call in `content`. Nothing is
    /// appended when the counts differ. Returns the number of turns added.
    pub(crate) fn record_round(
        &mut self,
        content: Vec<ContentBlock>,
        outcomes: Vec<ToolOutcome>,
    ) -> Result<usize, ConversationError> {
        let call_ids: Vec<String> = tool_calls_in(&content)
            .into_iter()
            .map(|call| call.id.clone())
            .collect();

        if call_ids.len() != outcomes.len() {
            return Err(ConversationError::ResultCountMismatch {
                calls: call_ids.len(),
                results: outcomes.len(),
            });
        }

        let added = 1 + call_ids.len();
        self.turns.push(Turn::Assistant { content });
        for (call_id, ToolOutcome { ok, payload }) in call_ids.into_iter().zip(outcomes) {
            self.turns.push(Turn::ToolResult {
                call_id,
                content: payload,
                is_error: !ok,
            });
        }
        Ok(added)
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Text of the latest assistant turn at or after index `since` that has any.
    pub fn last_assistant_text(&self, since: usize) -> Option<String> {
        let tail = self.turns.get(since..).unwrap_or_default();
        tail.iter().rev().find_map(|turn| match turn {
            Turn::Assistant { content } => Some(text_in(content)).filter(|t| !t.trim().is_empty()),
            _ => None,
        })
    }

    /// Verify that every tool_result turn answers a distinct call of the
    /// assistant turn immediately before its result run.
    pub fn check_pairing(&self) -> Result<(), ConversationError> {
        let mut open_calls: Vec<&str> = Vec::new();

        for (index, turn) in self.turns.iter().enumerate() {
            match turn {
                Turn::Assistant { .. } => {
                    open_calls = turn.tool_calls().into_iter().map(|c| c.id.as_str()).collect();
                }
                Turn::ToolResult { call_id, .. } => {
                    match open_calls.iter().position(|id| *id == call_id.as_str()) {
                        Some(pos) => {
                            open_calls.remove(pos);
                        }
                        None => {
                            return Err(ConversationError::UnpairedResult {
                                index,
                                call_id: call_id.clone(),
                            })
                        }
                    }
                }
                Turn::User { .. } => open_calls.clear(),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_call_round() -> Vec<ContentBlock> {
        vec![
            ContentBlock::text("Checking both."),
            ContentBlock::tool_call("call_a", "read_file", json!({"file_path": "a"})),
            ContentBlock::tool_call("call_b", "read_file", json!({"file_path": "b"})),
        ]
    }

    #[test]
    fn round_results_follow_call_order() {
        let mut convo = Conversation::new();
        convo.push_user("read a and b");
        let added = convo
            .record_round(
                two_call_round(),
                vec![ToolOutcome::success("A"), ToolOutcome::failure("no b")],
            )
            .unwrap();

        assert_eq!(added, 3);
        assert_eq!(convo.len(), 4);
        assert_eq!(
            convo.turns()[2],
            Turn::ToolResult {
                call_id: "call_a".to_string(),
                content: "A".to_string(),
                is_error: false
            }
        );
        assert_eq!(
            convo.turns()[3],
            Turn::ToolResult {
                call_id: "call_b".to_string(),
                content: "no b".to_string(),
                is_error: true
            }
        );
        assert!(convo.check_pairing().is_ok());
    }

    #[test]
    fn mismatched_round_appends_nothing() {
        let mut convo = Conversation::new();
        convo.push_user("read a and b");
        let err = convo
            .record_round(two_call_round(), vec![ToolOutcome::success("A")])
            .unwrap_err();

        assert_eq!(err, ConversationError::ResultCountMismatch { calls: 2, results: 1 });
        assert_eq!(convo.len(), 1);
    }

    #[test]
    fn final_round_has_no_results() {
        let mut convo = Conversation::new();
        convo.push_user("hi");
        assert_eq!(convo.record_round(vec![ContentBlock::text("hello")], vec![]).unwrap(), 1);
        assert_eq!(convo.last_assistant_text(0).as_deref(), Some("hello"));
        assert_eq!(convo.last_assistant_text(2), None);
    }

    #[test]
    fn check_pairing_flags_foreign_results() {
        let mut convo = Conversation::new();
        convo.push_user("go");
        convo.turns.push(Turn::ToolResult {
            call_id: "ghost".to_string(),
            content: String::new(),
            is_error: false,
        });
        assert_eq!(
            convo.check_pairing(),
            Err(ConversationError::UnpairedResult {
                index: 1,
                call_id: "ghost".to_string()
            })
        );
    }

    #[test]
    fn clear_empties_the_log() {
        let mut convo = Conversation::new();
        convo.push_user("one");
        convo.record_round(vec![ContentBlock::text("two")], vec![]).unwrap();
        convo.clear();
        assert!(convo.is_empty());
        assert_eq!(convo.last_assistant_text(0), None);
    }
}
