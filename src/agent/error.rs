//! Errors surfaced by a chat turn.

use thiserror::Error;

use super::conversation::ConversationError;
use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The model kept requesting tools past the round cap.
    #[error("{}", exceeded_message(.rounds, .last_text))]
    ToolLoopExceeded {
        rounds: usize,
        /// Text from the most recent assistant turn that had any
        last_text: Option<String>,
    },

    /// The model client failed; passed through unchanged.
    #[error(transparent)]
    Model(#[from] LlmError),

    #[error("Chat cancelled")]
    Cancelled,

    #[error("Conversation invariant violated: {0}")]
    Conversation(#[from] ConversationError),
}

fn exceeded_message(rounds: &usize, last_text: &Option<String>) -> String {
    match last_text {
        Some(text) => format!(
            "Stopped after {} tool rounds without a final answer. Last reply: {}",
            rounds, text
        ),
        None => format!(
            "Stopped after {} tool rounds without a final answer.",
            rounds
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exceeded_message_prefers_last_text() {
        let with_text = AgentError::ToolLoopExceeded {
            rounds: 3,
            last_text: Some("Still digging.".to_string()),
        };
        assert_eq!(
            with_text.to_string(),
            "Stopped after 3 tool rounds without a final answer. Last reply: Still digging."
        );

        let bare = AgentError::ToolLoopExceeded {
            rounds: 3,
            last_text: None,
        };
        assert_eq!(
            bare.to_string(),
            "Stopped after 3 tool rounds without a final answer."
        );
    }

    #[test]
    fn model_errors_display_unchanged() {
        let err = AgentError::from(LlmError::network("Connection failed: refused"));
        assert_eq!(err.to_string(), "Connection failed: refused");
    }
}
