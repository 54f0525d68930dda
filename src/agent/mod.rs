//! Agent module - the conversation orchestrator.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Append the user's message to the conversation
//! 2. Call the model with the full history and the tool schema
//! 3. If the model requests tools, run them and feed the results back
//! 4. Repeat until the model answers in plain text or the round cap is reached

mod agent_loop;
mod conversation;
mod error;
mod prompt;

pub use agent_loop::Agent;
pub use conversation::{Conversation, ConversationError};
pub use error::AgentError;
pub use prompt::build_system_prompt;
