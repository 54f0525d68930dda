//! # b-agent
//!
//! A conversational assistant that lets a language model call local tools.
//!
//! This library provides:
//! - A tool registry with name-validated tools and their JSON input schemas
//! - A tool invoker that turns every failure into text the model can read
//! - An orchestrator that runs bounded tool rounds until the model answers
//! - An Anthropic Messages API client plus a scripted client for tests
//!
//! ## Architecture
//!
//! Each chat turn runs the "tools in a loop" pattern:
//! 1. Record the user message
//! 2. Send the conversation and tool schema to the model
//! 3. Run any requested tools (concurrently, results kept in call order)
//! 4. Feed results back and repeat until the reply has no tool calls
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use b_agent::{agent::Agent, llm::AnthropicClient, tools::builtin_registry, Config};
//!
//! let config = Config::from_env()?;
//! let llm = Arc::new(AnthropicClient::from_config(&config)?);
//! let mut agent = Agent::new(&config, llm, builtin_registry(&config)?);
//! let reply = agent.chat("What's in my workspace?").await?;
//! ```

pub mod agent;
pub mod config;
pub mod llm;
pub mod tools;

pub use config::Config;
