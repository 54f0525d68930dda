//! Configuration management for b-agent.
//!
//! Configuration is read from environment variables (a `.env` file in the
//! working directory is loaded first by the binary):
//! - `ANTHROPIC_API_KEY` - Required. Your Anthropic API key.
//! - `DEFAULT_MODEL` - Optional. Model identifier. Defaults to `claude-sonnet-4-5-20250929`.
//! - `ANTHROPIC_BASE_URL` - Optional. API base URL. Defaults to `https://api.anthropic.com`.
//! - `MAX_TOKENS` - Optional. Token budget per model response. Defaults to `4096`.
//! - `MAX_TOOL_ROUNDS` - Optional. Tool rounds allowed per chat turn. Defaults to `10`.
//! - `TOOL_TIMEOUT_SECS` - Optional. Per-invocation tool timeout. Defaults to `60`.
//! - `TOOL_CONCURRENCY` - Optional. Tool calls run in parallel within a round. Defaults to `4`.
//! - `MODEL_MAX_RETRIES` - Optional. Retries for transient model API failures. Defaults to `2`.
//! - `WORKSPACE_PATH` - Optional. Base directory for file tools and commands. Defaults to current directory.
//! - `GOOGLE_CALENDAR_TOKEN` - Optional. OAuth access token; enables the calendar tool.

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_API_BASE_URL: &str = "https://api.anthropic.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Anthropic API key
    pub api_key: String,

    /// Model identifier sent with every request
    pub default_model: String,

    /// API base URL (no trailing `/v1/messages`)
    pub api_base_url: String,

    /// Token budget per model response
    pub max_tokens: u32,

    /// Maximum tool rounds in one chat turn
    pub max_tool_rounds: usize,

    /// Per-invocation tool timeout in seconds
    pub tool_timeout_secs: u64,

    /// Tool calls run concurrently within one round
    pub tool_concurrency: usize,

    /// Retries for retryable model API failures
    pub model_max_retries: u32,

    /// Workspace directory for file operations and commands
    pub workspace_path: PathBuf,

    /// Google Calendar OAuth access token
    pub calendar_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `ANTHROPIC_API_KEY` is not set,
    /// and `ConfigError::InvalidValue` if a numeric setting does not parse or is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("ANTHROPIC_API_KEY".to_string()))?;

        let default_model =
            std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let api_base_url = std::env::var("ANTHROPIC_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());

        let workspace_path = std::env::var("WORKSPACE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let config = Self {
            api_key,
            default_model,
            api_base_url,
            max_tokens: parse_env("MAX_TOKENS", 4096)?,
            max_tool_rounds: parse_env("MAX_TOOL_ROUNDS", 10)?,
            tool_timeout_secs: parse_env("TOOL_TIMEOUT_SECS", 60)?,
            tool_concurrency: parse_env("TOOL_CONCURRENCY", 4)?,
            model_max_retries: parse_env("MODEL_MAX_RETRIES", 2)?,
            workspace_path,
            calendar_token: std::env::var("GOOGLE_CALENDAR_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, default_model: String, workspace_path: PathBuf) -> Self {
        Self {
            api_key,
            default_model,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            max_tokens: 4096,
            max_tool_rounds: 10,
            tool_timeout_secs: 60,
            tool_concurrency: 4,
            model_max_retries: 2,
            workspace_path,
            calendar_token: None,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("MAX_TOKENS", self.max_tokens as u64),
            ("MAX_TOOL_ROUNDS", self.max_tool_rounds as u64),
            ("TOOL_TIMEOUT_SECS", self.tool_timeout_secs),
            ("TOOL_CONCURRENCY", self.tool_concurrency as u64),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue(
                    name.to_string(),
                    "must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), format!("{}", e)))
}
