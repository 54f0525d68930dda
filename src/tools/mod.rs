//! Tool system: the capability trait, the registry and the invoker.
//!
//! Every tool implements [`Tool`]: accept a JSON argument mapping, return text
//! or fail. Tools are registered once at startup under a validated
//! [`ToolName`]; the registry hands out their [`ToolSpec`]s for the model and
//! resolves names back to handlers. [`ToolInvoker`] wraps resolution and
//! execution so that nothing a tool does can escape as an error.

mod calendar;
mod files;
mod http;
mod invoker;
mod terminal;
mod web;

pub use calendar::CalendarEvents;
pub use files::{ListFiles, ReadFile};
pub use http::ApiRequest;
pub use invoker::ToolInvoker;
pub use terminal::{RunCommand, RunPython};
pub use web::{FetchPage, SearchWeb};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;

/// A tool the model can call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to request this tool
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    /// JSON Schema for the argument mapping
    fn parameters_schema(&self) -> Value;

    /// Run the tool. Arguments arrive exactly as the model sent them.
    async fn execute(&self, args: Value) -> anyhow::Result<String>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid tool name {0:?}: expected 1-64 characters of [A-Za-z0-9_-]")]
    InvalidName(String),

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),
}

/// A tool name that the model API will accept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ToolName(String);

impl ToolName {
    pub fn new(name: impl Into<String>) -> Result<Self, ToolError> {
        let name = name.into();
        let valid = (1..=64).contains(&name.len())
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(name))
        } else {
            Err(ToolError::InvalidName(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the model is told about a tool. Fixed at registration.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: ToolName,
    pub description: String,
    pub input_schema: Value,
}

/// Normalized result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub ok: bool,
    /// Tool output, or a readable error description when `ok` is false
    pub payload: String,
}

impl ToolOutcome {
    pub fn success(payload: impl Into<String>) -> Self {
        Self {
            ok: true,
            payload: payload.into(),
        }
    }

    pub fn failure(payload: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload: payload.into(),
        }
    }
}

/// Registered tools, kept in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
    handlers: HashMap<ToolName, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Its name must be valid and not yet taken.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), ToolError> {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = ToolName::new(tool.name())?;
        if self.handlers.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name.to_string()));
        }

        self.specs.push(ToolSpec {
            name: name.clone(),
            description: tool.description().to_string(),
            input_schema: tool.parameters_schema(),
        });
        self.handlers.insert(name, tool);
        Ok(())
    }

    /// Look up the handler for a requested name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        ToolName::new(name)
            .ok()
            .and_then(|key| self.handlers.get(&key).cloned())
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    /// Tool specs in registration order, as sent to the model.
    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Registry with every built-in tool the configuration allows.
pub fn builtin_registry(config: &Config) -> Result<ToolRegistry, ToolError> {
    let workspace = config.workspace_path.clone();
    let mut registry = ToolRegistry::new();

    registry.register(SearchWeb)?;
    registry.register(FetchPage)?;
    registry.register(ReadFile::new(workspace.clone()))?;
    registry.register(ListFiles::new(workspace.clone()))?;
    registry.register(RunCommand::new(workspace.clone()))?;
    registry.register(RunPython::new(workspace))?;
    registry.register(ApiRequest)?;

    if let Some(token) = &config.calendar_token {
        registry.register(CalendarEvents::new(token.clone()))?;
    } else {
        tracing::debug!("GOOGLE_CALENDAR_TOKEN not set; calendar tool disabled");
    }

    Ok(registry)
}

/// Cut `s` to at most `max_chars` characters, appending `marker` when cut.
pub(crate) fn truncate_chars(s: &str, max_chars: usize, marker: &str) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &s[..byte_idx], marker),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Named(&'static str);

    #[async_trait]
    impl Tool for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test tool"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, _args: Value) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn tool_names_are_validated() {
        assert!(ToolName::new("read_file").is_ok());
        assert!(ToolName::new("get-events2").is_ok());
        assert_eq!(
            ToolName::new("read file"),
            Err(ToolError::InvalidName("read file".to_string()))
        );
        assert!(ToolName::new("").is_err());
        assert!(ToolName::new("x".repeat(65)).is_err());
    }

    #[tokio::test]
    async fn resolve_returns_registered_handler() {
        let mut registry = ToolRegistry::new();
        registry.register(Named("alpha")).unwrap();

        let tool = registry.resolve("alpha").unwrap();
        assert_eq!(tool.execute(json!({})).await.unwrap(), "alpha");
    }

    #[test]
    fn resolve_misses_are_unknown_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Named("alpha")).unwrap();

        assert_eq!(
            registry.resolve("beta").err(),
            Some(ToolError::UnknownTool("beta".to_string()))
        );
        assert_eq!(
            registry.resolve("not a name").err(),
            Some(ToolError::UnknownTool("not a name".to_string()))
        );
    }

    #[test]
    fn duplicate_and_invalid_registrations_are_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Named("alpha")).unwrap();

        assert_eq!(
            registry.register(Named("alpha")),
            Err(ToolError::DuplicateTool("alpha".to_string()))
        );
        assert!(matches!(
            registry.register(Named("bad name")),
            Err(ToolError::InvalidName(_))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn specs_keep_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(Named(name)).unwrap();
        }
        let names: Vec<&str> = registry.specs().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
        assert_eq!(registry.specs()[0].description, "test tool");
    }

    #[test]
    fn builtin_registry_gates_calendar_on_token() {
        let mut config = Config::new(
            "key".to_string(),
            "model".to_string(),
            std::env::temp_dir(),
        );
        let registry = builtin_registry(&config).unwrap();
        assert!(registry.resolve("get_calendar_events").is_err());
        assert_eq!(registry.len(), 7);

        config.calendar_token = Some("token".to_string());
        let registry = builtin_registry(&config).unwrap();
        assert!(registry.resolve("get_calendar_events").is_ok());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2, "…"), "hé…");
        assert_eq!(truncate_chars("short", 10, "…"), "short");
    }
}
