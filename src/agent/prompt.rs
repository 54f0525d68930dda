//! System prompt template for the assistant.

use crate::tools::ToolSpec;

/// Build the system prompt, listing the registered tools.
pub fn build_system_prompt(workspace_path: &str, tools: &[ToolSpec]) -> String {
    let tool_descriptions = if tools.is_empty() {
        "(no tools are available in this session)".to_string()
    } else {
        tools
            .iter()
            .map(|t| format!("- **{}**: {}", t.name, t.description))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are b-agent, a helpful AI assistant with access to tools. Relative file paths and shell commands run in: {workspace_path}

## Your Tools

{tool_descriptions}

## Guidelines

1. **Use tools when the request needs them** - external data, files, or actions. For general knowledge questions, answer directly without tools.

2. **Recover from tool errors** - a failed tool returns an error message instead of output. Read it, then retry differently, ask the user, or continue without that data.

3. **Explain what you did** - summarize the results clearly once you have them.

4. **Be concise but thorough.**"#,
        workspace_path = workspace_path,
        tool_descriptions = tool_descriptions
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolName;
    use serde_json::json;

    #[test]
    fn prompt_lists_each_tool() {
        let specs = vec![
            ToolSpec {
                name: ToolName::new("read_file").unwrap(),
                description: "Read a file.".to_string(),
                input_schema: json!({"type": "object"}),
            },
            ToolSpec {
                name: ToolName::new("search_web").unwrap(),
                description: "Search the web.".to_string(),
                input_schema: json!({"type": "object"}),
            },
        ];
        let prompt = build_system_prompt("/work", &specs);
        assert!(prompt.contains("run in: /work"));
        assert!(prompt.contains("- **read_file**: Read a file.\n- **search_web**: Search the web."));
    }

    #[test]
    fn prompt_without_tools_says_so() {
        assert!(build_system_prompt(".", &[]).contains("no tools are available"));
    }
}
