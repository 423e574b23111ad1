//! System prompt construction.
//!
//! The prompt teaches the model one of two JSON vocabularies (see
//! [`ReasoningStyle`]) and lists the registered tools as a numbered
//! catalogue. It is rebuilt whenever the tool set changes.

use std::fmt::Write;

use agentflow_core::agent::{AgentConfig, ReasoningStyle};
use agentflow_core::tool::ToolDescriptor;

const STRUCTURED_FORMAT: &str = r#"## Workflow
Solve the task with a thought, action, observation cycle:

1. **Thought**: decide what to do next
2. **Action**: call exactly one tool
3. **Observation**: read the tool result that comes back
4. Repeat until you have enough information
5. **Final answer**: reply with the answer

## Response format
To call a tool, reply with exactly this JSON:
```json
{
    "thought": "your reasoning",
    "action": "tool name",
    "action_input": {"parameter": "value"}
}
```

When you are ready to answer:
```json
{
    "thought": "I now have enough information",
    "final_answer": "your final answer"
}
```

## Rules
1. Call one tool at a time
2. Base your answer on the actual tool results
3. If a tool reports an error, fix the parameters or try another tool"#;

const PLAIN_FORMAT: &str = r#"To use a tool, reply with exactly this JSON and nothing else:
```json
{"tool": "tool name", "parameters": {"parameter": "value"}}
```

Otherwise answer the user directly in plain text."#;

/// Render the numbered tool catalogue.
pub fn tool_catalogue(tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return "No tools available.".to_string();
    }

    let mut out = String::new();
    for (index, tool) in tools.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{}. **{}**", index + 1, tool.name);
        let _ = writeln!(out, "   {}", tool.description);
        if !tool.parameters.is_empty() {
            out.push_str("   Parameters:\n");
            for (name, spec) in tool.parameters.iter() {
                let requirement = if spec.required { "required" } else { "optional" };
                let _ = writeln!(
                    out,
                    "   - {name} ({}, {requirement}): {}",
                    spec.kind.as_str(),
                    spec.description
                );
            }
        }
    }
    out.trim_end().to_string()
}

/// Build the full system prompt for `config` and the given tools.
pub fn build_system_prompt(config: &AgentConfig, tools: &[ToolDescriptor]) -> String {
    let mut prompt = format!("You are {}, a {}.\n\n", config.name, config.role);
    match config.reasoning {
        ReasoningStyle::Structured => {
            prompt.push_str("You can use tools to complete tasks.\n\n## Available tools\n");
            prompt.push_str(&tool_catalogue(tools));
            prompt.push_str("\n\n");
            prompt.push_str(STRUCTURED_FORMAT);
        }
        ReasoningStyle::Plain => {
            prompt.push_str("You can use the following tools:\n\n");
            prompt.push_str(&tool_catalogue(tools));
            prompt.push_str("\n\n");
            prompt.push_str(PLAIN_FORMAT);
        }
    }

    if let Some(instructions) = config.instructions.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str("\n\n## Instructions\n");
        prompt.push_str(instructions);
    }
    prompt
}
