//! Response parser: turns raw model output into a [`Directive`].
//!
//! Parsing is best effort and cannot fail. Three JSON shapes are
//! recognized, fenced in a ```` ```json ```` block or bare:
//!
//! | shape | result |
//! |---|---|
//! | `{"final_answer": "..."}` | [`Directive::FinalAnswer`] |
//! | `{"action": "name", "action_input": {...}, "thought": "..."}` | [`Directive::ToolCall`] |
//! | `{"tool": "name", "parameters": {...}}` | [`Directive::ToolCall`] |
//!
//! `final_answer` wins over `action` when an object carries both. The
//! fenced block is tried first, then the whole text; anything that matches
//! none of the shapes is [`Directive::Plain`].

use agentflow_core::tool::{ToolArguments, ToolInvocation};
use serde_json::{Map, Value};

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

/// What the model asked the loop to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Terminal answer.
    FinalAnswer { answer: String, thought: Option<String> },
    /// Invoke a tool and feed its result back.
    ToolCall {
        invocation: ToolInvocation,
        thought: Option<String>,
    },
    /// No recognized shape; the raw text is the response.
    Plain,
}

impl Directive {
    pub fn thought(&self) -> Option<&str> {
        match self {
            Directive::FinalAnswer { thought, .. } | Directive::ToolCall { thought, .. } => thought.as_deref(),
            Directive::Plain => None,
        }
    }
}

/// Parse one model response.
pub fn parse_directive(raw: &str) -> Directive {
    let trimmed = raw.trim();
    let candidates = fenced_block(trimmed).into_iter().chain(std::iter::once(trimmed));

    for candidate in candidates {
        let Ok(Value::Object(object)) = serde_json::from_str::<Value>(candidate) else {
            continue;
        };
        if let Some(directive) = from_object(&object) {
            return directive;
        }
    }

    Directive::Plain
}

/// Body of the first ```` ```json ```` fence, if it is closed.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find(FENCE_OPEN)? + FENCE_OPEN.len();
    let rest = &text[start..];
    let end = rest.find(FENCE_CLOSE)?;
    Some(rest[..end].trim())
}

fn from_object(object: &Map<String, Value>) -> Option<Directive> {
    let thought = object.get("thought").and_then(Value::as_str).map(str::to_string);

    if let Some(answer) = object.get("final_answer") {
        let answer = match answer {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        return Some(Directive::FinalAnswer { answer, thought });
    }

    if let (Some(Value::String(action)), Some(input)) = (object.get("action"), object.get("action_input")) {
        if let Some(arguments) = arguments_of(input) {
            return Some(Directive::ToolCall {
                invocation: ToolInvocation::new(action.as_str(), arguments),
                thought,
            });
        }
    }

    if let Some(Value::String(tool)) = object.get("tool") {
        let arguments = match object.get("parameters") {
            None => Some(ToolArguments::new()),
            Some(params) => arguments_of(params),
        };
        if let Some(arguments) = arguments {
            return Some(Directive::ToolCall {
                invocation: ToolInvocation::new(tool.as_str(), arguments),
                thought,
            });
        }
    }

    None
}

fn arguments_of(value: &Value) -> Option<ToolArguments> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::Null => Some(ToolArguments::new()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_call(directive: Directive) -> ToolInvocation {
        match directive {
            Directive::ToolCall { invocation, .. } => invocation,
            other => panic!("expected tool call, got {other:?}"),
        }
    }

    #[test]
    fn final_answer_wins_over_action() {
        let raw = r#"{"final_answer": "done", "action": "calculator", "action_input": {"expression": "1+1"}}"#;
        assert_eq!(
            parse_directive(raw),
            Directive::FinalAnswer {
                answer: "done".into(),
                thought: None
            }
        );

        let fenced = format!("```json\n{raw}\n```");
        assert!(matches!(parse_directive(&fenced), Directive::FinalAnswer { .. }));
    }

    #[test]
    fn fenced_and_bare_legacy_calls_are_identical() {
        let bare = r#"{"tool":"x","parameters":{"a":1}}"#;
        let fenced = format!("Let me call it.\n```json\n{bare}\n```\nthanks");

        let a = tool_call(parse_directive(bare));
        let b = tool_call(parse_directive(&fenced));
        assert_eq!(a, b);
        assert_eq!(a.tool_name, "x");
        assert_eq!(a.arguments["a"], json!(1));
    }

    #[test]
    fn structured_action_with_thought() {
        let raw = r#"```json
{"thought": "I should compute this", "action": "calculator", "action_input": {"expression": "2+2"}}
```"#;
        let directive = parse_directive(raw);
        assert_eq!(directive.thought(), Some("I should compute this"));
        let invocation = tool_call(directive);
        assert_eq!(invocation.tool_name, "calculator");
        assert_eq!(invocation.arguments["expression"], "2+2");
    }

    #[test]
    fn non_string_final_answer_is_rendered_as_json() {
        match parse_directive(r#"{"final_answer": 4}"#) {
            Directive::FinalAnswer { answer, .. } => assert_eq!(answer, "4"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn null_or_missing_inputs_mean_no_arguments() {
        let invocation = tool_call(parse_directive(r#"{"action": "now", "action_input": null}"#));
        assert!(invocation.arguments.is_empty());

        let invocation = tool_call(parse_directive(r#"{"tool": "now"}"#));
        assert!(invocation.arguments.is_empty());
    }

    #[test]
    fn action_without_input_is_plain() {
        assert_eq!(parse_directive(r#"{"action": "calculator"}"#), Directive::Plain);
        assert_eq!(
            parse_directive(r#"{"action": "calculator", "action_input": "2+2"}"#),
            Directive::Plain
        );
    }

    #[test]
    fn malformed_fence_falls_back_to_whole_text() {
        let raw = "```json\n{not json}\n```";
        assert_eq!(parse_directive(raw), Directive::Plain);

        // An unclosed fence is ignored; the bare text is still tried.
        let raw = r#"{"final_answer": "ok"} ```json"#;
        assert_eq!(parse_directive(raw), Directive::Plain);
    }

    #[test]
    fn fenced_non_matching_object_tries_whole_text() {
        let raw = "```json\n{\"note\": 1}\n```";
        assert_eq!(parse_directive(raw), Directive::Plain);
    }

    #[test]
    fn plain_text_and_other_json() {
        assert_eq!(parse_directive("The answer is 4."), Directive::Plain);
        assert_eq!(parse_directive("[1, 2, 3]"), Directive::Plain);
        assert_eq!(parse_directive(r#"{"answer": 4}"#), Directive::Plain);
        assert_eq!(parse_directive(""), Directive::Plain);
    }
}
