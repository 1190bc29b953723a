//! Fallback tool-call parsing
//!
//! Some models put the tool call in the message content instead of the
//! `tool_calls` array. The standard shape is
//! `{"name": "tool_name", "arguments": {...}}`, optionally inside a
//! fenced code block.

use serde::Deserialize;

use crate::llm::ToolCall;

#[derive(Deserialize)]
struct StandardFormat {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

/// Strip a surrounding ``` / ```json fence, if present
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

/// Parse a tool call embedded in message content
pub fn parse_content_tool_call(content: &str) -> Option<ToolCall> {
    let parsed: StandardFormat = serde_json::from_str(strip_code_fence(content)).ok()?;
    Some(ToolCall::new(parsed.name, parsed.arguments))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let content = r#"{"name": "list_baseline_images", "arguments": {}}"#;
        let call = parse_content_tool_call(content).unwrap();
        assert_eq!(call.function.name, "list_baseline_images");
        assert!(call.function.arguments.is_object());
    }

    #[test]
    fn test_parse_fenced() {
        let content = "```json\n{\"name\": \"generate_image_from_prompt_and_image\", \"arguments\": {\"prompt\": \"p\", \"image_path\": \"a.png\"}}\n```";
        let call = parse_content_tool_call(content).unwrap();
        assert_eq!(call.function.arguments["image_path"], "a.png");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_content_tool_call(r#"{"arguments": {}}"#).is_none());
        assert!(parse_content_tool_call("Here is the campaign brief").is_none());
        assert!(parse_content_tool_call("{ incomplete").is_none());
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
    }
}
