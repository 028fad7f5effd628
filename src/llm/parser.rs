//! Recovery-tolerant parsing of provider replies
//!
//! Providers are asked for `{"actions": [{"commandName", "parameters",
//! "confidence"}]}` but routinely wrap it in prose or code fences, leave
//! trailing commas, use single quotes, or get cut off mid-object. Parsing
//! tries, in order:
//! 1. the reply with code fences stripped
//! 2. each balanced `{...}` / `[...]` fragment in turn, as-is and then
//!    after syntax repair
//!
//! A bare top-level array is read as the action list.

use crate::core::error::{PipelineError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Structured reply from a provider
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AiResponse {
    #[serde(default, alias = "Actions")]
    pub actions: Vec<AiAction>,
    /// Free-text explanation, shown when there are no actions
    #[serde(
        default,
        alias = "ResponseText",
        alias = "responseText",
        alias = "explanation",
        alias = "message"
    )]
    pub response_text: Option<String>,
}

/// One command the provider wants executed
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiAction {
    #[serde(alias = "CommandName", alias = "commandName", alias = "command", alias = "name")]
    pub command_name: String,
    #[serde(default, alias = "Parameters")]
    pub parameters: Map<String, Value>,
    #[serde(default = "full_confidence", alias = "Confidence")]
    pub confidence: f64,
}

fn full_confidence() -> f64 {
    1.0
}

/// Parse a raw provider reply, repairing it when needed
pub fn parse_reply(raw: &str) -> Result<AiResponse> {
    let text = strip_code_fences(raw);

    if let Ok(response) = parse_value(text) {
        return Ok(response);
    }

    let mut first_error = None;
    let mut from = 0;
    while let Some(offset) = text[from..].find(['{', '[']) {
        let start = from + offset;
        let fragment = fragment_at(text, start);
        match parse_fragment(fragment) {
            Ok(response) => return Ok(response),
            Err(e) => {
                tracing::debug!("fragment at {} rejected: {}", start, e);
                first_error.get_or_insert(e);
            }
        }
        // Later candidates start after this fragment, never inside it
        from = start + fragment.len();
    }

    Err(match first_error {
        Some(e) => PipelineError::MalformedReply(format!("{} in reply: {}", e, preview(raw))),
        None => PipelineError::MalformedReply(format!("no JSON found in reply: {}", preview(raw))),
    })
}

/// A fragment as-is, then after syntax repair
fn parse_fragment(fragment: &str) -> Result<AiResponse> {
    if let Ok(response) = parse_value(fragment) {
        tracing::debug!("parsed reply from embedded fragment");
        return Ok(response);
    }
    let response = parse_value(&repair(fragment))?;
    tracing::debug!("parsed reply after repair");
    Ok(response)
}

fn parse_value(text: &str) -> Result<AiResponse> {
    let value: Value = serde_json::from_str(text.trim())?;
    match value {
        Value::Array(_) => Ok(AiResponse { actions: serde_json::from_value(value)?, response_text: None }),
        Value::Object(_) => Ok(serde_json::from_value(value)?),
        other => Err(PipelineError::MalformedReply(format!("expected an object, got {}", other))),
    }
}

/// Content of the first fenced block, or the whole text
fn strip_code_fences(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text.trim();
    };
    let after = &text[open + 3..];
    // Skip the language tag line ("```json")
    let body = match after.find('\n') {
        Some(nl) if !after[..nl].trim().contains(['{', '[']) => &after[nl + 1..],
        _ => after,
    };
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Balanced object or array opening at `start`; the unbalanced tail when truncated
fn fragment_at(text: &str, start: usize) -> &str {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &text[start..start + i + c.len_utf8()];
                }
            }
            _ => {}
        }
    }
    &text[start..]
}

/// Fix the common slips: single quotes, trailing commas, missing closers
fn repair(fragment: &str) -> String {
    let source = if fragment.contains('"') {
        fragment.to_string()
    } else {
        fragment.replace('\'', "\"")
    };

    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len() + 4);
    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                closers.pop();
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
                if matches!(next, Some('}') | Some(']') | None) {
                    continue;
                }
            }
            _ => {}
        }
        out.push(c);
    }

    if in_string {
        out.push('"');
    }
    while let Some(closer) = closers.pop() {
        out.push(closer);
    }
    out
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(120).collect();
    if text.chars().count() > 120 {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_well_formed_reply() {
        let raw = r#"{"actions": [{"commandName": "CreateSphere", "parameters": {"radius": 5}, "confidence": 0.9}]}"#;
        let response = parse_reply(raw).unwrap();
        assert_eq!(response.actions.len(), 1);
        assert_eq!(response.actions[0].command_name, "CreateSphere");
        assert_eq!(response.actions[0].parameters["radius"], json!(5));
        assert_eq!(response.actions[0].confidence, 0.9);
    }

    #[test]
    fn test_pascal_case_schema() {
        let raw = r#"{"Actions": [{"CommandName": "CreateBox", "Parameters": {}, "Confidence": 0.8}]}"#;
        let response = parse_reply(raw).unwrap();
        assert_eq!(response.actions[0].command_name, "CreateBox");
    }

    #[test]
    fn test_fenced_with_prose() {
        let raw = "Sure! Here is the plan:\n```json\n{\"actions\": [{\"commandName\": \"CreateBox\"}]}\n```\nLet me know.";
        let response = parse_reply(raw).unwrap();
        assert_eq!(response.actions[0].command_name, "CreateBox");
        assert_eq!(response.actions[0].confidence, 1.0);
    }

    #[test]
    fn test_trailing_text_uses_first_fragment() {
        let raw = r#"{"actions": []} and also {"unrelated": true}"#;
        let response = parse_reply(raw).unwrap();
        assert!(response.actions.is_empty());
    }

    #[test]
    fn test_skips_bracketed_prose_before_reply() {
        let raw = r#"Plan [v2]: {"actions": [{"commandName": "CreateBox", "confidence": 0.7}]}"#;
        let response = parse_reply(raw).unwrap();
        assert_eq!(response.actions.len(), 1);
        assert_eq!(response.actions[0].command_name, "CreateBox");

        let raw = r#"See [1] and [note]: {'actions': [{'commandName': 'CreateSphere',},]}"#;
        let response = parse_reply(raw).unwrap();
        assert_eq!(response.actions[0].command_name, "CreateSphere");
    }

    #[test]
    fn test_braces_inside_strings() {
        let raw = r#"Result: {"responseText": "use {curly} braces", "actions": []} done"#;
        let response = parse_reply(raw).unwrap();
        assert_eq!(response.response_text.as_deref(), Some("use {curly} braces"));
    }

    #[test]
    fn test_repairs_trailing_commas_and_quotes() {
        let raw = "{'actions': [{'commandName': 'CreateSphere', 'parameters': {'radius': 2,},},]}";
        let response = parse_reply(raw).unwrap();
        assert_eq!(response.actions[0].parameters["radius"], json!(2));
    }

    #[test]
    fn test_repairs_truncated_reply() {
        let raw = r#"{"actions": [{"commandName": "CreateCylinder", "parameters": {"height": 4"#;
        let response = parse_reply(raw).unwrap();
        assert_eq!(response.actions[0].command_name, "CreateCylinder");
        assert_eq!(response.actions[0].parameters["height"], json!(4));
    }

    #[test]
    fn test_top_level_array() {
        let raw = r#"[{"name": "QueryScene"}]"#;
        let response = parse_reply(raw).unwrap();
        assert_eq!(response.actions[0].command_name, "QueryScene");
    }

    #[test]
    fn test_no_actions_keeps_explanation() {
        let raw = r#"{"actions": [], "responseText": "Which object do you mean?"}"#;
        let response = parse_reply(raw).unwrap();
        assert!(response.actions.is_empty());
        assert_eq!(response.response_text.as_deref(), Some("Which object do you mean?"));
    }

    #[test]
    fn test_prose_only_is_malformed() {
        let err = parse_reply("I cannot help with that.").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedReply(_)));
    }
}
