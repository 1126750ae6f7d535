use crate::domain::chat::{is_allowed_action, FunctionCall, StructuredReply};
use crate::domain::types::ProposedTask;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

const FENCE_PATTERN: &str = r"```(?:json)?\s*([\s\S]*?)```";

#[derive(Debug, Deserialize)]
struct RawReply {
    action: Option<String>,
    #[serde(default)]
    arguments: Value,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    message: Value,
    /// Left raw so a stray `tasks` field cannot spoil an action reply.
    #[serde(default)]
    tasks: Value,
}

/// Recovers structured intent from free-form model output.
#[derive(Clone, Debug)]
pub struct ResponseInterpreter {
    fence: Regex,
}

impl Default for ResponseInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseInterpreter {
    pub fn new() -> Self {
        Self {
            fence: Regex::new(FENCE_PATTERN).expect("fence pattern is a valid regex"),
        }
    }

    /// First balanced JSON object in `text`, after unwrapping a markdown fence.
    pub fn extract_json<'a>(&self, text: &'a str) -> Option<&'a str> {
        let mut candidate = text.trim();
        if let Some(inner) = self.fence.captures(candidate).and_then(|caps| caps.get(1)) {
            candidate = inner.as_str().trim();
        }
        balanced_object(candidate)
    }

    /// `None` means the reply is plain text and should be shown as-is.
    pub fn interpret(&self, text: &str) -> Option<StructuredReply> {
        let json = self.extract_json(text)?;
        let raw: RawReply = serde_json::from_str(json).ok()?;
        let message = raw
            .message
            .as_str()
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map(str::to_string);

        if let Some(action) = raw.action {
            if raw.kind.as_deref().is_some_and(|kind| kind != "action") {
                return None;
            }
            if !is_allowed_action(&action) {
                tracing::debug!(action = %action, "ignoring action outside allow-list");
                return None;
            }
            return Some(StructuredReply::Action {
                call: FunctionCall {
                    name: action,
                    arguments: raw.arguments,
                },
            });
        }

        match raw.kind.as_deref()? {
            "text" => Some(StructuredReply::Text { message: message? }),
            "task_list" => Some(StructuredReply::TaskList {
                message: message?,
                tasks: proposed_tasks(raw.tasks),
            }),
            _ => None,
        }
    }
}

/// Keeps the entries that decode; a nameless or mistyped suggestion is skipped.
fn proposed_tasks(raw: Value) -> Vec<ProposedTask> {
    let Value::Array(items) = raw else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<ProposedTask>(item) {
            Ok(task) if !task.name.trim().is_empty() => Some(task),
            Ok(_) => None,
            Err(error) => {
                tracing::debug!(error = %error, "skipping malformed proposed task");
                None
            }
        })
        .collect()
}

/// Scans from the first `{` to its matching `}`; braces inside strings don't count.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_object_ignores_braces_in_strings() {
        let text = r#"see {"a": "}{", "b": {"c": "\"}"}} trailing }"#;
        assert_eq!(
            balanced_object(text),
            Some(r#"{"a": "}{", "b": {"c": "\"}"}}"#)
        );
    }

    #[test]
    fn unbalanced_object_yields_nothing() {
        assert_eq!(balanced_object(r#"{"a": {"b": 1}"#), None);
        assert_eq!(balanced_object("no braces here"), None);
    }
}
