use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Done => "done",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub start_datetime: Option<String>,
    pub end_datetime: Option<String>,
    pub location: Option<String>,
    pub recurring_days: Option<u32>,
    pub recurring_until: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Writable task fields shared by create and update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskDraft {
    pub name: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub start_datetime: Option<String>,
    pub end_datetime: Option<String>,
    pub location: Option<String>,
    pub recurring_days: Option<u32>,
    pub recurring_until: Option<String>,
}

impl TaskDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Checks the time window: both ends must be RFC 3339, distinct, and ordered.
    pub fn validate_window(&self) -> Result<(), String> {
        let start = parse_datetime("start_datetime", self.start_datetime.as_deref())?;
        let end = parse_datetime("end_datetime", self.end_datetime.as_deref())?;
        if let (Some(start), Some(end)) = (start, end) {
            if start == end {
                return Err("start_datetime and end_datetime cannot be the same".to_string());
            }
            if end < start {
                return Err("end_datetime must be later than start_datetime".to_string());
            }
        }
        Ok(())
    }
}

/// True when both sides name the same instant, however each is written.
/// Unparseable text only matches itself.
pub fn same_instant(left: Option<&str>, right: Option<&str>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(left), Some(right)) => {
            match (
                DateTime::parse_from_rfc3339(left.trim()),
                DateTime::parse_from_rfc3339(right.trim()),
            ) {
                (Ok(left), Ok(right)) => left == right,
                _ => left.trim() == right.trim(),
            }
        }
        _ => false,
    }
}

fn parse_datetime(field: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, String> {
    match raw {
        None => Ok(None),
        Some(text) => DateTime::parse_from_rfc3339(text.trim())
            .map(|value| Some(value.with_timezone(&Utc)))
            .map_err(|error| format!("{field} must be RFC 3339: {error}")),
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    /// Raw project configuration; the assistant settings live under `ai_config`.
    pub config: Option<Value>,
}

/// A task suggested by the model in a `task_list` reply. Never persisted here.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProposedTask {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_datetime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_datetime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_until: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskActionType {
    Created,
    Updated,
    Deleted,
}

/// Audit record of one mutation performed while executing an action.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskAction {
    #[serde(rename = "type")]
    pub action_type: TaskActionType,
    pub task_id: Uuid,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_rejects_equal_bounds() {
        let draft = TaskDraft {
            start_datetime: Some("2024-01-15T09:00:00Z".into()),
            end_datetime: Some("2024-01-15T09:00:00Z".into()),
            ..TaskDraft::named("standup")
        };
        assert!(draft.validate_window().is_err());
    }

    #[test]
    fn window_rejects_reversed_bounds() {
        let draft = TaskDraft {
            start_datetime: Some("2024-01-15T10:00:00Z".into()),
            end_datetime: Some("2024-01-15T09:00:00+00:00".into()),
            ..TaskDraft::named("standup")
        };
        let error = draft.validate_window().unwrap_err();
        assert!(error.contains("later"));
    }

    #[test]
    fn window_rejects_non_rfc3339() {
        let draft = TaskDraft {
            start_datetime: Some("tomorrow morning".into()),
            ..TaskDraft::named("standup")
        };
        assert!(draft.validate_window().unwrap_err().contains("start_datetime"));
    }

    #[test]
    fn window_accepts_open_ended() {
        let draft = TaskDraft {
            end_datetime: Some("2024-01-15T17:00:00+07:00".into()),
            ..TaskDraft::named("ship")
        };
        assert!(draft.validate_window().is_ok());
    }

    #[test]
    fn same_instant_ignores_offset_spelling() {
        assert!(same_instant(
            Some("2024-01-15T09:00:00Z"),
            Some("2024-01-15T16:00:00+07:00")
        ));
        assert!(!same_instant(Some("2024-01-15T09:00:00Z"), Some("2024-01-15T09:00:01Z")));
        assert!(!same_instant(Some("2024-01-15T09:00:00Z"), None));
        assert!(same_instant(None, None));
    }

    #[test]
    fn role_and_priority_parse_case_insensitively() {
        assert_eq!(Role::parse("Assistant"), Some(Role::Assistant));
        assert_eq!(Role::parse("tool"), None);
        assert_eq!(TaskPriority::parse(" HIGH "), Some(TaskPriority::High));
        assert_eq!(TaskPriority::parse("urgent"), None);
    }
}
