use crate::domain::types::{ChatMessage, ProposedTask, TaskAction};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const CREATE_TASK: &str = "create_task";
pub const UPDATE_TASK: &str = "update_task";
pub const DELETE_TASK: &str = "delete_task";
pub const GET_TASK: &str = "get_task";
pub const LIST_TASKS: &str = "list_tasks";

/// Actions the dispatcher is allowed to execute.
pub const ALLOWED_ACTIONS: [&str; 5] = [CREATE_TASK, UPDATE_TASK, DELETE_TASK, GET_TASK, LIST_TASKS];

pub fn is_allowed_action(name: &str) -> bool {
    ALLOWED_ACTIONS.contains(&name)
}

#[derive(Clone, Debug)]
pub struct SendMessageRequest {
    pub project_id: Uuid,
    pub account_id: Uuid,
    pub content: String,
    pub history: Vec<ChatMessage>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct FunctionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<TaskAction>,
}

impl FunctionResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
            action: None,
        }
    }

    pub fn with_action(data: Value, action: TaskAction) -> Self {
        Self {
            action: Some(action),
            ..Self::ok(data)
        }
    }

    /// Failed results never carry a task action.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error.into()),
            action: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Text,
    Action,
    TaskList,
}

/// Intent recovered from one buffered model reply.
#[derive(Clone, Debug, PartialEq)]
pub enum StructuredReply {
    Text {
        message: String,
    },
    Action {
        call: FunctionCall,
    },
    TaskList {
        message: String,
        tasks: Vec<ProposedTask>,
    },
}

impl StructuredReply {
    pub fn kind(&self) -> ReplyKind {
        match self {
            Self::Text { .. } => ReplyKind::Text,
            Self::Action { .. } => ReplyKind::Action,
            Self::TaskList { .. } => ReplyKind::TaskList,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    #[serde(rename = "type")]
    pub kind: ReplyKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<ProposedTask>>,
    #[serde(default)]
    pub task_actions: Vec<TaskAction>,
}

impl ChatReply {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Text,
            message: message.into(),
            tasks: None,
            task_actions: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct CreateTaskArgs {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub start_datetime: Option<String>,
    pub end_datetime: Option<String>,
    pub location: Option<String>,
    pub recurring_days: Option<u32>,
    pub recurring_until: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct UpdateTaskArgs {
    pub task_id: Option<String>,
    #[serde(flatten)]
    pub fields: CreateTaskArgs,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct TaskRef {
    pub task_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ListTasksArgs {
    pub status: Option<String>,
}

/// A function call whose arguments have been decoded for its action.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionCall {
    Create(CreateTaskArgs),
    Update(UpdateTaskArgs),
    Delete(TaskRef),
    Get(TaskRef),
    List(ListTasksArgs),
}

impl ActionCall {
    pub fn decode(call: &FunctionCall) -> Result<Self, String> {
        match call.name.as_str() {
            CREATE_TASK => decode_args(&call.arguments).map(Self::Create),
            UPDATE_TASK => decode_args(&call.arguments).map(Self::Update),
            DELETE_TASK => decode_args(&call.arguments).map(Self::Delete),
            GET_TASK => decode_args(&call.arguments).map(Self::Get),
            LIST_TASKS => decode_args(&call.arguments).map(Self::List),
            other => Err(format!("unknown function: {other}")),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Create(_) => CREATE_TASK,
            Self::Update(_) => UPDATE_TASK,
            Self::Delete(_) => DELETE_TASK,
            Self::Get(_) => GET_TASK,
            Self::List(_) => LIST_TASKS,
        }
    }
}

fn decode_args<T>(arguments: &Value) -> Result<T, String>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if arguments.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(arguments.clone()).map_err(|error| format!("invalid arguments: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_update_keeps_flattened_fields() {
        let call = FunctionCall {
            name: UPDATE_TASK.to_string(),
            arguments: json!({"task_id": "tsk_x", "name": "Write report", "priority": "high"}),
        };
        let ActionCall::Update(args) = ActionCall::decode(&call).unwrap() else {
            panic!("expected update");
        };
        assert_eq!(args.task_id.as_deref(), Some("tsk_x"));
        assert_eq!(args.fields.name, "Write report");
        assert_eq!(args.fields.priority.as_deref(), Some("high"));
    }

    #[test]
    fn decode_rejects_wrong_argument_types() {
        let call = FunctionCall {
            name: CREATE_TASK.to_string(),
            arguments: json!({"name": 42}),
        };
        assert!(ActionCall::decode(&call).unwrap_err().starts_with("invalid arguments"));
    }

    #[test]
    fn decode_list_without_arguments() {
        let call = FunctionCall {
            name: LIST_TASKS.to_string(),
            arguments: Value::Null,
        };
        assert_eq!(
            ActionCall::decode(&call).unwrap(),
            ActionCall::List(ListTasksArgs::default())
        );
    }

    #[test]
    fn failed_result_has_no_action() {
        let result = FunctionResult::failed("boom");
        assert!(!result.success);
        assert!(result.action.is_none());
    }
}
