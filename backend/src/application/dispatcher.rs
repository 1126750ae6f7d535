use crate::domain::chat::{
    ActionCall, CreateTaskArgs, FunctionCall, FunctionResult, ListTasksArgs, TaskRef,
    UpdateTaskArgs,
};
use crate::domain::ids::{parse_id, short_id, TASK_ID_PREFIX};
use crate::domain::ports::TaskPort;
use crate::domain::types::{Task, TaskAction, TaskActionType, TaskDraft, TaskPriority};
use crate::domain::StoreError;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Executes allow-listed task actions on behalf of one project.
#[derive(Clone)]
pub struct ActionDispatcher {
    tasks: Arc<dyn TaskPort>,
}

impl ActionDispatcher {
    pub fn new(tasks: Arc<dyn TaskPort>) -> Self {
        Self { tasks }
    }

    /// Never fails: every problem is reported inside the returned result.
    pub async fn execute(&self, project_id: Uuid, call: &FunctionCall) -> FunctionResult {
        let result = match ActionCall::decode(call) {
            Ok(action) => self.run(project_id, action).await,
            Err(error) => FunctionResult::failed(error),
        };

        tracing::info!(
            action = %call.name,
            project_id = %project_id,
            success = result.success,
            mutation = ?result.action.as_ref().map(|action| action.action_type),
            "task action executed"
        );
        if let Some(error) = &result.error {
            tracing::debug!(action = %call.name, error = %error, "task action failed");
        }
        result
    }

    async fn run(&self, project_id: Uuid, action: ActionCall) -> FunctionResult {
        let outcome = match action {
            ActionCall::Create(args) => self.create(project_id, args).await,
            ActionCall::Update(args) => self.update(project_id, args).await,
            ActionCall::Delete(args) => self.delete(project_id, args).await,
            ActionCall::Get(args) => self.get(project_id, args).await,
            ActionCall::List(args) => self.list(project_id, args).await,
        };
        outcome.unwrap_or_else(FunctionResult::failed)
    }

    async fn create(&self, project_id: Uuid, args: CreateTaskArgs) -> Result<FunctionResult, String> {
        let draft = draft_from_args(args, TaskDraft::default())?;
        let task = self
            .tasks
            .create_task(project_id, draft)
            .await
            .map_err(|error| format!("failed to create task: {error}"))?;

        Ok(FunctionResult::with_action(
            summary(&task),
            mutation(TaskActionType::Created, &task),
        ))
    }

    async fn update(&self, project_id: Uuid, args: UpdateTaskArgs) -> Result<FunctionResult, String> {
        let UpdateTaskArgs { task_id, fields } = args;
        let existing = self.owned_task(project_id, task_id.as_deref()).await?;
        let draft = draft_from_args(fields, draft_of(&existing))?;
        let task = self
            .tasks
            .update_task(existing.id, draft)
            .await
            .map_err(|error| format!("failed to update task: {error}"))?;

        Ok(FunctionResult::with_action(
            summary(&task),
            mutation(TaskActionType::Updated, &task),
        ))
    }

    async fn delete(&self, project_id: Uuid, args: TaskRef) -> Result<FunctionResult, String> {
        // Read first so the result can still name the task.
        let existing = self.owned_task(project_id, args.task_id.as_deref()).await?;
        self.tasks
            .delete_task(existing.id)
            .await
            .map_err(|error| format!("failed to delete task: {error}"))?;

        Ok(FunctionResult::with_action(
            json!({
                "task_id": short_id(existing.id, TASK_ID_PREFIX),
                "name": existing.name,
                "deleted": true,
            }),
            mutation(TaskActionType::Deleted, &existing),
        ))
    }

    async fn get(&self, project_id: Uuid, args: TaskRef) -> Result<FunctionResult, String> {
        let task = self.owned_task(project_id, args.task_id.as_deref()).await?;
        Ok(FunctionResult::ok(project_task(&task)))
    }

    async fn list(&self, project_id: Uuid, args: ListTasksArgs) -> Result<FunctionResult, String> {
        let tasks = self
            .tasks
            .list_tasks(project_id)
            .await
            .map_err(|error| format!("failed to list tasks: {error}"))?;

        let status = args
            .status
            .as_deref()
            .map(str::trim)
            .filter(|status| !status.is_empty());
        let listed: Vec<Value> = tasks
            .iter()
            .filter(|task| status.map_or(true, |wanted| task.status.as_str().eq_ignore_ascii_case(wanted)))
            .map(project_task)
            .collect();

        Ok(FunctionResult::ok(json!({
            "count": listed.len(),
            "tasks": listed,
        })))
    }

    async fn owned_task(&self, project_id: Uuid, raw_id: Option<&str>) -> Result<Task, String> {
        let raw_id = raw_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| "task_id is required".to_string())?;
        let id = parse_id(raw_id, TASK_ID_PREFIX).map_err(|error| format!("invalid task ID: {error}"))?;

        let task = self.tasks.get_task(id).await.map_err(|error| match error {
            StoreError::NotFound(_) => "task not found".to_string(),
            other => format!("failed to load task: {other}"),
        })?;
        if task.project_id != project_id {
            return Err("task not found".to_string());
        }
        Ok(task)
    }
}

/// Overlays supplied arguments on `base`; omitted optional fields keep their value.
fn draft_from_args(args: CreateTaskArgs, base: TaskDraft) -> Result<TaskDraft, String> {
    let name = args.name.trim();
    if name.is_empty() {
        return Err("name is required".to_string());
    }
    let priority = match args.priority.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(raw) => TaskPriority::parse(raw)
            .ok_or_else(|| format!("invalid priority {raw:?}: expected low, medium or high"))?,
        None => base.priority,
    };

    let draft = TaskDraft {
        name: name.to_string(),
        description: args.description.or(base.description),
        priority,
        start_datetime: args.start_datetime.or(base.start_datetime),
        end_datetime: args.end_datetime.or(base.end_datetime),
        location: args.location.or(base.location),
        recurring_days: args.recurring_days.or(base.recurring_days),
        recurring_until: args.recurring_until.or(base.recurring_until),
    };
    draft.validate_window()?;
    Ok(draft)
}

fn draft_of(task: &Task) -> TaskDraft {
    TaskDraft {
        name: task.name.clone(),
        description: task.description.clone(),
        priority: task.priority,
        start_datetime: task.start_datetime.clone(),
        end_datetime: task.end_datetime.clone(),
        location: task.location.clone(),
        recurring_days: task.recurring_days,
        recurring_until: task.recurring_until.clone(),
    }
}

fn mutation(action_type: TaskActionType, task: &Task) -> TaskAction {
    TaskAction {
        action_type,
        task_id: task.id,
        name: task.name.clone(),
    }
}

fn summary(task: &Task) -> Value {
    json!({
        "task_id": short_id(task.id, TASK_ID_PREFIX),
        "name": task.name,
        "status": task.status.as_str(),
    })
}

/// Flat view of a task handed back to the caller and the confirmation renderer.
pub fn project_task(task: &Task) -> Value {
    let mut fields = Map::new();
    fields.insert("task_id".into(), json!(short_id(task.id, TASK_ID_PREFIX)));
    fields.insert("name".into(), json!(task.name));
    fields.insert("status".into(), json!(task.status.as_str()));
    fields.insert("priority".into(), json!(task.priority.as_str()));
    fields.insert("created_at".into(), json!(task.created_at.to_rfc3339()));

    let optional = [
        ("description", task.description.as_ref()),
        ("start_datetime", task.start_datetime.as_ref()),
        ("end_datetime", task.end_datetime.as_ref()),
        ("location", task.location.as_ref()),
        ("recurring_until", task.recurring_until.as_ref()),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            fields.insert(key.into(), json!(value));
        }
    }
    if let Some(days) = task.recurring_days {
        fields.insert("recurring_days".into(), json!(days));
    }
    Value::Object(fields)
}
