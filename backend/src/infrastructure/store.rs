use crate::domain::ports::{ProjectPort, TaskPort};
use crate::domain::types::{same_instant, Project, Task, TaskDraft, TaskStatus};
use crate::domain::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct StoreState {
    projects: HashMap<Uuid, Project>,
    tasks: HashMap<Uuid, (u64, Task)>,
    next_seq: u64,
}

/// Process-local task and project store. Listing preserves creation order.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_project(&self, project: Project) {
        let project_id = project.id;
        self.inner.write().await.projects.insert(project.id, project);
        tracing::debug!(project_id = %project_id, "seeded project");
    }

    pub async fn project_count(&self) -> usize {
        self.inner.read().await.projects.len()
    }
}

fn check_draft(draft: &TaskDraft) -> Result<(), StoreError> {
    if draft.name.trim().is_empty() {
        return Err(StoreError::Invalid("name is required".to_string()));
    }
    draft.validate_window().map_err(StoreError::Invalid)
}

#[async_trait]
impl TaskPort for InMemoryStore {
    async fn create_task(&self, project_id: Uuid, draft: TaskDraft) -> Result<Task, StoreError> {
        check_draft(&draft)?;
        let mut state = self.inner.write().await;
        if !state.projects.contains_key(&project_id) {
            return Err(StoreError::NotFound("project".to_string()));
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            project_id,
            name: draft.name,
            description: draft.description,
            priority: draft.priority,
            status: TaskStatus::Todo,
            start_datetime: draft.start_datetime,
            end_datetime: draft.end_datetime,
            location: draft.location,
            recurring_days: draft.recurring_days,
            recurring_until: draft.recurring_until,
            created_at: now,
            updated_at: now,
        };
        let seq = state.next_seq;
        state.next_seq += 1;
        state.tasks.insert(task.id, (seq, task.clone()));
        tracing::debug!(task_id = %task.id, project_id = %project_id, "created task");
        Ok(task)
    }

    async fn get_task(&self, id: Uuid) -> Result<Task, StoreError> {
        self.inner
            .read()
            .await
            .tasks
            .get(&id)
            .map(|(_, task)| task.clone())
            .ok_or_else(|| StoreError::NotFound("task".to_string()))
    }

    async fn update_task(&self, id: Uuid, draft: TaskDraft) -> Result<Task, StoreError> {
        check_draft(&draft)?;
        let mut state = self.inner.write().await;
        let (_, task) = state
            .tasks
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("task".to_string()))?;

        if task.status != TaskStatus::Todo
            && !same_instant(draft.start_datetime.as_deref(), task.start_datetime.as_deref())
        {
            return Err(StoreError::Invalid(
                "cannot update start_datetime when status is not todo".to_string(),
            ));
        }

        task.name = draft.name;
        task.description = draft.description;
        task.priority = draft.priority;
        task.start_datetime = draft.start_datetime;
        task.end_datetime = draft.end_datetime;
        task.location = draft.location;
        task.recurring_days = draft.recurring_days;
        task.recurring_until = draft.recurring_until;
        task.updated_at = Utc::now();
        tracing::debug!(task_id = %id, "updated task");
        Ok(task.clone())
    }

    async fn delete_task(&self, id: Uuid) -> Result<(), StoreError> {
        let removed = self.inner.write().await.tasks.remove(&id).is_some();
        tracing::debug!(task_id = %id, removed, "deleted task");
        if removed {
            Ok(())
        } else {
            Err(StoreError::NotFound("task".to_string()))
        }
    }

    async fn list_tasks(&self, project_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let state = self.inner.read().await;
        let mut tasks: Vec<&(u64, Task)> = state
            .tasks
            .values()
            .filter(|(_, task)| task.project_id == project_id)
            .collect();
        tasks.sort_by_key(|(seq, _)| *seq);
        Ok(tasks.into_iter().map(|(_, task)| task.clone()).collect())
    }
}

#[async_trait]
impl ProjectPort for InMemoryStore {
    async fn get_project(&self, id: Uuid) -> Result<Project, StoreError> {
        self.inner
            .read()
            .await
            .projects
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("project".to_string()))
    }
}

#[cfg(test)]
impl InMemoryStore {
    pub(crate) async fn set_status(&self, id: Uuid, status: TaskStatus) {
        if let Some((_, task)) = self.inner.write().await.tasks.get_mut(&id) {
            task.status = status;
        }
    }
}
