use crate::domain::ids::{short_id, PROJECT_ID_PREFIX};
use crate::domain::types::Project;
use crate::infrastructure::store::InMemoryStore;

/// Loads configured projects into the store. Later entries win on duplicate ids.
pub async fn seed_projects(store: &InMemoryStore, projects: &[Project]) -> usize {
    for project in projects {
        store.seed_project(project.clone()).await;
        tracing::debug!(
            project = %short_id(project.id, PROJECT_ID_PREFIX),
            name = %project.name,
            "seeded configured project"
        );
    }
    let seeded = store.project_count().await;
    if seeded == 0 {
        tracing::warn!("no projects configured; every chat request will return project_not_found");
    } else {
        tracing::info!(projects = seeded, "projects seeded");
    }
    seeded
}
