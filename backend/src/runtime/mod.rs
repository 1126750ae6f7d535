pub mod bootstrap;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::application::ChatService;
use crate::domain::ports::{ModelPort, ProjectPort, TaskPort};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::model::GroqGateway;
use crate::infrastructure::store::InMemoryStore;
use crate::interface::http::AppState;
use crate::runtime::bootstrap::seed_projects;

pub async fn build_app(config: &AppConfig) -> Result<AppState> {
    let api_key = config
        .groq_api_key
        .clone()
        .context("GROQ_API_KEY environment variable is not set")?;
    let model: Arc<dyn ModelPort> = Arc::new(GroqGateway::new(
        api_key,
        config.api_url.clone(),
        config.request_timeout,
    )?);
    build_app_with_model(config, model).await
}

/// Wires the service around an already-built model port, backed by a fresh store.
pub async fn build_app_with_model(config: &AppConfig, model: Arc<dyn ModelPort>) -> Result<AppState> {
    let store = InMemoryStore::new();
    seed_projects(&store, &config.projects).await;

    let tasks: Arc<dyn TaskPort> = Arc::new(store.clone());
    let projects: Arc<dyn ProjectPort> = Arc::new(store);
    let chat = ChatService::new(model, tasks, projects, config.model.clone());
    tracing::info!(
        model_port = chat.model_name(),
        model = %config.model.model,
        "chat service ready"
    );
    Ok(AppState::new(chat))
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %error, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(error = %error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
