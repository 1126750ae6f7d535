use anyhow::{Context, Result};
use smart_task_backend::infrastructure::config::AppConfig;
use smart_task_backend::infrastructure::logging::init_logging;
use smart_task_backend::interface::http::router;
use smart_task_backend::runtime::{build_app, shutdown_signal};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    let logging_runtime = init_logging(&config)?;
    info!(
        config_file = %config.config_path.display(),
        log_dir = %config.log_dir.display(),
        log_file = %logging_runtime.log_file.display(),
        log_filter = %logging_runtime.filter,
        retention_days = config.log_retention_days,
        "smart-task logging initialized"
    );

    let state = build_app(&config).await?;
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(address = %addr, "smart-task server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    drop(logging_runtime);

    Ok(())
}
