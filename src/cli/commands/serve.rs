use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use crate::app::{app, AppState, StartupKeys};
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::services::SmtpMailer;

pub async fn handle() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    tracing::info!("Starting Trainer Admin API in {:?} mode", config.environment);

    let keys = StartupKeys::from_config(&config)?;
    let database = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    let mailer = SmtpMailer::from_config(&config.mail).context("invalid mail configuration")?;

    let bind_addr = format!("{}:{}", config.server.bind_host, config.server.port);
    let state = AppState::assemble(config, keys, database.clone(), Arc::new(mailer));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app(state).into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    database.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
