use anyhow::Result;
use smart_translator::{config::Config, coordinator::Coordinator, server};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when variables come from the environment)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("smart_translator=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        environment = %config.environment,
        endpoint = %config.translate_api_url,
        timeout_secs = config.request_timeout_secs,
        "Starting smart translator coordinator"
    );

    let coordinator = Coordinator::from_config(&config)?;
    info!(
        source = ?coordinator.preferences().source_language,
        target = ?coordinator.preferences().target_language,
        "Default selection languages"
    );

    let state = Arc::new(server::AppState::new(coordinator, config.api_key.clone()));
    server::serve(&config, state).await
}
