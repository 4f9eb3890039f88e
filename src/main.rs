mod app;
mod auth;
mod config;
mod ctx;
mod db;
mod error;
mod images;
mod products;
mod state;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "catalog=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    tracing::info!(
        upload_dir = %config.upload_dir.display(),
        ttl_minutes = config.jwt.ttl_minutes,
        "configuration loaded"
    );

    let state = AppState::init(config).await?;
    let shutdown = state.shutdown.clone();
    app::serve(app::build_app(state), shutdown).await
}
