pub mod browser;
pub mod db;
pub mod error;
pub mod handlers;
pub mod invoker;
pub mod models;
pub mod runner;
pub mod source;
pub mod state;

use std::sync::Arc;

pub use error::{Error, Result};
use models::{ConnectionConfig, GatewaySettings};
use state::AppState;

/// Log to stderr at `info` unless `RUST_LOG` says otherwise.
///
/// Stdout stays free for the runner's JSON payload.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .try_init();
}

/// Bind the gateway and serve until Ctrl-C.
pub async fn run_gateway(settings: GatewaySettings, config: ConnectionConfig) -> Result<()> {
    let state = Arc::new(AppState::from_settings(&settings, config));
    let app = handlers::router(state);

    let listener = tokio::net::TcpListener::bind(settings.bind).await?;
    log::info!("Query gateway listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Query gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
