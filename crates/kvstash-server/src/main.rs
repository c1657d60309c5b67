//! kvstash server
//!
//! In-memory key-value store over HTTP:
//! - `POST /set`, `GET /get/:key`, `GET /search`
//! - `GET /healthCheck`, `GET /metrics`
//! - Background refresh of the `total_keys` gauge

use std::path::Path;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kvstash_core::error::{KvError, Result};
use kvstash_server::{app_state::AppState, config, router, tasks};

const CONFIG_ENV: &str = "KVSTASH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "kvstash.yaml";

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(code = e.client_code().as_str(), error = %e, "kvstash-server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let state = AppState::new(load_config()?);
    let listen = state.cfg().server.listen_addr()?;

    let refresher = tasks::spawn_key_count_refresher(
        state.store_handle(),
        state.metrics_handle(),
        state.cfg().metrics.key_count_interval(),
    );
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| KvError::Internal(format!("failed to bind {listen}: {e}")))?;
    tracing::info!(%listen, "kvstash-server listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| KvError::Internal(format!("server failed: {e}")));

    refresher.shutdown().await;
    tracing::info!("kvstash-server stopped");
    served
}

/// Explicit `KVSTASH_CONFIG` must load; the default path is optional.
fn load_config() -> Result<config::ServerConfig> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        tracing::info!(%path, "loading config");
        return config::load_from_file(&path);
    }
    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        tracing::info!(path = DEFAULT_CONFIG_PATH, "loading config");
        return config::load_from_file(DEFAULT_CONFIG_PATH);
    }
    tracing::info!("no config file found, using defaults");
    Ok(config::ServerConfig::default())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
    tracing::info!("signal received, starting graceful shutdown");
}
