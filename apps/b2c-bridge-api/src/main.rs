//! HTTP service exposing the Azure AD B2C login bridge.

mod config;
mod logging;

use std::sync::Arc;

use axum::Router;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

use b2c_bridge_federation::{create_federation_router, FederationConfig, InMemoryUserStore};

use crate::config::Config;

#[tokio::main]
async fn main() {
    // Load configuration (fail-fast on missing required values)
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init_logging(&config.rust_log, config.log_format) {
        eprintln!("FATAL: {e}");
        std::process::exit(1);
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        port = config.port,
        b2c_enabled = config.federation.enabled,
        base_path = %config.federation.normalized_base_path(),
        "Starting b2c-bridge API"
    );

    // Users live only as long as the process; embedders provide a durable UserStore.
    let store = Arc::new(InMemoryUserStore::new());

    let federation = match create_federation_router(FederationConfig::new(
        config.federation.clone(),
        store,
    )) {
        Ok(router) => router,
        Err(e) => {
            tracing::error!("Failed to configure B2C bridge: {e}");
            std::process::exit(1);
        }
    };

    let app = Router::new()
        .merge(federation)
        .layer(TraceLayer::new_for_http());

    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    info!(addr = %addr, "Listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    info!("Server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
