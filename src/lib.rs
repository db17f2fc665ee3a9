//! Plan B portfolio API.
//!
//! Two binaries share this library: `planb-api`, the JSON backend
//! (auth hand-off, portfolio, feedback, market sentiment, quotes), and
//! `planb-proxy`, which forwards the frontend's `/api/<service>/*` calls to
//! the backend.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod proxy;
pub mod quotes;
pub mod state;


use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    fmt().with_env_filter(filter).init();
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => error!(error = %e, "failed to listen for Ctrl+C"),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
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
}
