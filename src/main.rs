use std::{net::SocketAddr, sync::Arc};

use tracing::{error, info};

use planb_api::{
    app::create_app, config::Config, db, identity::IdentityVerifier, quotes, shutdown_signal,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    planb_api::init_tracing();

    let config = Config::from_env()?;

    info!("Attempting to connect to MongoDB...");
    let store = match db::connect(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Failed to start server: database unreachable");
            return Err(e.into());
        }
    };

    let state = AppState {
        store: Arc::new(store),
        identity: Arc::new(IdentityVerifier::from_config(&config)?),
        quotes: quotes::from_config(&config)?,
        config: Arc::new(config),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let mongo_uri = if state.config.mongodb_uri_configured {
        "configured"
    } else {
        "NOT CONFIGURED"
    };
    info!(
        environment = %state.config.environment,
        mongo_uri,
        "Plan B backend listening on http://{addr}, health check at /health"
    );

    let app = create_app(state);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
