use std::net::SocketAddr;

use tracing::info;

use planb_api::{
    proxy::{create_proxy, ProxyConfig, ProxyState, RewriteTable},
    shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    planb_api::init_tracing();

    let config = ProxyConfig::from_env()?;
    let table = RewriteTable::for_backend(&config.backend_url);
    for rule in table.rules() {
        info!(
            "rewrite {}/:path* -> {}/:path*",
            rule.source_prefix, rule.destination_prefix
        );
    }

    let app = create_proxy(ProxyState::new(table)?);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(environment = %config.environment, backend = %config.backend_url, "proxy listening on http://{addr}");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
