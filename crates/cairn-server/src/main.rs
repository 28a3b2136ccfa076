use tokio_util::sync::CancellationToken;
use tracing::info;

use cairn_db::Database;
use cairn_gateway::EventBus;
use cairn_server::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cairn=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let db = Database::open(&config.db_path)?;

    let bus = EventBus::new();
    let shutdown = CancellationToken::new();
    let app_state = cairn_server::app_state(db, config.jwt_secret.clone(), bus.clone());
    let app = cairn_server::router(app_state, shutdown.clone());

    let addr = config.addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Cairn server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown, bus))
        .await?;

    info!("Cairn server stopped");
    Ok(())
}

/// Resolves on Ctrl-C after ending every gateway connection, so graceful
/// shutdown is not held open by idle websockets.
async fn shutdown_signal(shutdown: CancellationToken, bus: EventBus) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
    shutdown.cancel();
    bus.shutdown();
}
