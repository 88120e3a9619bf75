use hub_core::dashboard::DashboardConfig;
use hub_core::telemetry::init_logging;
use hub_server::{start_server, DatabaseConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine; real deployments set the environment directly
    let _ = dotenvy::dotenv();
    init_logging();

    let database = DatabaseConfig::from_env();
    let dashboard = DashboardConfig::from_env();

    tracing::info!("Hub running at http://localhost:{}", dashboard.port);

    start_server(database, dashboard, shutdown_signal())
        .await
        .map_err(|e| e.into())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
