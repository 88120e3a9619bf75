use std::future::Future;
use std::sync::Arc;

use hub_core::dashboard::{DashboardConfig, DashboardServer};
use tracing::info;

mod config;
mod pg_source;

pub use config::DatabaseConfig;
pub use pg_source::PgMetricsSource;

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("server error: {0}")]
    Serve(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Wire the PostgreSQL source into the dashboard and serve until `shutdown` resolves.
pub async fn start_server<F>(
    database: DatabaseConfig,
    dashboard: DashboardConfig,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let source = PgMetricsSource::new(database.lazy_pool()?);
    info!(
        host = %database.host,
        database = %database.database,
        url_override = database.url.is_some(),
        "Metrics source configured"
    );

    DashboardServer::new(dashboard, Arc::new(source))
        .serve_with_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve(e.to_string()))
}
