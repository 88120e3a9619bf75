use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hub_core::{Aggregator, MetricsSource, SharedSnapshot, Snapshot};
use hub_server::{DatabaseConfig, PgMetricsSource};

fn unreachable_config() -> DatabaseConfig {
    DatabaseConfig {
        host: "127.0.0.1".to_string(),
        // Nothing listens on port 1
        port: 1,
        acquire_timeout: Duration::from_secs(2),
        ..DatabaseConfig::default()
    }
}

#[tokio::test]
async fn reads_fail_with_data_source_error() {
    let source = PgMetricsSource::new(unreachable_config().lazy_pool().unwrap());
    let err = source.total_payments().await.unwrap_err();
    assert!(matches!(err, hub_core::HubError::DataSource(_)), "{err}");
}

#[tokio::test]
async fn aggregation_degrades_to_last_known_snapshot() {
    let initial = Snapshot::initial(Utc::now());
    let shared = SharedSnapshot::new(initial.clone());
    let source = PgMetricsSource::new(unreachable_config().lazy_pool().unwrap());
    let aggregator = Aggregator::new(Arc::new(source), shared.clone())
        .with_query_timeout(Some(Duration::from_secs(5)));

    let result = aggregator.fetch_snapshot().await;

    assert!(result.is_stale());
    assert_eq!(result.into_snapshot(), initial);
    assert_eq!(shared.current().await, initial);
}
