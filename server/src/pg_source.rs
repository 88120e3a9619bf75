// PostgreSQL-backed metrics source
use async_trait::async_trait;
use hub_core::{AutomationRow, HubError, MetricsSource, TrafficRow};
use sqlx::PgPool;

const TOTAL_PAYMENTS_SQL: &str = "SELECT COALESCE(SUM(amount), 0)::FLOAT8 FROM payments";

const ACTIVE_SUBSCRIBERS_SQL: &str = "SELECT COUNT(*) FROM subscribers WHERE status = 'active'";

const LATEST_TRAFFIC_SQL: &str =
    "SELECT visitors::BIGINT, conversions::BIGINT, social_followers::BIGINT \
     FROM traffic ORDER BY date DESC LIMIT 1";

const RECENT_AUTOMATION_SQL: &str =
    "SELECT session_name, status, tasks_completed::BIGINT, revenue_generated::FLOAT8 \
     FROM automation_logs ORDER BY updated_at DESC LIMIT $1";

type TrafficTuple = (Option<i64>, Option<i64>, Option<i64>);
type AutomationTuple = (Option<String>, Option<String>, Option<i64>, Option<f64>);

/// Reads the four dashboard aggregates from PostgreSQL. Read-only.
#[derive(Clone, Debug)]
pub struct PgMetricsSource {
    pool: PgPool,
}

impl PgMetricsSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(e: sqlx::Error) -> HubError {
    HubError::DataSource(e.to_string())
}

#[async_trait]
impl MetricsSource for PgMetricsSource {
    async fn total_payments(&self) -> hub_core::Result<f64> {
        sqlx::query_scalar::<_, f64>(TOTAL_PAYMENTS_SQL)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn active_subscribers(&self) -> hub_core::Result<i64> {
        sqlx::query_scalar::<_, i64>(ACTIVE_SUBSCRIBERS_SQL)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn latest_traffic(&self) -> hub_core::Result<Option<TrafficRow>> {
        let row = sqlx::query_as::<_, TrafficTuple>(LATEST_TRAFFIC_SQL)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.map(|(visitors, conversions, social_followers)| TrafficRow {
            visitors,
            conversions,
            social_followers,
        }))
    }

    async fn recent_automation(&self, limit: i64) -> hub_core::Result<Vec<AutomationRow>> {
        let rows = sqlx::query_as::<_, AutomationTuple>(RECENT_AUTOMATION_SQL)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .map(
                |(session_name, status, tasks_completed, revenue_generated)| AutomationRow {
                    session_name,
                    status,
                    tasks_completed,
                    revenue_generated,
                },
            )
            .collect())
    }
}
