// Read-only data source for dashboard aggregation
//
// The relational store is opaque to the core; implementations live next to the
// driver they use (see the server crate for PostgreSQL).

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Number of automation-log rows feeding the sessions panel
pub const RECENT_AUTOMATION_LIMIT: i64 = 5;

/// Most recent row of the `traffic` table
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficRow {
    pub visitors: Option<i64>,
    pub conversions: Option<i64>,
    pub social_followers: Option<i64>,
}

/// One row of `automation_logs`, newest first
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AutomationRow {
    pub session_name: Option<String>,
    pub status: Option<String>,
    pub tasks_completed: Option<i64>,
    pub revenue_generated: Option<f64>,
}

/// The four reads an aggregation performs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Sum of all payment amounts, 0 when there are none
    async fn total_payments(&self) -> Result<f64>;

    /// Count of subscribers with status `active`
    async fn active_subscribers(&self) -> Result<i64>;

    /// Latest traffic row by date, if any
    async fn latest_traffic(&self) -> Result<Option<TrafficRow>>;

    /// Automation-log rows ordered by `updated_at` descending
    async fn recent_automation(&self, limit: i64) -> Result<Vec<AutomationRow>>;
}
