// Snapshot aggregation
//
// Rebuilds the snapshot from the data source. Any failed read abandons the
// whole aggregation and the last known snapshot is served instead.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::snapshot::{
    AutomationSummary, EmailSummary, RevenueSummary, Session, Snapshot, SystemSummary,
    TrafficSummary,
};
use crate::source::{AutomationRow, MetricsSource, TrafficRow, RECENT_AUTOMATION_LIMIT};
use crate::state::SharedSnapshot;
use crate::{HubError, Result};

/// Outcome of one aggregation. Both variants carry the same wire shape.
#[derive(Clone, Debug, PartialEq)]
pub enum Aggregation {
    /// Built from the data source and installed as the shared snapshot
    Fresh(Snapshot),
    /// Data source failed; copy of the previous shared snapshot
    Stale(Snapshot),
}

impl Aggregation {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }

    pub fn snapshot(&self) -> &Snapshot {
        match self {
            Self::Fresh(s) | Self::Stale(s) => s,
        }
    }

    pub fn into_snapshot(self) -> Snapshot {
        match self {
            Self::Fresh(s) | Self::Stale(s) => s,
        }
    }
}

/// Raw results of the four reads
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceReads {
    pub total_payments: f64,
    pub active_subscribers: i64,
    pub traffic: Option<TrafficRow>,
    pub automation: Vec<AutomationRow>,
}

pub struct Aggregator {
    source: Arc<dyn MetricsSource>,
    snapshot: SharedSnapshot,
    started_at: Instant,
    query_timeout: Option<Duration>,
}

impl Aggregator {
    pub fn new(source: Arc<dyn MetricsSource>, snapshot: SharedSnapshot) -> Self {
        Self {
            source,
            snapshot,
            started_at: Instant::now(),
            query_timeout: None,
        }
    }

    /// Bound the four reads together; `None` waits indefinitely.
    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Aggregate a new snapshot, falling back to the last known one on failure.
    pub async fn fetch_snapshot(&self) -> Aggregation {
        match self.read_source().await {
            Ok(reads) => {
                let uptime = self.started_at.elapsed().as_secs_f64();
                let fresh = self
                    .snapshot
                    .update(|current| {
                        let fresh = build_snapshot(reads, current, uptime);
                        *current = fresh.clone();
                        fresh
                    })
                    .await;
                debug!(
                    target: "dashboard",
                    total = fresh.revenue.total,
                    sessions = fresh.sessions.len(),
                    "Snapshot aggregated"
                );
                Aggregation::Fresh(fresh)
            }
            Err(e) => {
                warn!(
                    target: "dashboard",
                    error = %e,
                    "Aggregation failed, serving last known snapshot"
                );
                Aggregation::Stale(self.snapshot.current().await)
            }
        }
    }

    async fn read_source(&self) -> Result<SourceReads> {
        let reads = async {
            let (total_payments, active_subscribers, traffic, automation) = tokio::try_join!(
                self.source.total_payments(),
                self.source.active_subscribers(),
                self.source.latest_traffic(),
                self.source.recent_automation(RECENT_AUTOMATION_LIMIT),
            )?;
            Ok(SourceReads {
                total_payments,
                active_subscribers,
                traffic,
                automation,
            })
        };

        match self.query_timeout {
            Some(limit) => tokio::time::timeout(limit, reads)
                .await
                .map_err(|_| HubError::Timeout(limit))?,
            None => reads.await,
        }
    }
}

/// Derive a snapshot from source reads.
///
/// Fields with no backing table (cron jobs, skills, logs, channels and the
/// simulated system gauges) are carried over from `current`.
pub fn build_snapshot(reads: SourceReads, current: &Snapshot, uptime_secs: f64) -> Snapshot {
    let traffic = reads.traffic.unwrap_or_default();

    Snapshot {
        revenue: RevenueSummary::from_total(reads.total_payments, reads.active_subscribers),
        emails: EmailSummary::for_list(reads.active_subscribers),
        traffic: TrafficSummary::from_counts(
            traffic.visitors.unwrap_or(0),
            traffic.conversions.unwrap_or(0),
            traffic.social_followers.unwrap_or(0),
        ),
        automation: summarize_automation(&reads.automation),
        channels: current.channels.clone(),
        system: SystemSummary {
            uptime: uptime_secs,
            ..current.system.clone()
        },
        cron_jobs: current.cron_jobs.clone(),
        skills: current.skills.clone(),
        sessions: sessions_from_rows(&reads.automation),
        logs: current.logs.clone(),
    }
}

pub fn summarize_automation(rows: &[AutomationRow]) -> AutomationSummary {
    let tasks_today = rows.iter().map(|r| r.tasks_completed.unwrap_or(0)).sum();
    let revenue_per_automation = if rows.is_empty() {
        0.0
    } else {
        let total: f64 = rows.iter().map(|r| r.revenue_generated.unwrap_or(0.0)).sum();
        total / rows.len() as f64
    };

    AutomationSummary {
        active_sessions: rows.len(),
        tasks_today,
        revenue_per_automation,
    }
}

/// Session ids are positional (1-based) within this fetch.
pub fn sessions_from_rows(rows: &[AutomationRow]) -> Vec<Session> {
    rows.iter()
        .enumerate()
        .map(|(i, r)| Session {
            id: i + 1,
            name: r.session_name.clone(),
            status: r.status.clone(),
            tasks: r.tasks_completed.unwrap_or(0),
            revenue: r.revenue_generated.unwrap_or(0.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockMetricsSource;
    use chrono::Utc;
    use mockall::predicate::eq;

    fn row(name: &str, tasks: Option<i64>, revenue: Option<f64>) -> AutomationRow {
        AutomationRow {
            session_name: Some(name.to_string()),
            status: Some("running".to_string()),
            tasks_completed: tasks,
            revenue_generated: revenue,
        }
    }

    fn healthy_source() -> MockMetricsSource {
        let mut source = MockMetricsSource::new();
        source.expect_total_payments().returning(|| Ok(1000.0));
        source.expect_active_subscribers().returning(|| Ok(50));
        source.expect_latest_traffic().returning(|| {
            Ok(Some(TrafficRow {
                visitors: Some(200),
                conversions: Some(10),
                social_followers: Some(3000),
            }))
        });
        source
            .expect_recent_automation()
            .with(eq(RECENT_AUTOMATION_LIMIT))
            .returning(|_| {
                Ok(vec![
                    row("Newsletter Bot", Some(12), Some(30.0)),
                    row("API Handler", Some(8), Some(10.0)),
                ])
            });
        source
    }

    #[tokio::test]
    async fn fresh_aggregation_derives_fields() {
        let shared = SharedSnapshot::new(Snapshot::initial(Utc::now()));
        let aggregator = Aggregator::new(Arc::new(healthy_source()), shared.clone());

        let result = aggregator.fetch_snapshot().await;
        assert!(!result.is_stale());

        let snapshot = result.into_snapshot();
        assert_eq!(snapshot.revenue.total, 1000.0);
        assert_eq!(snapshot.revenue.propulse, 500.0);
        assert_eq!(snapshot.revenue.api_sales, 300.0);
        assert_eq!(snapshot.revenue.manual, 200.0);
        assert_eq!(snapshot.revenue.subscribers, 50);
        assert!((snapshot.revenue.mrr - 966.666_666).abs() < 1e-3);
        assert_eq!(snapshot.emails.list_size, 50);
        assert_eq!(snapshot.traffic.conversion_rate, 5.0);
        assert_eq!(snapshot.automation.active_sessions, 2);
        assert_eq!(snapshot.automation.tasks_today, 20);
        assert_eq!(snapshot.automation.revenue_per_automation, 20.0);
        assert_eq!(snapshot.sessions[0].id, 1);
        assert_eq!(snapshot.sessions[1].id, 2);
        assert_eq!(snapshot.sessions[1].name.as_deref(), Some("API Handler"));

        // Installed as the shared snapshot
        assert_eq!(shared.current().await, snapshot);
    }

    #[tokio::test]
    async fn failed_read_returns_previous_snapshot() {
        let initial = Snapshot::initial(Utc::now());
        let shared = SharedSnapshot::new(initial.clone());

        let mut source = MockMetricsSource::new();
        source.expect_total_payments().returning(|| Ok(1000.0));
        source
            .expect_active_subscribers()
            .returning(|| Err(HubError::DataSource("connection refused".into())));
        source.expect_latest_traffic().returning(|| Ok(None));
        source.expect_recent_automation().returning(|_| Ok(vec![]));

        let aggregator = Aggregator::new(Arc::new(source), shared.clone());
        let result = aggregator.fetch_snapshot().await;

        assert!(result.is_stale());
        assert_eq!(result.into_snapshot(), initial);
        assert_eq!(shared.current().await, initial);
    }

    /// Source where only the read at `failing` (0..4, in trait order) errors
    fn source_failing_at(failing: usize) -> MockMetricsSource {
        let err = move || HubError::DataSource(format!("read {failing} refused"));
        let mut source = MockMetricsSource::new();
        source.expect_total_payments().returning(move || match failing {
            0 => Err(err()),
            _ => Ok(1000.0),
        });
        source.expect_active_subscribers().returning(move || match failing {
            1 => Err(err()),
            _ => Ok(50),
        });
        source.expect_latest_traffic().returning(move || match failing {
            2 => Err(err()),
            _ => Ok(None),
        });
        source.expect_recent_automation().returning(move |_| match failing {
            3 => Err(err()),
            _ => Ok(vec![row("Newsletter Bot", Some(1), Some(1.0))]),
        });
        source
    }

    #[tokio::test]
    async fn any_single_failed_read_keeps_prior_snapshot() {
        for failing in 0..4 {
            let mut prior = Snapshot::initial(Utc::now());
            prior.revenue = RevenueSummary::from_total(77.0, 3);
            prior.cron_jobs[0].status = prior.cron_jobs[0].status.toggled();
            let shared = SharedSnapshot::new(prior.clone());

            let aggregator = Aggregator::new(Arc::new(source_failing_at(failing)), shared.clone());
            let result = aggregator.fetch_snapshot().await;

            assert!(result.is_stale(), "read {failing}");
            assert_eq!(result.into_snapshot(), prior, "read {failing}");
            assert_eq!(shared.current().await, prior, "read {failing}");
        }
    }

    #[tokio::test]
    async fn missing_rows_zero_the_derived_fields() {
        let mut source = MockMetricsSource::new();
        source.expect_total_payments().returning(|| Ok(0.0));
        source.expect_active_subscribers().returning(|| Ok(0));
        source.expect_latest_traffic().returning(|| Ok(None));
        source.expect_recent_automation().returning(|_| Ok(vec![]));

        let aggregator = Aggregator::new(Arc::new(source), SharedSnapshot::default());
        let snapshot = aggregator.fetch_snapshot().await.into_snapshot();

        assert_eq!(snapshot.traffic.visitors, 0);
        assert_eq!(snapshot.traffic.conversion_rate, 0.0);
        assert_eq!(snapshot.automation.active_sessions, 0);
        assert_eq!(snapshot.automation.tasks_today, 0);
        assert_eq!(snapshot.automation.revenue_per_automation, 0.0);
        assert!(snapshot.sessions.is_empty());
    }

    #[test]
    fn carries_over_in_memory_sections() {
        let mut current = Snapshot::initial(Utc::now());
        current.system.cpu = 33;
        current.skills[0].enabled = false;

        let built = build_snapshot(SourceReads::default(), &current, 12.5);

        assert_eq!(built.cron_jobs, current.cron_jobs);
        assert_eq!(built.skills, current.skills);
        assert_eq!(built.logs, current.logs);
        assert_eq!(built.channels, current.channels);
        assert_eq!(built.system.cpu, 33);
        assert_eq!(built.system.disk, current.system.disk);
        assert_eq!(built.system.uptime, 12.5);
    }

    #[test]
    fn null_columns_count_as_zero() {
        let rows = vec![row("a", None, None), row("b", Some(4), Some(8.0))];
        let summary = summarize_automation(&rows);
        assert_eq!(summary.tasks_today, 4);
        assert_eq!(summary.revenue_per_automation, 4.0);

        let sessions = sessions_from_rows(&rows);
        assert_eq!(sessions[0].tasks, 0);
        assert_eq!(sessions[0].revenue, 0.0);
    }
}
