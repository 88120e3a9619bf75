// Dashboard snapshot model
//
// The single aggregate state object pushed to every viewer. Field names are
// camelCase on the wire to match the browser renderer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const REVENUE_GOAL: f64 = 5000.0;
pub const REVENUE_GROWTH: f64 = 12.5;

const PROPULSE_SHARE: f64 = 0.5;
const API_SALES_SHARE: f64 = 0.3;
const MANUAL_SHARE: f64 = 0.2;

const EMAIL_OPEN_RATE: f64 = 42.3;
const EMAIL_CLICK_RATE: f64 = 8.7;
const EMAIL_GROWTH: f64 = 15.0;

const DEFAULT_DISK_PERCENT: u32 = 62;

/// Complete dashboard state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub revenue: RevenueSummary,
    pub emails: EmailSummary,
    pub traffic: TrafficSummary,
    pub automation: AutomationSummary,
    pub channels: BTreeMap<String, ChannelStatus>,
    pub system: SystemSummary,
    pub cron_jobs: Vec<CronJob>,
    pub skills: Vec<Skill>,
    pub sessions: Vec<Session>,
    /// Newest first
    pub logs: Vec<LogEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueSummary {
    pub total: f64,
    pub propulse: f64,
    pub api_sales: f64,
    pub manual: f64,
    pub subscribers: i64,
    pub mrr: f64,
    pub goal: f64,
    pub growth: f64,
}

impl RevenueSummary {
    /// Derive the channel split and MRR approximation from the payments total.
    ///
    /// The split is always 50/30/20 of `total`; it is never tracked on its own.
    pub fn from_total(total: f64, subscribers: i64) -> Self {
        Self {
            total,
            propulse: total * PROPULSE_SHARE,
            api_sales: total * API_SALES_SHARE,
            manual: total * MANUAL_SHARE,
            subscribers,
            mrr: total / 30.0 * 29.0,
            goal: REVENUE_GOAL,
            growth: REVENUE_GROWTH,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSummary {
    pub list_size: i64,
    pub open_rate: f64,
    pub click_rate: f64,
    pub growth: f64,
}

impl EmailSummary {
    /// Open/click/growth rates are placeholders until a mail provider is wired in.
    pub fn for_list(list_size: i64) -> Self {
        Self {
            list_size,
            open_rate: EMAIL_OPEN_RATE,
            click_rate: EMAIL_CLICK_RATE,
            growth: EMAIL_GROWTH,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSummary {
    pub visitors: i64,
    pub conversions: i64,
    pub conversion_rate: f64,
    pub social_followers: i64,
}

impl TrafficSummary {
    pub fn from_counts(visitors: i64, conversions: i64, social_followers: i64) -> Self {
        Self {
            visitors,
            conversions,
            conversion_rate: conversion_rate(conversions, visitors),
            social_followers,
        }
    }
}

/// Percentage of visitors that converted; 0 when there were no visitors.
pub fn conversion_rate(conversions: i64, visitors: i64) -> f64 {
    if visitors > 0 {
        conversions as f64 / visitors as f64 * 100.0
    } else {
        0.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationSummary {
    pub active_sessions: usize,
    pub tasks_today: i64,
    pub revenue_per_automation: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unread: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queued: Option<u32>,
}

impl ChannelStatus {
    fn connected_with_unread(unread: u32) -> Self {
        Self {
            status: "connected".to_string(),
            unread: Some(unread),
            queued: None,
        }
    }

    fn connected_with_queued(queued: u32) -> Self {
        Self {
            status: "connected".to_string(),
            unread: None,
            queued: Some(queued),
        }
    }
}

/// Messaging channels are simulated; there is no channel backend yet.
pub fn default_channels() -> BTreeMap<String, ChannelStatus> {
    let mut channels = BTreeMap::new();
    channels.insert(
        "telegram".to_string(),
        ChannelStatus::connected_with_unread(5),
    );
    channels.insert(
        "whatsapp".to_string(),
        ChannelStatus::connected_with_unread(0),
    );
    channels.insert("email".to_string(), ChannelStatus::connected_with_queued(12));
    channels
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemSummary {
    pub cpu: u32,
    pub ram: u32,
    /// Seconds
    pub uptime: f64,
    pub disk: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CronStatus {
    Active,
    Paused,
}

impl CronStatus {
    pub fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Paused,
            Self::Paused => Self::Active,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJob {
    pub id: u32,
    pub name: String,
    pub schedule: String,
    pub status: CronStatus,
    /// Epoch milliseconds
    pub last_run: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
}

/// Automation session as shown in the sessions panel.
///
/// `id` is the 1-based position in the most recent query result and is not
/// stable across refreshes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: usize,
    pub name: Option<String>,
    pub status: Option<String>,
    pub tasks: i64,
    pub revenue: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub time: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl Snapshot {
    /// Placeholder state served until the first successful aggregation.
    pub fn initial(now: DateTime<Utc>) -> Self {
        let now_ms = now.timestamp_millis();

        Self {
            revenue: RevenueSummary {
                mrr: 850.0,
                ..RevenueSummary::from_total(4250.0, 247)
            },
            emails: EmailSummary::for_list(1847),
            traffic: TrafficSummary {
                visitors: 4250,
                conversions: 102,
                conversion_rate: 2.4,
                social_followers: 2840,
            },
            automation: AutomationSummary {
                active_sessions: 3,
                tasks_today: 47,
                revenue_per_automation: 1250.0,
            },
            channels: default_channels(),
            system: SystemSummary {
                cpu: 23,
                ram: 45,
                uptime: 86400.0,
                disk: DEFAULT_DISK_PERCENT,
            },
            cron_jobs: vec![
                cron_job(
                    1,
                    "Newsletter Generation",
                    "0 8 * * *",
                    CronStatus::Active,
                    now_ms - 3_600_000,
                ),
                cron_job(
                    2,
                    "Data Sync",
                    "*/15 * * * *",
                    CronStatus::Active,
                    now_ms - 900_000,
                ),
                cron_job(
                    3,
                    "Report Generation",
                    "0 0 * * *",
                    CronStatus::Paused,
                    now_ms - 86_400_000,
                ),
            ],
            skills: vec![
                skill("chat", "Chat Interface", "Talk to Marvin"),
                skill("email", "Email Automation", "Automated email campaigns"),
                skill("newsletter", "Newsletter Gen", "Generate PropPulse newsletters"),
                skill("analytics", "Analytics", "Track metrics and trends"),
                skill("scheduler", "Task Scheduler", "Cron job management"),
                skill("api", "API Sales", "Data API endpoint"),
            ],
            sessions: vec![
                session(1, "Newsletter Bot", 156, 850.0),
                session(2, "API Handler", 892, 425.0),
                session(3, "Social Poster", 45, 0.0),
            ],
            logs: vec![
                log(now, 0, LogLevel::Info, "Newsletter sent to 1,847 subscribers"),
                log(now, 5, LogLevel::Success, "Payment received: $49.00"),
                log(now, 10, LogLevel::Info, "New subscriber: john@example.com"),
                log(now, 15, LogLevel::Warning, "API rate limit approaching"),
                log(now, 20, LogLevel::Error, "Failed to send email to 3 recipients"),
            ],
        }
    }

    pub fn skill(&self, id: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.id == id)
    }

    pub fn cron_job(&self, id: u32) -> Option<&CronJob> {
        self.cron_jobs.iter().find(|j| j.id == id)
    }
}

fn cron_job(id: u32, name: &str, schedule: &str, status: CronStatus, last_run: i64) -> CronJob {
    CronJob {
        id,
        name: name.to_string(),
        schedule: schedule.to_string(),
        status,
        last_run,
    }
}

fn skill(id: &str, name: &str, description: &str) -> Skill {
    Skill {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        enabled: true,
    }
}

fn session(id: usize, name: &str, tasks: i64, revenue: f64) -> Session {
    Session {
        id,
        name: Some(name.to_string()),
        status: Some("running".to_string()),
        tasks,
        revenue,
    }
}

fn log(now: DateTime<Utc>, minutes_ago: i64, level: LogLevel, message: &str) -> LogEntry {
    LogEntry {
        time: now - Duration::minutes(minutes_ago),
        level,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revenue_split_reconstructs_total() {
        for total in [0.0, 0.01, 49.0, 1000.0, 4250.0, 123_456.78] {
            let revenue = RevenueSummary::from_total(total, 0);
            let sum = revenue.propulse + revenue.api_sales + revenue.manual;
            assert!((sum - total).abs() < 1e-6, "total {total} rebuilt as {sum}");
        }
    }

    #[test]
    fn conversion_rate_is_zero_without_visitors() {
        assert_eq!(conversion_rate(0, 0), 0.0);
        assert_eq!(conversion_rate(25, 0), 0.0);
        assert_eq!(conversion_rate(5, -1), 0.0);
        assert!((conversion_rate(102, 4250) - 2.4).abs() < 1e-9);
    }

    #[test]
    fn cron_status_alternates() {
        assert_eq!(CronStatus::Active.toggled(), CronStatus::Paused);
        assert_eq!(CronStatus::Paused.toggled(), CronStatus::Active);
        assert_eq!(CronStatus::Active.toggled().toggled(), CronStatus::Active);
    }

    #[test]
    fn initial_snapshot_ids_are_unique() {
        let snapshot = Snapshot::initial(Utc::now());
        let mut skill_ids: Vec<_> = snapshot.skills.iter().map(|s| s.id.as_str()).collect();
        skill_ids.sort_unstable();
        skill_ids.dedup();
        assert_eq!(skill_ids.len(), snapshot.skills.len());

        let mut cron_ids: Vec<_> = snapshot.cron_jobs.iter().map(|j| j.id).collect();
        cron_ids.sort_unstable();
        cron_ids.dedup();
        assert_eq!(cron_ids.len(), snapshot.cron_jobs.len());
    }

    #[test]
    fn initial_logs_are_newest_first() {
        let snapshot = Snapshot::initial(Utc::now());
        assert!(snapshot
            .logs
            .windows(2)
            .all(|pair| pair[0].time >= pair[1].time));
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(Snapshot::initial(Utc::now())).unwrap();
        assert!(json["revenue"]["apiSales"].is_number());
        assert!(json["emails"]["listSize"].is_number());
        assert!(json["traffic"]["conversionRate"].is_number());
        assert_eq!(json["cronJobs"][2]["status"], "paused");
        assert!(json["cronJobs"][0]["lastRun"].is_i64());
        assert_eq!(json["logs"][3]["level"], "warning");
        assert_eq!(json["channels"]["email"]["queued"], 12);
        assert!(json["channels"]["email"].get("unread").is_none());
    }
}
