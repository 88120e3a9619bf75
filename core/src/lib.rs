// Hub Core Library
// Business metrics dashboard: aggregation, shared snapshot, push loop

pub mod aggregator;
pub mod broadcast;
pub mod chat;
pub mod dashboard;
pub mod snapshot;
pub mod source;
pub mod state;
pub mod system;
pub mod telemetry;

// Export core types
pub use aggregator::{Aggregation, Aggregator};
pub use broadcast::{ConnectionId, ConnectionRegistry, PushKind, PushMessage};
pub use snapshot::{
    AutomationSummary, ChannelStatus, CronJob, CronStatus, EmailSummary, LogEntry, LogLevel,
    RevenueSummary, Session, Skill, Snapshot, SystemSummary, TrafficSummary,
};
pub use source::{AutomationRow, MetricsSource, TrafficRow};
pub use state::SharedSnapshot;
pub use system::{RandomMetrics, SystemSample, VolatileMetrics};

use std::time::Duration;

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Data source read timed out after {0:?}")]
    Timeout(Duration),

    #[error("Skill not found: {0}")]
    SkillNotFound(String),

    #[error("Cron job not found: {0}")]
    CronJobNotFound(String),
}

impl HubError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SkillNotFound(_) | Self::CronJobNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
