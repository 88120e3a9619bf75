// Dashboard module - HTTP API, push WebSocket and static entry page

mod api;
mod static_assets;

pub use api::{ApiError, DashboardServer};

use std::time::Duration;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_PUSH_INTERVAL_SECS: u64 = 10;
const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5000;

/// Dashboard configuration
#[derive(Clone, Debug)]
pub struct DashboardConfig {
    pub port: u16,
    pub host: String,
    /// Time between push ticks for each connected client
    pub push_interval: Duration,
    /// Upper bound on one aggregation's reads; `None` waits indefinitely
    pub query_timeout: Option<Duration>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: "0.0.0.0".to_string(),
            push_interval: Duration::from_secs(DEFAULT_PUSH_INTERVAL_SECS),
            query_timeout: Some(Duration::from_millis(DEFAULT_QUERY_TIMEOUT_MS)),
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("HUB_PORT")
            .or_else(|| lookup("PORT"))
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let host = lookup("HUB_HOST")
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let push_secs = lookup("HUB_PUSH_INTERVAL_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_PUSH_INTERVAL_SECS);
        let timeout_ms = lookup("HUB_QUERY_TIMEOUT_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_QUERY_TIMEOUT_MS);

        Self {
            port,
            host,
            push_interval: Duration::from_secs(push_secs),
            query_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
