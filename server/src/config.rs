use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use crate::{Result, ServerError};

/// PostgreSQL connection settings
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    /// Full connection URL; overrides the individual fields when set
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            database: "automation".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        Self {
            url: non_empty("DATABASE_URL"),
            host: non_empty("PG_HOST").unwrap_or(default.host),
            port: non_empty("PG_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(default.port),
            database: non_empty("PG_DATABASE").unwrap_or(default.database),
            user: non_empty("PG_USER").unwrap_or(default.user),
            password: non_empty("PG_PASSWORD").unwrap_or(default.password),
            max_connections: non_empty("PG_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(default.max_connections),
            acquire_timeout: default.acquire_timeout,
        }
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        match &self.url {
            Some(url) => PgConnectOptions::from_str(url)
                .map_err(|e| ServerError::Config(format!("invalid DATABASE_URL: {e}"))),
            None => Ok(PgConnectOptions::new()
                .host(&self.host)
                .port(self.port)
                .database(&self.database)
                .username(&self.user)
                .password(&self.password)),
        }
    }

    /// Pool that opens connections on first use, so startup never waits on the database
    pub fn lazy_pool(&self) -> Result<PgPool> {
        let options = self.connect_options()?;
        Ok(PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect_lazy_with(options))
    }
}
