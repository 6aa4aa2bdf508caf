use std::time::Duration;

use nq_srs::{MAX_INTERVAL_DAYS, SchedulerConfig};
use serde::Deserialize;

use crate::review::ReviewSettings;

/// Deployment environment, selects the log format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Pretty logs, debug level
    #[default]
    Development,
    /// JSON logs, info level
    Production,
}

impl Environment {
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Server configuration, read from the environment (and `.env` when present)
#[derive(Clone, Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub env: Environment,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Review records live in memory when unset
    #[serde(default)]
    pub database_url: Option<String>,
    /// Pool size
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    /// Comma-separated list of origins
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
    /// Attempts per review operation, at least 1
    #[serde(default = "default_review_max_attempts")]
    pub review_max_attempts: u32,
    /// First backoff after an unavailable store
    #[serde(default = "default_review_retry_base_delay_ms")]
    pub review_retry_base_delay_ms: u64,
    /// Bound on every store call
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    /// Longest interval the scheduler hands out
    #[serde(default = "default_review_max_interval_days")]
    pub review_max_interval_days: i32,
    /// Serve `GET /metrics`
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_allowed_origins() -> String {
    "http://localhost:8080".to_string()
}

fn default_review_max_attempts() -> u32 {
    3
}

fn default_review_retry_base_delay_ms() -> u64 {
    25
}

fn default_store_timeout_ms() -> u64 {
    2000
}

fn default_review_max_interval_days() -> i32 {
    MAX_INTERVAL_DAYS
}

fn default_metrics_enabled() -> bool {
    true
}

impl ApiConfig {
    /// Read `ENV`, `PORT`, `DATABASE_URL` and friends
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// CORS origins, blanks dropped
    pub fn allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn review_settings(&self) -> ReviewSettings {
        ReviewSettings {
            max_attempts: self.review_max_attempts.max(1),
            retry_base_delay: Duration::from_millis(self.review_retry_base_delay_ms),
            store_timeout: Duration::from_millis(self.store_timeout_ms),
            scheduler: SchedulerConfig {
                max_interval_days: self.review_max_interval_days.max(1),
                ..SchedulerConfig::default()
            },
        }
    }
}
