//! Connection settings and retry policy.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dialect::OracleDialect;
use crate::error::{MigrateError, Result};

/// Worker limit used when neither `maxConn` nor `poolMax` is set.
pub const DEFAULT_PARALLEL_LIMIT: usize = 16;

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1521
}

fn default_database() -> String {
    "XE".to_string()
}

fn default_pool_min() -> u32 {
    1
}

fn default_pool_increment() -> u32 {
    1
}

fn default_pool_timeout() -> u32 {
    60
}

fn default_auto_commit() -> bool {
    true
}

fn default_stmt_cache_size() -> u32 {
    30
}

fn default_queue_timeout() -> u64 {
    900_000
}

/// Oracle data source settings.
///
/// Keys are camelCase, as in a data source JSON file. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleSettings {
    /// Full connect string. `url` and `tns` are accepted as aliases.
    #[serde(default, alias = "url", alias = "tns")]
    pub connect_string: Option<String>,
    /// Host, used when no connect string is given.
    #[serde(default = "default_host", alias = "hostname")]
    pub host: String,
    /// Listener port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Service name.
    #[serde(default = "default_database")]
    pub database: String,
    /// Connection user; also the default schema.
    #[serde(default, alias = "username")]
    pub user: Option<String>,
    /// Password.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Minimum pool size.
    #[serde(default = "default_pool_min", alias = "minConn")]
    pub pool_min: u32,
    /// Maximum pool size.
    #[serde(default)]
    pub pool_max: Option<u32>,
    /// Pool growth step.
    #[serde(default = "default_pool_increment", alias = "incrConn")]
    pub pool_increment: u32,
    /// Idle timeout in seconds.
    #[serde(default = "default_pool_timeout", alias = "timeout")]
    pub pool_timeout: u32,
    /// Connection cap; also bounds parallel reconciliation.
    #[serde(default)]
    pub max_conn: Option<u32>,
    /// Whether statements autocommit.
    #[serde(default = "default_auto_commit", alias = "isAutoCommit")]
    pub auto_commit: bool,
    /// Statement cache size.
    #[serde(default = "default_stmt_cache_size")]
    pub stmt_cache_size: u32,
    /// Pool queue timeout in milliseconds.
    #[serde(default = "default_queue_timeout")]
    pub queue_timeout: u64,
    /// Enables debug logging.
    #[serde(default)]
    pub debug: bool,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            connect_string: None,
            host: default_host(),
            port: default_port(),
            database: default_database(),
            user: None,
            password: None,
            pool_min: default_pool_min(),
            pool_max: None,
            pool_increment: default_pool_increment(),
            pool_timeout: default_pool_timeout(),
            max_conn: None,
            auto_commit: default_auto_commit(),
            stmt_cache_size: default_stmt_cache_size(),
            queue_timeout: default_queue_timeout(),
            debug: false,
        }
    }
}

impl OracleSettings {
    /// Parses settings from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads settings from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| MigrateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Returns the connect string, building `//host:port/database` when none
    /// was given.
    #[must_use]
    pub fn connect_string(&self) -> String {
        match self.connect_string.as_deref() {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => format!("//{}:{}/{}", self.host, self.port, self.database),
        }
    }

    /// Returns the effective maximum pool size.
    #[must_use]
    pub fn pool_max(&self) -> u32 {
        self.pool_max.or(self.max_conn).unwrap_or(10)
    }

    /// Returns how many models may be reconciled at once.
    #[must_use]
    pub fn parallel_limit(&self) -> usize {
        self.max_conn
            .or(self.pool_max)
            .map_or(DEFAULT_PARALLEL_LIMIT, |n| n.max(1) as usize)
    }

    /// Returns the dialect for the configured user.
    #[must_use]
    pub fn dialect(&self) -> OracleDialect {
        match &self.user {
            Some(user) => OracleDialect::new().with_user(user),
            None => OracleDialect::new(),
        }
    }
}

/// Retry policy for DDL refused with "resource busy".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay unit; retry `n` waits `base_delay * n^2`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without waiting.
    #[must_use]
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
        }
    }

    /// Returns the delay before retry `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.saturating_mul(attempt))
    }
}
