use std::time::Duration;

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub database_url: String,
    /// Pool size (default: `5`).
    pub max_connections: u32,
    /// Days a row stays soft-deleted before it is purged (default: `30`).
    pub retention_days: i64,
    /// Seconds between purge runs (default: `3600`).
    pub interval_secs: u64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_RETENTION_DAYS: i64 = 30;
pub const DEFAULT_INTERVAL_SECS: u64 = 3600;

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default  |
    /// |------------------------|----------|
    /// | `DATABASE_URL`         | required |
    /// | `DB_MAX_CONNECTIONS`   | `5`      |
    /// | `PURGE_RETENTION_DAYS` | `30`     |
    /// | `PURGE_INTERVAL_SECS`  | `3600`   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let max_connections: u32 = parse_or(
            &lookup,
            "DB_MAX_CONNECTIONS",
            "a positive integer",
            DEFAULT_MAX_CONNECTIONS,
        )?;
        if max_connections == 0 {
            return Err(invalid("DB_MAX_CONNECTIONS", "a positive integer", "0"));
        }

        let retention_days: i64 = parse_or(
            &lookup,
            "PURGE_RETENTION_DAYS",
            "a non-negative integer",
            DEFAULT_RETENTION_DAYS,
        )?;
        if retention_days < 0 {
            return Err(invalid(
                "PURGE_RETENTION_DAYS",
                "a non-negative integer",
                &retention_days.to_string(),
            ));
        }

        let interval_secs: u64 = parse_or(
            &lookup,
            "PURGE_INTERVAL_SECS",
            "a positive integer",
            DEFAULT_INTERVAL_SECS,
        )?;
        if interval_secs == 0 {
            return Err(invalid("PURGE_INTERVAL_SECS", "a positive integer", "0"));
        }

        Ok(Self {
            database_url,
            max_connections,
            retention_days,
            interval_secs,
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| invalid(name, expected, &raw)),
        None => Ok(default),
    }
}

fn invalid(name: &'static str, expected: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        expected,
        value: value.to_string(),
    }
}
