//! Projector configuration, read from the environment.

use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

/// Settings for the projector process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectorConfig {
    /// `PostgreSQL` connection string (`DATABASE_URL`, required).
    pub database_url: String,
    /// Checkpoint key (`PROJECTION_NAME`).
    pub projection_name: String,
    /// Events per `read_all` page (`PROJECTION_BATCH_SIZE`).
    pub batch_size: usize,
    /// Pause between catch-up runs (`PROJECTION_POLL_INTERVAL_MS`).
    pub poll_interval: Duration,
    /// Upper bound for one catch-up run and for acquiring a connection
    /// (`STORE_TIMEOUT_MS`).
    pub store_timeout: Duration,
    /// Pool size (`DATABASE_MAX_CONNECTIONS`).
    pub max_connections: u32,
}

impl ProjectorConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is unset or a numeric
    /// setting does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ProjectorConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("DATABASE_URL environment variable must be set".into())
            })?;
        let projection_name = lookup("PROJECTION_NAME")
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "room_directory".to_owned());

        let batch_size: usize = parse_or(&lookup, "PROJECTION_BATCH_SIZE", 100)?;
        if batch_size == 0 {
            return Err(AppError::Config(
                "PROJECTION_BATCH_SIZE must be at least 1".into(),
            ));
        }
        let max_connections: u32 = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;
        if max_connections == 0 {
            return Err(AppError::Config(
                "DATABASE_MAX_CONNECTIONS must be at least 1".into(),
            ));
        }

        Ok(Self {
            database_url,
            projection_name,
            batch_size,
            poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "PROJECTION_POLL_INTERVAL_MS",
                1000,
            )?),
            store_timeout: Duration::from_millis(parse_or(&lookup, "STORE_TIMEOUT_MS", 5000)?),
            max_connections,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} must be a valid number: {e}"))),
    }
}
