//! Configuration module
//!
//! Loads configuration from environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::{Period, VisitorMatch};

/// Rules applied to every incoming view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitCounterConfig {
    /// How long a visitor's hit stays active; repeats inside it are not counted
    pub keep_hit_active: Period,

    /// How a repeat visitor is recognised
    pub visitor_match: VisitorMatch,
}

impl Default for HitCounterConfig {
    fn default() -> Self {
        Self {
            keep_hit_active: Period::WEEK,
            visitor_match: VisitorMatch::Session,
        }
    }
}

impl HitCounterConfig {
    pub fn with_keep_hit_active(mut self, period: Period) -> Self {
        self.keep_hit_active = period;
        self
    }

    pub fn with_visitor_match(mut self, visitor_match: VisitorMatch) -> Self {
        self.visitor_match = visitor_match;
        self
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Environment (development, production)
    pub environment: String,

    /// Dedup rules
    pub counter: HitCounterConfig,

    /// Hits older than this are purged by the job scheduler; never if unset
    pub hit_retention: Option<Period>,

    /// How often the purge job runs
    pub purge_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any name -> value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").ok_or(ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;

        let environment =
            lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let counter = HitCounterConfig {
            keep_hit_active: parse_or(&lookup, "HITCOUNT_KEEP_HIT_ACTIVE", Period::WEEK)?,
            visitor_match: parse_or(&lookup, "HITCOUNT_VISITOR_MATCH", VisitorMatch::Session)?,
        };

        let hit_retention = match lookup("HITCOUNT_HIT_RETENTION") {
            Some(value) => Some(
                value
                    .parse::<Period>()
                    .map_err(|_| ConfigError::InvalidValue("HITCOUNT_HIT_RETENTION"))?,
            ),
            None => None,
        };

        let purge_interval_secs: u64 = parse_or(&lookup, "HITCOUNT_PURGE_INTERVAL_SECS", 3600)?;
        if purge_interval_secs == 0 {
            return Err(ConfigError::InvalidValue("HITCOUNT_PURGE_INTERVAL_SECS"));
        }

        if let Some(retention) = hit_retention {
            if retention < counter.keep_hit_active {
                tracing::warn!(
                    retention = %retention,
                    keep_hit_active = %counter.keep_hit_active,
                    "Hit retention is shorter than the active window; purged hits no longer deduplicate"
                );
            }
        }

        Ok(Self {
            database_url,
            database_max_connections,
            environment,
            counter,
            hit_retention,
            purge_interval: Duration::from_secs(purge_interval_secs),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue(name)),
        None => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
