//! Scheduled Jobs
//!
//! Background jobs for periodic maintenance tasks.
//! The counter never purges its hit log on its own; this scheduler does it on
//! an interval when a retention is configured.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::Config;
use crate::domain::Period;
use crate::error::HitCountError;
use crate::hits::HitStore;

// =========================================================================
// Expired Hit Purge Job
// =========================================================================

/// Delete hits older than `retention`, taking each off its hit count
pub async fn purge_expired_hits(hits: &HitStore, retention: Period) -> Result<u64, JobError> {
    Ok(hits.purge_older_than(retention).await?)
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for the purge job (default: 1 hour)
    pub purge_interval: Duration,
    /// Hits older than this are purged (default: none, job is skipped)
    pub hit_retention: Option<Period>,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            purge_interval: Duration::from_secs(3600),
            hit_retention: None,
        }
    }
}

impl From<&Config> for JobSchedulerConfig {
    fn from(config: &Config) -> Self {
        Self {
            purge_interval: config.purge_interval,
            hit_retention: config.hit_retention,
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    hits: HitStore,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    /// Create a new job scheduler
    pub fn new(hits: HitStore) -> Self {
        Self {
            hits,
            config: JobSchedulerConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(hits: HitStore, config: JobSchedulerConfig) -> Self {
        Self { hits, config }
    }

    pub fn config(&self) -> &JobSchedulerConfig {
        &self.config
    }

    /// Start the job scheduler in the background
    /// Returns a handle that can be used to abort the scheduler
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the scheduler loop
    async fn run(&self) {
        let Some(retention) = self.config.hit_retention else {
            tracing::info!("No hit retention configured, job scheduler idle");
            return;
        };

        tracing::info!(
            interval_secs = self.config.purge_interval.as_secs(),
            retention = %retention,
            "Job scheduler started"
        );

        let mut purge_interval = interval(self.config.purge_interval);
        purge_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            purge_interval.tick().await;
            if let Err(e) = purge_expired_hits(&self.hits, retention).await {
                tracing::error!(error = %e, "Hit purge failed");
            }
        }
    }

    /// Run all maintenance jobs once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        if let Some(retention) = self.config.hit_retention {
            match purge_expired_hits(&self.hits, retention).await {
                Ok(count) => report.hits_purged = count,
                Err(e) => report.errors.push(format!("Hit purge: {}", e)),
            }
        }

        report.completed_at = self.hits.now();
        report
    }
}

/// Report from running maintenance jobs
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub hits_purged: u64,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Hit count error: {0}")]
    HitCount(#[from] HitCountError),
}

// =========================================================================
// Tests
// =========================================================================
