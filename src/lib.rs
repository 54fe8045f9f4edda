//! hitcount Library
//!
//! Page view counting with blacklists, visitor deduplication and windowed
//! counts over a PostgreSQL or in-memory store.

pub mod blacklist;
pub mod clock;
pub mod counter;
pub mod domain;
pub mod hit_counts;
pub mod hits;
pub mod jobs;
pub mod store;

pub mod config;
pub mod db;
mod error;

pub use config::{Config, ConfigError, HitCounterConfig};
pub use counter::{HitCounter, Rejection, ViewOutcome, ViewRequest};
pub use domain::{ContentRef, DomainError, Hit, HitCount, Period, PeriodError, Visitor, VisitorMatch};
pub use error::{HitCountError, HitCountResult};
