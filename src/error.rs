//! Error handling module
//!
//! Centralized error type for the public hit counting API.

use crate::domain::{DomainError, PeriodError};
use crate::store::StoreError;

/// Library-wide Result type
pub type HitCountResult<T> = Result<T, HitCountError>;

/// Errors surfaced to callers of the stores and the hit counter.
///
/// Blacklisted and duplicate views are not errors; they come back as
/// rejected outcomes.
#[derive(Debug, thiserror::Error)]
pub enum HitCountError {
    /// Missing fields or malformed arguments
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Missing records and database failures
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HitCountError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Domain(DomainError::Validation(msg.into()))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Domain(DomainError::Validation(_)))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::Domain(DomainError::InvalidArgument(_)))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_not_found())
    }
}

impl From<PeriodError> for HitCountError {
    fn from(err: PeriodError) -> Self {
        Self::Domain(err.into())
    }
}

impl From<sqlx::Error> for HitCountError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(StoreError::Database(err))
    }
}
