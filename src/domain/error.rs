//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

use super::PeriodError;

/// Input and argument errors raised before anything touches storage.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Required field missing or over its length limit
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed argument, such as an unusable period
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl DomainError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

impl From<PeriodError> for DomainError {
    fn from(err: PeriodError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}
