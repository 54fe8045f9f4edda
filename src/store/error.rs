//! Store Errors
//!
//! Error types for hit storage operations.

use uuid::Uuid;

/// Errors that can occur in a hit backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No hit count with this id
    #[error("Hit count not found: {0}")]
    HitCountNotFound(Uuid),

    /// No hit with this id
    #[error("Hit not found: {0}")]
    HitNotFound(Uuid),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Check if this error refers to a missing record
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::HitCountNotFound(_) | StoreError::HitNotFound(_)
        )
    }
}
