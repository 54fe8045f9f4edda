//! Content reference
//!
//! Identifies the object whose views are counted. The pair is opaque to the
//! core: it is compared and stored, never interpreted.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::DomainError;

/// (content-type, object-id) pair, unique per hit count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentRef {
    pub content_type: String,
    pub object_id: String,
}

impl ContentRef {
    pub fn new(content_type: impl Into<String>, object_id: impl ToString) -> Self {
        Self {
            content_type: content_type.into(),
            object_id: object_id.to_string(),
        }
    }

    /// Both halves of the reference must be present.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.content_type.is_empty() {
            return Err(DomainError::Validation(
                "content reference is missing a content type".to_string(),
            ));
        }
        if self.object_id.is_empty() {
            return Err(DomainError::Validation(
                "content reference is missing an object id".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.content_type, self.object_id)
    }
}
