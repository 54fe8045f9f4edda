//! Hit records
//!
//! `HitCount` is the running total for one content object; `Hit` is a single
//! recorded view belonging to exactly one `HitCount`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ContentRef, DomainError, Visitor};

/// Running hit total for one content object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitCount {
    pub id: Uuid,
    /// Number of live hits; kept in step with the hit log by the stores
    pub hits: i64,
    /// Last write to this record
    pub modified: DateTime<Utc>,
    pub content: ContentRef,
}

impl HitCount {
    /// A fresh record with no hits.
    pub fn new(content: ContentRef, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            hits: 0,
            modified: now,
            content,
        }
    }
}

/// A single recorded view.
///
/// Hits are never updated once inserted; `created` is the insertion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    pub id: Uuid,
    pub created: DateTime<Utc>,
    pub visitor: Visitor,
    pub hit_count_id: Uuid,
}

/// A view about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHit {
    pub hit_count_id: Uuid,
    pub visitor: Visitor,
}

impl NewHit {
    pub fn new(hit_count_id: Uuid, visitor: Visitor) -> Self {
        Self {
            hit_count_id,
            visitor,
        }
    }

    /// The owning hit count and the visitor identifiers are required.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.hit_count_id.is_nil() {
            return Err(DomainError::Validation(
                "hit is missing its hit count".to_string(),
            ));
        }
        self.visitor.validate()
    }

    /// Stamp the hit with its id and creation time.
    pub fn into_hit(self, created: DateTime<Utc>) -> Hit {
        Hit {
            id: Uuid::new_v4(),
            created,
            visitor: self.visitor,
            hit_count_id: self.hit_count_id,
        }
    }
}
