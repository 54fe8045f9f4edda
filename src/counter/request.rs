//! View requests and outcomes
//!
//! What the request layer hands to the counter and what it gets back.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{ContentRef, DomainError, Hit, HitCount, Visitor};

/// A single page view to be counted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRequest {
    pub content: ContentRef,
    pub visitor: Visitor,
}

impl ViewRequest {
    pub fn new(content: ContentRef, visitor: Visitor) -> Self {
        Self { content, visitor }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        self.content.validate()?;
        self.visitor.validate()
    }
}

/// Why a view was not counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    BlacklistedIp,
    BlacklistedUserAgent,
    /// The visitor already has an active hit on this content
    Duplicate { active_hit_id: Uuid },
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::BlacklistedIp => "blacklisted_ip",
            Rejection::BlacklistedUserAgent => "blacklisted_user_agent",
            Rejection::Duplicate { .. } => "duplicate",
        }
    }
}

/// Result of registering a view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOutcome {
    /// Hit recorded; `hit_count` carries the updated total
    Accepted { hit: Hit, hit_count: HitCount },
    Rejected(Rejection),
}

impl ViewOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ViewOutcome::Accepted { .. })
    }

    pub fn hit(&self) -> Option<&Hit> {
        match self {
            ViewOutcome::Accepted { hit, .. } => Some(hit),
            ViewOutcome::Rejected(_) => None,
        }
    }

    pub fn hit_count(&self) -> Option<&HitCount> {
        match self {
            ViewOutcome::Accepted { hit_count, .. } => Some(hit_count),
            ViewOutcome::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            ViewOutcome::Accepted { .. } => None,
            ViewOutcome::Rejected(rejection) => Some(*rejection),
        }
    }
}
