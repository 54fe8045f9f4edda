//! Hit Count Store
//!
//! Running totals per content object.

use std::sync::Arc;
use uuid::Uuid;

use crate::clock::Clock;
use crate::domain::{ContentRef, HitCount, Period};
use crate::error::HitCountResult;
use crate::hits::HitStore;
use crate::store::{HitBackend, StoreError};

/// Store for per-object hit totals
#[derive(Clone)]
pub struct HitCountStore {
    backend: Arc<dyn HitBackend>,
    clock: Arc<dyn Clock>,
    hits: HitStore,
}

impl HitCountStore {
    pub fn new(backend: Arc<dyn HitBackend>, clock: Arc<dyn Clock>) -> Self {
        let hits = HitStore::new(backend.clone(), clock.clone());
        Self {
            backend,
            clock,
            hits,
        }
    }

    /// Fetch the hit count for `content`, creating an empty one on first use.
    pub async fn get_or_create(&self, content: &ContentRef) -> HitCountResult<HitCount> {
        content.validate()?;
        Ok(self
            .backend
            .get_or_create_hit_count(content, self.clock.now())
            .await?)
    }

    /// Look up without creating.
    pub async fn find(&self, content: &ContentRef) -> HitCountResult<Option<HitCount>> {
        content.validate()?;
        Ok(self.backend.find_hit_count(content).await?)
    }

    pub async fn get(&self, id: Uuid) -> HitCountResult<HitCount> {
        let hit_count = self.backend.get_hit_count(id).await?;
        Ok(hit_count.ok_or(StoreError::HitCountNotFound(id))?)
    }

    /// Add one hit; returns the new total.
    pub async fn increment(&self, id: Uuid) -> HitCountResult<i64> {
        Ok(self.backend.increment_hit_count(id, self.clock.now()).await?)
    }

    /// Remove one hit; returns the new total.
    ///
    /// No floor is applied, so this must only follow a matching increment.
    pub async fn decrement(&self, id: Uuid) -> HitCountResult<i64> {
        let hits = self.backend.decrement_hit_count(id, self.clock.now()).await?;
        if hits < 0 {
            tracing::warn!(hit_count_id = %id, hits = hits, "Hit count went negative");
        }
        Ok(hits)
    }

    /// Hits recorded within the last `period`.
    ///
    /// Counted from the hit log, so the result only covers hits that have not
    /// been purged yet: with a 45 day retention, asking for 60 days returns
    /// the last 45 days' worth.
    pub async fn hits_in_last(&self, id: Uuid, period: Period) -> HitCountResult<i64> {
        self.hits.count_in_window(id, period).await
    }

    /// Hit counts with the most hits first.
    pub async fn most_viewed(&self, limit: usize) -> HitCountResult<Vec<HitCount>> {
        Ok(self.backend.most_viewed(limit).await?)
    }
}
