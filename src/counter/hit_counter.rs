//! Hit Counter
//!
//! Decides whether a view counts and records it.

use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::blacklist::BlacklistRegistry;
use crate::clock::{Clock, SystemClock};
use crate::config::HitCounterConfig;
use crate::domain::{ContentRef, Hit, NewHit, Period, Visitor};
use crate::error::HitCountResult;
use crate::hit_counts::HitCountStore;
use crate::hits::HitStore;
use crate::store::{HitBackend, MemoryHitBackend, PgHitBackend};

use super::{Rejection, ViewOutcome, ViewRequest};

/// Entry point for counting views
#[derive(Clone)]
pub struct HitCounter {
    config: HitCounterConfig,
    blacklist: BlacklistRegistry,
    hits: HitStore,
    hit_counts: HitCountStore,
}

impl HitCounter {
    pub fn new(
        backend: Arc<dyn HitBackend>,
        clock: Arc<dyn Clock>,
        config: HitCounterConfig,
    ) -> Self {
        Self {
            config,
            blacklist: BlacklistRegistry::new(backend.clone()),
            hits: HitStore::new(backend.clone(), clock.clone()),
            hit_counts: HitCountStore::new(backend, clock),
        }
    }

    /// Counter backed by PostgreSQL and the system clock
    pub fn postgres(pool: PgPool, config: HitCounterConfig) -> Self {
        Self::new(
            Arc::new(PgHitBackend::new(pool)),
            Arc::new(SystemClock::new()),
            config,
        )
    }

    /// Counter backed by process memory and the system clock
    pub fn in_memory(config: HitCounterConfig) -> Self {
        Self::new(
            Arc::new(MemoryHitBackend::new()),
            Arc::new(SystemClock::new()),
            config,
        )
    }

    pub fn config(&self) -> &HitCounterConfig {
        &self.config
    }

    pub fn blacklist(&self) -> &BlacklistRegistry {
        &self.blacklist
    }

    pub fn hits(&self) -> &HitStore {
        &self.hits
    }

    pub fn hit_counts(&self) -> &HitCountStore {
        &self.hit_counts
    }

    /// Register one view.
    ///
    /// Blacklisted and repeat views come back as `ViewOutcome::Rejected`
    /// without touching the counter. The hit count for the content is only
    /// created once a view is accepted.
    ///
    /// # Errors
    /// - Validation error for an empty content reference or a malformed visitor
    /// - Storage errors
    pub async fn register_view(&self, request: ViewRequest) -> HitCountResult<ViewOutcome> {
        request.validate()?;
        let ViewRequest { content, visitor } = request;

        if let Some(rejection) = self.rejection_for(&content, &visitor).await? {
            tracing::debug!(
                content = %content,
                ip = %visitor.ip,
                reason = rejection.as_str(),
                "View rejected"
            );
            return Ok(ViewOutcome::Rejected(rejection));
        }

        let hit_count = self.hit_counts.get_or_create(&content).await?;
        let hit = self.hits.insert(NewHit::new(hit_count.id, visitor)).await?;
        let hit_count = self.hit_counts.get(hit_count.id).await?;

        tracing::debug!(
            content = %content,
            hit_id = %hit.id,
            hits = hit_count.hits,
            "View counted"
        );

        Ok(ViewOutcome::Accepted { hit, hit_count })
    }

    /// Blacklist first, then the active-hit check against an existing count.
    async fn rejection_for(
        &self,
        content: &ContentRef,
        visitor: &Visitor,
    ) -> HitCountResult<Option<Rejection>> {
        if self.blacklist.is_ip_blacklisted(&visitor.ip).await? {
            return Ok(Some(Rejection::BlacklistedIp));
        }
        if self.blacklist.is_user_agent_blacklisted(&visitor.user_agent).await? {
            return Ok(Some(Rejection::BlacklistedUserAgent));
        }

        let Some(existing) = self.hit_counts.find(content).await? else {
            return Ok(None);
        };
        let active = self
            .hits
            .active_hits_for(
                existing.id,
                visitor,
                self.config.visitor_match,
                self.config.keep_hit_active,
            )
            .await?;

        Ok(active.first().map(|hit| Rejection::Duplicate {
            active_hit_id: hit.id,
        }))
    }

    /// Delete a hit, taking it off its counter.
    pub async fn remove_hit(&self, hit_id: Uuid) -> HitCountResult<Hit> {
        self.hits.delete(hit_id).await
    }

    /// Delete every hit older than `retention`.
    pub async fn purge(&self, retention: Period) -> HitCountResult<u64> {
        self.hits.purge_older_than(retention).await
    }
}
