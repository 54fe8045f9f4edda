//! Hit backend trait
//!
//! The storage boundary shared by the blacklist registry and both stores.
//! Every method is one atomic unit on the backing store: counter changes are
//! arithmetic updates issued to the store, and the pairs that must move
//! together (hit + increment, delete + decrement, purge + adjust) commit or
//! roll back as one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{ContentRef, Hit, HitCount, Visitor, VisitorMatch};

use super::StoreError;

#[async_trait]
pub trait HitBackend: Send + Sync {
    /// Short name used in logs
    fn backend_name(&self) -> &'static str;

    // ---------------------------------------------------------------------
    // Hit counts
    // ---------------------------------------------------------------------

    /// Return the hit count for `content`, creating it with zero hits if absent.
    /// Concurrent first calls for the same content yield one record.
    async fn get_or_create_hit_count(
        &self,
        content: &ContentRef,
        now: DateTime<Utc>,
    ) -> Result<HitCount, StoreError>;

    async fn find_hit_count(&self, content: &ContentRef) -> Result<Option<HitCount>, StoreError>;

    async fn get_hit_count(&self, id: Uuid) -> Result<Option<HitCount>, StoreError>;

    /// `hits = hits + 1`; returns the new total.
    async fn increment_hit_count(&self, id: Uuid, now: DateTime<Utc>) -> Result<i64, StoreError>;

    /// `hits = hits - 1`; returns the new total. No floor is applied.
    async fn decrement_hit_count(&self, id: Uuid, now: DateTime<Utc>) -> Result<i64, StoreError>;

    /// Hit counts ordered by hits, highest first.
    async fn most_viewed(&self, limit: usize) -> Result<Vec<HitCount>, StoreError>;

    // ---------------------------------------------------------------------
    // Hits
    // ---------------------------------------------------------------------

    /// Insert the hit and increment its hit count in one transaction.
    async fn insert_hit(&self, hit: &Hit) -> Result<(), StoreError>;

    /// Delete the hit and decrement its hit count in one transaction.
    async fn delete_hit(&self, id: Uuid, now: DateTime<Utc>) -> Result<Hit, StoreError>;

    async fn get_hit(&self, id: Uuid) -> Result<Option<Hit>, StoreError>;

    /// All hits of a hit count, oldest first.
    async fn hits_for(&self, hit_count_id: Uuid) -> Result<Vec<Hit>, StoreError>;

    /// Hits of a hit count created at or after `since` that belong to `visitor`.
    async fn active_hits(
        &self,
        hit_count_id: Uuid,
        visitor: &Visitor,
        matcher: VisitorMatch,
        since: DateTime<Utc>,
    ) -> Result<Vec<Hit>, StoreError>;

    async fn count_hits_since(
        &self,
        hit_count_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    /// Delete every hit created before `cutoff`, subtracting the purged hits
    /// from their hit counts in the same transaction. Returns hits removed.
    async fn purge_hits_before(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    // ---------------------------------------------------------------------
    // Blacklists
    // ---------------------------------------------------------------------

    async fn is_ip_blacklisted(&self, ip: &str) -> Result<bool, StoreError>;

    async fn is_user_agent_blacklisted(&self, user_agent: &str) -> Result<bool, StoreError>;

    /// Returns false if the entry already existed.
    async fn add_blacklisted_ip(&self, ip: &str) -> Result<bool, StoreError>;

    /// Returns false if there was no such entry.
    async fn remove_blacklisted_ip(&self, ip: &str) -> Result<bool, StoreError>;

    async fn add_blacklisted_user_agent(&self, user_agent: &str) -> Result<bool, StoreError>;

    async fn remove_blacklisted_user_agent(&self, user_agent: &str) -> Result<bool, StoreError>;

    /// Sorted
    async fn blacklisted_ips(&self) -> Result<Vec<String>, StoreError>;

    /// Sorted
    async fn blacklisted_user_agents(&self) -> Result<Vec<String>, StoreError>;
}
