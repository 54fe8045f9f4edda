//! Hit Store
//!
//! Records, filters, counts and deletes hits.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::Clock;
use crate::domain::{Hit, NewHit, Period, Visitor, VisitorMatch};
use crate::error::HitCountResult;
use crate::store::{HitBackend, StoreError};

/// Store for individual hits
#[derive(Clone)]
pub struct HitStore {
    backend: Arc<dyn HitBackend>,
    clock: Arc<dyn Clock>,
}

impl HitStore {
    pub fn new(backend: Arc<dyn HitBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// Record a hit and increment its hit count.
    ///
    /// The hit is stamped with the current time; hits are never saved again,
    /// so the increment happens exactly once per hit.
    pub async fn insert(&self, new_hit: NewHit) -> HitCountResult<Hit> {
        new_hit.validate()?;

        let hit = new_hit.into_hit(self.clock.now());
        self.backend.insert_hit(&hit).await?;

        tracing::debug!(
            hit_id = %hit.id,
            hit_count_id = %hit.hit_count_id,
            "Hit recorded"
        );

        Ok(hit)
    }

    /// Hits of `hit_count_id` from `visitor` created within the last `active_window`.
    pub async fn active_hits_for(
        &self,
        hit_count_id: Uuid,
        visitor: &Visitor,
        matcher: VisitorMatch,
        active_window: Period,
    ) -> HitCountResult<Vec<Hit>> {
        self.ensure_hit_count(hit_count_id).await?;
        let since = active_window.since(self.clock.now());
        Ok(self
            .backend
            .active_hits(hit_count_id, visitor, matcher, since)
            .await?)
    }

    /// Number of hits of `hit_count_id` created within the last `period`.
    pub async fn count_in_window(&self, hit_count_id: Uuid, period: Period) -> HitCountResult<i64> {
        self.ensure_hit_count(hit_count_id).await?;
        let since = period.since(self.clock.now());
        Ok(self.backend.count_hits_since(hit_count_id, since).await?)
    }

    /// Delete a hit and decrement its hit count.
    pub async fn delete(&self, hit_id: Uuid) -> HitCountResult<Hit> {
        let hit = self.backend.delete_hit(hit_id, self.clock.now()).await?;

        tracing::debug!(
            hit_id = %hit.id,
            hit_count_id = %hit.hit_count_id,
            "Hit deleted"
        );

        Ok(hit)
    }

    pub async fn get(&self, hit_id: Uuid) -> HitCountResult<Hit> {
        let hit = self.backend.get_hit(hit_id).await?;
        Ok(hit.ok_or(StoreError::HitNotFound(hit_id))?)
    }

    /// Every stored hit of a hit count, oldest first.
    pub async fn hits_for(&self, hit_count_id: Uuid) -> HitCountResult<Vec<Hit>> {
        self.ensure_hit_count(hit_count_id).await?;
        Ok(self.backend.hits_for(hit_count_id).await?)
    }

    /// Delete all hits older than `retention`, decrementing their hit counts.
    pub async fn purge_older_than(&self, retention: Period) -> HitCountResult<u64> {
        let now = self.clock.now();
        let cutoff = retention.since(now);
        let purged = self.backend.purge_hits_before(cutoff, now).await?;

        tracing::info!(
            purged = purged,
            cutoff = %cutoff,
            backend = self.backend.backend_name(),
            "Purged expired hits"
        );

        Ok(purged)
    }

    /// Current time on this store's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    async fn ensure_hit_count(&self, hit_count_id: Uuid) -> HitCountResult<()> {
        match self.backend.get_hit_count(hit_count_id).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::HitCountNotFound(hit_count_id).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::domain::ContentRef;
    use crate::store::MemoryHitBackend;
    use chrono::{Duration, TimeZone, Utc};

    struct Fixture {
        backend: Arc<MemoryHitBackend>,
        clock: MockClock,
        store: HitStore,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(MemoryHitBackend::new());
        let clock = MockClock::new(Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap());
        let store = HitStore::new(backend.clone(), Arc::new(clock.clone()));
        Fixture {
            backend,
            clock,
            store,
        }
    }

    async fn hit_count_id(fixture: &Fixture) -> Uuid {
        fixture
            .backend
            .get_or_create_hit_count(&ContentRef::new("blog.post", 1), fixture.clock.now())
            .await
            .unwrap()
            .id
    }

    fn visitor(session: &str) -> Visitor {
        Visitor::new("10.0.0.1", session, "Mozilla/5.0")
    }

    #[tokio::test]
    async fn test_insert_stamps_created_and_increments() {
        let fixture = fixture();
        let id = hit_count_id(&fixture).await;

        let hit = fixture.store.insert(NewHit::new(id, visitor("abc"))).await.unwrap();

        assert_eq!(hit.created, fixture.clock.now());
        assert_eq!(fixture.store.get(hit.id).await.unwrap(), hit);
        let hit_count = fixture.backend.get_hit_count(id).await.unwrap().unwrap();
        assert_eq!(hit_count.hits, 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_hits() {
        let fixture = fixture();
        let id = hit_count_id(&fixture).await;

        let err = fixture
            .store
            .insert(NewHit::new(Uuid::nil(), visitor("abc")))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = fixture
            .store
            .insert(NewHit::new(id, Visitor::new("", "abc", "ua")))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = fixture
            .store
            .insert(NewHit::new(Uuid::new_v4(), visitor("abc")))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(fixture.backend.get_hit_count(id).await.unwrap().unwrap().hits, 0);
    }

    #[tokio::test]
    async fn test_count_in_window() {
        let fixture = fixture();
        let id = hit_count_id(&fixture).await;

        // t-10d
        fixture.clock.advance(Duration::days(-10));
        fixture.store.insert(NewHit::new(id, visitor("a"))).await.unwrap();
        // t-1d
        fixture.clock.advance(Duration::days(9));
        fixture.store.insert(NewHit::new(id, visitor("b"))).await.unwrap();
        // t
        fixture.clock.advance(Duration::days(1));

        let week = Period::days(7).unwrap();
        assert_eq!(fixture.store.count_in_window(id, week).await.unwrap(), 1);
        assert_eq!(fixture.store.count_in_window(id, Period::weeks(2).unwrap()).await.unwrap(), 2);
        assert_eq!(fixture.store.count_in_window(id, Period::hours(1).unwrap()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_active_hits_expire() {
        let fixture = fixture();
        let id = hit_count_id(&fixture).await;
        let week = Period::WEEK;

        let hit = fixture.store.insert(NewHit::new(id, visitor("abc"))).await.unwrap();

        fixture.clock.advance(Duration::days(6));
        let active = fixture
            .store
            .active_hits_for(id, &visitor("abc"), VisitorMatch::Session, week)
            .await
            .unwrap();
        assert_eq!(active, vec![hit]);

        fixture.clock.advance(Duration::days(2));
        let active = fixture
            .store
            .active_hits_for(id, &visitor("abc"), VisitorMatch::Session, week)
            .await
            .unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn test_delete_decrements_once() {
        let fixture = fixture();
        let id = hit_count_id(&fixture).await;

        let first = fixture.store.insert(NewHit::new(id, visitor("a"))).await.unwrap();
        fixture.store.insert(NewHit::new(id, visitor("b"))).await.unwrap();

        fixture.store.delete(first.id).await.unwrap();
        assert_eq!(fixture.backend.get_hit_count(id).await.unwrap().unwrap().hits, 1);

        // a second delete of the same hit is a not-found, not a second decrement
        let err = fixture.store.delete(first.id).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(fixture.backend.get_hit_count(id).await.unwrap().unwrap().hits, 1);
        assert_eq!(fixture.store.hits_for(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_queries_on_missing_hit_count_are_not_found() {
        let fixture = fixture();
        let missing = Uuid::new_v4();

        let err = fixture
            .store
            .active_hits_for(missing, &visitor("abc"), VisitorMatch::Session, Period::WEEK)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = fixture.store.count_in_window(missing, Period::WEEK).await.unwrap_err();
        assert!(err.is_not_found());

        let err = fixture.store.hits_for(missing).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_queries_on_empty_hit_count() {
        let fixture = fixture();
        let id = hit_count_id(&fixture).await;

        assert_eq!(fixture.store.count_in_window(id, Period::WEEK).await.unwrap(), 0);
        assert!(fixture.store.hits_for(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_older_than() {
        let fixture = fixture();
        let id = hit_count_id(&fixture).await;

        fixture.store.insert(NewHit::new(id, visitor("a"))).await.unwrap();
        fixture.clock.advance(Duration::days(50));
        fixture.store.insert(NewHit::new(id, visitor("b"))).await.unwrap();

        let purged = fixture.store.purge_older_than(Period::days(45).unwrap()).await.unwrap();
        assert_eq!(purged, 1);
        assert_eq!(fixture.backend.get_hit_count(id).await.unwrap().unwrap().hits, 1);
    }
}
