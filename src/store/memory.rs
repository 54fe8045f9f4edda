//! In-memory backend
//!
//! Keeps every table in one process-local state guarded by a single mutex,
//! so each backend call is atomic with respect to all others. Nothing
//! survives a restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{ContentRef, Hit, HitCount, Visitor, VisitorMatch};

use super::{HitBackend, StoreError};

#[derive(Debug, Default)]
struct MemoryState {
    hit_counts: HashMap<Uuid, HitCount>,
    by_content: HashMap<ContentRef, Uuid>,
    hits: HashMap<Uuid, Hit>,
    blacklisted_ips: BTreeSet<String>,
    blacklisted_user_agents: BTreeSet<String>,
}

impl MemoryState {
    fn adjust_hits(&mut self, id: Uuid, delta: i64, now: DateTime<Utc>) -> Result<i64, StoreError> {
        let hit_count = self
            .hit_counts
            .get_mut(&id)
            .ok_or(StoreError::HitCountNotFound(id))?;
        hit_count.hits += delta;
        hit_count.modified = now;
        Ok(hit_count.hits)
    }

    fn sorted_hits<'a>(&self, hits: impl Iterator<Item = &'a Hit>) -> Vec<Hit> {
        let mut hits: Vec<Hit> = hits.cloned().collect();
        hits.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        hits
    }
}

/// Hit backend held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryHitBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryHitBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HitBackend for MemoryHitBackend {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_or_create_hit_count(
        &self,
        content: &ContentRef,
        now: DateTime<Utc>,
    ) -> Result<HitCount, StoreError> {
        let mut state = self.state.lock();

        if let Some(existing) = state
            .by_content
            .get(content)
            .and_then(|id| state.hit_counts.get(id))
        {
            return Ok(existing.clone());
        }

        let hit_count = HitCount::new(content.clone(), now);
        state.by_content.insert(content.clone(), hit_count.id);
        state.hit_counts.insert(hit_count.id, hit_count.clone());
        Ok(hit_count)
    }

    async fn find_hit_count(&self, content: &ContentRef) -> Result<Option<HitCount>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .by_content
            .get(content)
            .and_then(|id| state.hit_counts.get(id))
            .cloned())
    }

    async fn get_hit_count(&self, id: Uuid) -> Result<Option<HitCount>, StoreError> {
        Ok(self.state.lock().hit_counts.get(&id).cloned())
    }

    async fn increment_hit_count(&self, id: Uuid, now: DateTime<Utc>) -> Result<i64, StoreError> {
        self.state.lock().adjust_hits(id, 1, now)
    }

    async fn decrement_hit_count(&self, id: Uuid, now: DateTime<Utc>) -> Result<i64, StoreError> {
        self.state.lock().adjust_hits(id, -1, now)
    }

    async fn most_viewed(&self, limit: usize) -> Result<Vec<HitCount>, StoreError> {
        let state = self.state.lock();
        let mut hit_counts: Vec<HitCount> = state.hit_counts.values().cloned().collect();
        hit_counts.sort_by(|a, b| b.hits.cmp(&a.hits).then(b.modified.cmp(&a.modified)));
        hit_counts.truncate(limit);
        Ok(hit_counts)
    }

    async fn insert_hit(&self, hit: &Hit) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.adjust_hits(hit.hit_count_id, 1, hit.created)?;
        state.hits.insert(hit.id, hit.clone());
        Ok(())
    }

    async fn delete_hit(&self, id: Uuid, now: DateTime<Utc>) -> Result<Hit, StoreError> {
        let mut state = self.state.lock();

        let hit_count_id = state
            .hits
            .get(&id)
            .map(|hit| hit.hit_count_id)
            .ok_or(StoreError::HitNotFound(id))?;
        let hits = state.adjust_hits(hit_count_id, -1, now)?;
        let hit = state.hits.remove(&id).ok_or(StoreError::HitNotFound(id))?;

        if hits < 0 {
            tracing::warn!(
                hit_count_id = %hit_count_id,
                hits = hits,
                "Hit count went negative after delete"
            );
        }

        Ok(hit)
    }

    async fn get_hit(&self, id: Uuid) -> Result<Option<Hit>, StoreError> {
        Ok(self.state.lock().hits.get(&id).cloned())
    }

    async fn hits_for(&self, hit_count_id: Uuid) -> Result<Vec<Hit>, StoreError> {
        let state = self.state.lock();
        Ok(state.sorted_hits(
            state
                .hits
                .values()
                .filter(|hit| hit.hit_count_id == hit_count_id),
        ))
    }

    async fn active_hits(
        &self,
        hit_count_id: Uuid,
        visitor: &Visitor,
        matcher: VisitorMatch,
        since: DateTime<Utc>,
    ) -> Result<Vec<Hit>, StoreError> {
        let state = self.state.lock();
        Ok(state.sorted_hits(state.hits.values().filter(|hit| {
            hit.hit_count_id == hit_count_id
                && hit.created >= since
                && matcher.matches(&hit.visitor, visitor)
        })))
    }

    async fn count_hits_since(
        &self,
        hit_count_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let state = self.state.lock();
        let count = state
            .hits
            .values()
            .filter(|hit| hit.hit_count_id == hit_count_id && hit.created >= since)
            .count();
        Ok(count as i64)
    }

    async fn purge_hits_before(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut state = self.state.lock();

        let expired: Vec<Uuid> = state
            .hits
            .values()
            .filter(|hit| hit.created < cutoff)
            .map(|hit| hit.id)
            .collect();

        let mut purged_per_count: HashMap<Uuid, i64> = HashMap::new();
        for id in &expired {
            if let Some(hit) = state.hits.remove(id) {
                *purged_per_count.entry(hit.hit_count_id).or_default() += 1;
            }
        }

        for (hit_count_id, purged) in purged_per_count {
            state.adjust_hits(hit_count_id, -purged, now)?;
        }

        Ok(expired.len() as u64)
    }

    async fn is_ip_blacklisted(&self, ip: &str) -> Result<bool, StoreError> {
        Ok(self.state.lock().blacklisted_ips.contains(ip))
    }

    async fn is_user_agent_blacklisted(&self, user_agent: &str) -> Result<bool, StoreError> {
        Ok(self.state.lock().blacklisted_user_agents.contains(user_agent))
    }

    async fn add_blacklisted_ip(&self, ip: &str) -> Result<bool, StoreError> {
        Ok(self.state.lock().blacklisted_ips.insert(ip.to_string()))
    }

    async fn remove_blacklisted_ip(&self, ip: &str) -> Result<bool, StoreError> {
        Ok(self.state.lock().blacklisted_ips.remove(ip))
    }

    async fn add_blacklisted_user_agent(&self, user_agent: &str) -> Result<bool, StoreError> {
        Ok(self
            .state
            .lock()
            .blacklisted_user_agents
            .insert(user_agent.to_string()))
    }

    async fn remove_blacklisted_user_agent(&self, user_agent: &str) -> Result<bool, StoreError> {
        Ok(self.state.lock().blacklisted_user_agents.remove(user_agent))
    }

    async fn blacklisted_ips(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.state.lock().blacklisted_ips.iter().cloned().collect())
    }

    async fn blacklisted_user_agents(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .state
            .lock()
            .blacklisted_user_agents
            .iter()
            .cloned()
            .collect())
    }
}
