//! PostgreSQL backend
//!
//! Hit storage on PostgreSQL. Counter changes are `hits = hits + n` updates
//! so concurrent views never lose an increment, and hit inserts/deletes run
//! in the same transaction as the counter change they imply.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::{ContentRef, Hit, HitCount, Visitor, VisitorMatch};

use super::{HitBackend, StoreError};

type HitCountRow = (Uuid, i64, DateTime<Utc>, String, String);
type HitRow = (Uuid, DateTime<Utc>, String, String, String, Option<Uuid>, Uuid);

const HIT_COUNT_COLUMNS: &str = "id, hits, modified, content_type, object_id";
const HIT_COLUMNS: &str = "id, created, ip, session, user_agent, user_id, hit_count_id";

fn hit_count_from_row((id, hits, modified, content_type, object_id): HitCountRow) -> HitCount {
    HitCount {
        id,
        hits,
        modified,
        content: ContentRef {
            content_type,
            object_id,
        },
    }
}

fn hit_from_row((id, created, ip, session, user_agent, user_id, hit_count_id): HitRow) -> Hit {
    Hit {
        id,
        created,
        visitor: Visitor {
            ip,
            session,
            user_agent,
            user_id,
        },
        hit_count_id,
    }
}

/// Apply `delta` to a hit counter in one statement; `None` if the row is missing.
async fn adjust_hits<'e, E>(
    executor: E,
    id: Uuid,
    delta: i64,
    now: DateTime<Utc>,
) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar::<Postgres, i64>(
        r#"
        UPDATE hitcount_hit_count
        SET hits = hits + $2, modified = $3
        WHERE id = $1
        RETURNING hits
        "#,
    )
    .bind(id)
    .bind(delta)
    .bind(now)
    .fetch_optional(executor)
    .await
}

/// Hit backend on a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgHitBackend {
    pool: PgPool,
}

impl PgHitBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HitBackend for PgHitBackend {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    // =========================================================================
    // Hit counts
    // =========================================================================

    async fn get_or_create_hit_count(
        &self,
        content: &ContentRef,
        now: DateTime<Utc>,
    ) -> Result<HitCount, StoreError> {
        // The no-op update makes RETURNING yield the existing row on conflict
        let row: HitCountRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO hitcount_hit_count (id, hits, modified, content_type, object_id)
            VALUES ($1, 0, $2, $3, $4)
            ON CONFLICT (content_type, object_id)
            DO UPDATE SET content_type = EXCLUDED.content_type
            RETURNING {}
            "#,
            HIT_COUNT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(now)
        .bind(&content.content_type)
        .bind(&content.object_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(hit_count_from_row(row))
    }

    async fn find_hit_count(&self, content: &ContentRef) -> Result<Option<HitCount>, StoreError> {
        let row: Option<HitCountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM hitcount_hit_count WHERE content_type = $1 AND object_id = $2",
            HIT_COUNT_COLUMNS
        ))
        .bind(&content.content_type)
        .bind(&content.object_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(hit_count_from_row))
    }

    async fn get_hit_count(&self, id: Uuid) -> Result<Option<HitCount>, StoreError> {
        let row: Option<HitCountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM hitcount_hit_count WHERE id = $1",
            HIT_COUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(hit_count_from_row))
    }

    async fn increment_hit_count(&self, id: Uuid, now: DateTime<Utc>) -> Result<i64, StoreError> {
        adjust_hits(&self.pool, id, 1, now)
            .await?
            .ok_or(StoreError::HitCountNotFound(id))
    }

    async fn decrement_hit_count(&self, id: Uuid, now: DateTime<Utc>) -> Result<i64, StoreError> {
        adjust_hits(&self.pool, id, -1, now)
            .await?
            .ok_or(StoreError::HitCountNotFound(id))
    }

    async fn most_viewed(&self, limit: usize) -> Result<Vec<HitCount>, StoreError> {
        let rows: Vec<HitCountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM hitcount_hit_count ORDER BY hits DESC, modified DESC LIMIT $1",
            HIT_COUNT_COLUMNS
        ))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(hit_count_from_row).collect())
    }

    // =========================================================================
    // Hits
    // =========================================================================

    async fn insert_hit(&self, hit: &Hit) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        adjust_hits(&mut *tx, hit.hit_count_id, 1, hit.created)
            .await?
            .ok_or(StoreError::HitCountNotFound(hit.hit_count_id))?;

        sqlx::query(
            r#"
            INSERT INTO hitcount_hit (id, created, ip, session, user_agent, user_id, hit_count_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(hit.id)
        .bind(hit.created)
        .bind(&hit.visitor.ip)
        .bind(&hit.visitor.session)
        .bind(&hit.visitor.user_agent)
        .bind(hit.visitor.user_id)
        .bind(hit.hit_count_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_hit(&self, id: Uuid, now: DateTime<Utc>) -> Result<Hit, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<HitRow> = sqlx::query_as(&format!(
            "DELETE FROM hitcount_hit WHERE id = $1 RETURNING {}",
            HIT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let hit = row.map(hit_from_row).ok_or(StoreError::HitNotFound(id))?;

        let hits = adjust_hits(&mut *tx, hit.hit_count_id, -1, now)
            .await?
            .ok_or(StoreError::HitCountNotFound(hit.hit_count_id))?;

        tx.commit().await?;

        if hits < 0 {
            tracing::warn!(
                hit_count_id = %hit.hit_count_id,
                hits = hits,
                "Hit count went negative after delete"
            );
        }

        Ok(hit)
    }

    async fn get_hit(&self, id: Uuid) -> Result<Option<Hit>, StoreError> {
        let row: Option<HitRow> = sqlx::query_as(&format!(
            "SELECT {} FROM hitcount_hit WHERE id = $1",
            HIT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(hit_from_row))
    }

    async fn hits_for(&self, hit_count_id: Uuid) -> Result<Vec<Hit>, StoreError> {
        let rows: Vec<HitRow> = sqlx::query_as(&format!(
            "SELECT {} FROM hitcount_hit WHERE hit_count_id = $1 ORDER BY created ASC",
            HIT_COLUMNS
        ))
        .bind(hit_count_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(hit_from_row).collect())
    }

    async fn active_hits(
        &self,
        hit_count_id: Uuid,
        visitor: &Visitor,
        matcher: VisitorMatch,
        since: DateTime<Utc>,
    ) -> Result<Vec<Hit>, StoreError> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM hitcount_hit WHERE hit_count_id = ",
            HIT_COLUMNS
        ));
        query.push_bind(hit_count_id);
        query.push(" AND created >= ");
        query.push_bind(since);

        match (matcher, visitor.user_id) {
            (VisitorMatch::Ip, _) => {
                query.push(" AND ip = ");
                query.push_bind(visitor.ip.as_str());
            }
            (VisitorMatch::IpUserAgent, _) => {
                query.push(" AND ip = ");
                query.push_bind(visitor.ip.as_str());
                query.push(" AND user_agent = ");
                query.push_bind(visitor.user_agent.as_str());
            }
            (VisitorMatch::UserOrSession, Some(user_id)) => {
                query.push(" AND user_id = ");
                query.push_bind(user_id);
            }
            (VisitorMatch::Session, _) | (VisitorMatch::UserOrSession, None) => {
                query.push(" AND session = ");
                query.push_bind(visitor.session.as_str());
            }
        }
        query.push(" ORDER BY created ASC");

        let rows: Vec<HitRow> = query
            .build_query_as::<HitRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(hit_from_row).collect())
    }

    async fn count_hits_since(
        &self,
        hit_count_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM hitcount_hit
            WHERE hit_count_id = $1 AND created >= $2
            "#,
        )
        .bind(hit_count_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn purge_hits_before(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        // One statement: the delete and the counter adjustments commit together
        let purged: Vec<i64> = sqlx::query_scalar(
            r#"
            WITH purged AS (
                DELETE FROM hitcount_hit
                WHERE created < $1
                RETURNING hit_count_id
            ), totals AS (
                SELECT hit_count_id, COUNT(*) AS purged_hits
                FROM purged
                GROUP BY hit_count_id
            )
            UPDATE hitcount_hit_count hc
            SET hits = hc.hits - totals.purged_hits, modified = $2
            FROM totals
            WHERE hc.id = totals.hit_count_id
            RETURNING totals.purged_hits
            "#,
        )
        .bind(cutoff)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(purged.into_iter().map(|n| n.max(0) as u64).sum())
    }

    // =========================================================================
    // Blacklists
    // =========================================================================

    async fn is_ip_blacklisted(&self, ip: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM hitcount_blacklist_ip WHERE ip = $1)",
        )
        .bind(ip)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn is_user_agent_blacklisted(&self, user_agent: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM hitcount_blacklist_user_agent WHERE user_agent = $1)",
        )
        .bind(user_agent)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn add_blacklisted_ip(&self, ip: &str) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query(
            "INSERT INTO hitcount_blacklist_ip (ip) VALUES ($1) ON CONFLICT (ip) DO NOTHING",
        )
        .bind(ip)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn remove_blacklisted_ip(&self, ip: &str) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query("DELETE FROM hitcount_blacklist_ip WHERE ip = $1")
            .bind(ip)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn add_blacklisted_user_agent(&self, user_agent: &str) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            INSERT INTO hitcount_blacklist_user_agent (user_agent) VALUES ($1)
            ON CONFLICT (user_agent) DO NOTHING
            "#,
        )
        .bind(user_agent)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn remove_blacklisted_user_agent(&self, user_agent: &str) -> Result<bool, StoreError> {
        let rows_affected =
            sqlx::query("DELETE FROM hitcount_blacklist_user_agent WHERE user_agent = $1")
                .bind(user_agent)
                .execute(&self.pool)
                .await?
                .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn blacklisted_ips(&self) -> Result<Vec<String>, StoreError> {
        let ips: Vec<String> = sqlx::query_scalar("SELECT ip FROM hitcount_blacklist_ip ORDER BY ip")
            .fetch_all(&self.pool)
            .await?;

        Ok(ips)
    }

    async fn blacklisted_user_agents(&self) -> Result<Vec<String>, StoreError> {
        let user_agents: Vec<String> = sqlx::query_scalar(
            "SELECT user_agent FROM hitcount_blacklist_user_agent ORDER BY user_agent",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(user_agents)
    }
}
