//! Common test utilities

#![allow(dead_code)]

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use hitcount::domain::{ContentRef, Visitor};

/// Tables used by the PostgreSQL backend
const SCHEMA: [&str; 5] = [
    r#"
    CREATE TABLE IF NOT EXISTS hitcount_hit_count (
        id UUID PRIMARY KEY,
        hits BIGINT NOT NULL DEFAULT 0,
        modified TIMESTAMPTZ NOT NULL,
        content_type TEXT NOT NULL,
        object_id TEXT NOT NULL,
        UNIQUE (content_type, object_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS hitcount_hit (
        id UUID PRIMARY KEY,
        created TIMESTAMPTZ NOT NULL,
        ip VARCHAR(40) NOT NULL,
        session VARCHAR(40) NOT NULL,
        user_agent VARCHAR(255) NOT NULL,
        user_id UUID NULL,
        hit_count_id UUID NOT NULL REFERENCES hitcount_hit_count(id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS hitcount_hit_created_idx ON hitcount_hit (hit_count_id, created)",
    "CREATE TABLE IF NOT EXISTS hitcount_blacklist_ip (ip VARCHAR(40) PRIMARY KEY)",
    "CREATE TABLE IF NOT EXISTS hitcount_blacklist_user_agent (user_agent VARCHAR(255) PRIMARY KEY)",
];

/// Connect to DATABASE_URL and make sure the hitcount tables exist.
///
/// Tests share the database, so each one works on its own content type and
/// visitor values instead of truncating.
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    let mut tx = pool.begin().await.expect("Failed to begin transaction");

    // concurrent CREATE TABLE IF NOT EXISTS can still collide in the catalog
    sqlx::query("SELECT pg_advisory_xact_lock(4242)")
        .execute(&mut *tx)
        .await
        .expect("Failed to take schema lock");

    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .expect("Failed to create schema");
    }

    tx.commit().await.expect("Failed to commit schema");

    pool
}

/// Content reference no other test uses
pub fn unique_content() -> ContentRef {
    ContentRef::new(format!("test.{}", Uuid::new_v4().simple()), 1)
}

/// Visitor with a fresh session
pub fn visitor(ip: &str) -> Visitor {
    Visitor::new(ip, Uuid::new_v4().simple().to_string(), "integration-test/1.0")
}

/// Random address in the IPv6 documentation range
pub fn unique_ip() -> String {
    let b = Uuid::new_v4().into_bytes();
    format!(
        "2001:db8:{:x}:{:x}:{:x}:{:x}",
        u16::from_be_bytes([b[0], b[1]]),
        u16::from_be_bytes([b[2], b[3]]),
        u16::from_be_bytes([b[4], b[5]]),
        u16::from_be_bytes([b[6], b[7]]),
    )
}
