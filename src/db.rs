//! Database module
//!
//! Connectivity and schema checks for the PostgreSQL backend.

use sqlx::PgPool;

/// Tables the PostgreSQL backend reads and writes
pub const REQUIRED_TABLES: [&str; 4] = [
    "hitcount_hit_count",
    "hitcount_hit",
    "hitcount_blacklist_ip",
    "hitcount_blacklist_user_agent",
];

/// Verify database connectivity
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = current_schema() AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    Ok(true)
}
