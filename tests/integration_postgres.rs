//! Integration tests for the PostgreSQL backend
//!
//! Require a database: DATABASE_URL=... cargo test -- --ignored

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use hitcount::clock::{MockClock, SystemClock};
use hitcount::domain::{Hit, Period, Visitor};
use hitcount::store::{HitBackend, PgHitBackend};
use hitcount::{HitCounter, HitCounterConfig, Rejection, ViewOutcome, ViewRequest};
use uuid::Uuid;

mod common;

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_schema_check() {
    let pool = common::setup_test_db().await;
    hitcount::db::verify_connection(&pool).await.unwrap();
    assert!(hitcount::db::check_schema(&pool).await.unwrap());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_get_or_create_is_idempotent() {
    let pool = common::setup_test_db().await;
    let backend = PgHitBackend::new(pool);
    let content = common::unique_content();

    let first = backend.get_or_create_hit_count(&content, Utc::now()).await.unwrap();
    let second = backend.get_or_create_hit_count(&content, Utc::now()).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.hits, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_first_views_share_one_hit_count() {
    let pool = common::setup_test_db().await;
    let counter = HitCounter::postgres(pool, HitCounterConfig::default());
    let content = common::unique_content();
    let ip = common::unique_ip();

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let counter = counter.clone();
            let request = ViewRequest::new(content.clone(), common::visitor(&ip));
            tokio::spawn(async move { counter.register_view(request).await })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().unwrap().is_accepted());
    }

    let hit_count = counter.hit_counts().find(&content).await.unwrap().unwrap();
    assert_eq!(hit_count.hits, 32);
    assert_eq!(counter.hits().hits_for(hit_count.id).await.unwrap().len(), 32);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_decrements_in_same_transaction() {
    let pool = common::setup_test_db().await;
    let counter = HitCounter::postgres(pool, HitCounterConfig::default());
    let content = common::unique_content();
    let ip = common::unique_ip();

    let first = counter
        .register_view(ViewRequest::new(content.clone(), common::visitor(&ip)))
        .await
        .unwrap();
    counter
        .register_view(ViewRequest::new(content.clone(), common::visitor(&ip)))
        .await
        .unwrap();

    let hit_id = first.hit().unwrap().id;
    counter.remove_hit(hit_id).await.unwrap();

    let hit_count = counter.hit_counts().find(&content).await.unwrap().unwrap();
    assert_eq!(hit_count.hits, 1);
    assert!(counter.remove_hit(hit_id).await.unwrap_err().is_not_found());
    assert_eq!(counter.hit_counts().get(hit_count.id).await.unwrap().hits, 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_failed_hit_insert_rolls_back_increment() {
    let pool = common::setup_test_db().await;
    let backend = PgHitBackend::new(pool);
    let hit_count = backend
        .get_or_create_hit_count(&common::unique_content(), Utc::now())
        .await
        .unwrap();

    // ip wider than its column, so the insert fails after the counter update
    let hit = Hit {
        id: Uuid::new_v4(),
        created: Utc::now(),
        visitor: Visitor {
            ip: "1".repeat(41),
            session: "session".to_string(),
            user_agent: "integration-test".to_string(),
            user_id: None,
        },
        hit_count_id: hit_count.id,
    };
    assert!(backend.insert_hit(&hit).await.is_err());

    let after = backend.get_hit_count(hit_count.id).await.unwrap().unwrap();
    assert_eq!(after.hits, 0);
    assert!(backend.get_hit(hit.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_blacklisted_ip_is_rejected() {
    let pool = common::setup_test_db().await;
    let counter = HitCounter::postgres(pool, HitCounterConfig::default());
    let content = common::unique_content();
    let ip = common::unique_ip();

    assert!(counter.blacklist().add_ip(&ip).await.unwrap());
    assert!(!counter.blacklist().add_ip(&ip).await.unwrap());

    let outcome = counter
        .register_view(ViewRequest::new(content.clone(), common::visitor(&ip)))
        .await
        .unwrap();
    assert_eq!(outcome, ViewOutcome::Rejected(Rejection::BlacklistedIp));
    assert!(counter.hit_counts().find(&content).await.unwrap().is_none());

    assert!(counter.blacklist().list_ips().await.unwrap().contains(&ip));
    assert!(counter.blacklist().remove_ip(&ip).await.unwrap());
    assert!(!counter.blacklist().is_ip_blacklisted(&ip).await.unwrap());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_dedup_window_and_visitor_match() {
    let pool = common::setup_test_db().await;
    let clock = MockClock::new(Utc::now());
    let counter = HitCounter::new(
        Arc::new(PgHitBackend::new(pool)),
        Arc::new(clock.clone()),
        HitCounterConfig::default().with_visitor_match(hitcount::VisitorMatch::IpUserAgent),
    );
    let content = common::unique_content();
    let ip = common::unique_ip();

    // different sessions, same ip and user agent
    let first = counter
        .register_view(ViewRequest::new(content.clone(), common::visitor(&ip)))
        .await
        .unwrap();
    assert!(first.is_accepted());

    clock.advance(Duration::days(6));
    let repeat = counter
        .register_view(ViewRequest::new(content.clone(), common::visitor(&ip)))
        .await
        .unwrap();
    assert_eq!(
        repeat.rejection(),
        Some(Rejection::Duplicate {
            active_hit_id: first.hit().unwrap().id
        })
    );

    clock.advance(Duration::days(2));
    let later = counter
        .register_view(ViewRequest::new(content.clone(), common::visitor(&ip)))
        .await
        .unwrap();
    assert!(later.is_accepted());
    assert_eq!(later.hit_count().unwrap().hits, 2);

    let id = later.hit_count().unwrap().id;
    assert_eq!(counter.hit_counts().hits_in_last(id, Period::WEEK).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_purge_adjusts_counters() {
    let pool = common::setup_test_db().await;
    // far in the past so the purge cannot reach rows written by other tests
    let clock = MockClock::new(Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap());
    let counter = HitCounter::new(
        Arc::new(PgHitBackend::new(pool)),
        Arc::new(clock.clone()),
        HitCounterConfig::default(),
    );
    let content = common::unique_content();
    let ip = common::unique_ip();

    counter
        .register_view(ViewRequest::new(content.clone(), common::visitor(&ip)))
        .await
        .unwrap();
    counter
        .register_view(ViewRequest::new(content.clone(), common::visitor(&ip)))
        .await
        .unwrap();
    clock.advance(Duration::days(60));
    counter
        .register_view(ViewRequest::new(content.clone(), common::visitor(&ip)))
        .await
        .unwrap();

    let purged = counter.purge(Period::days(45).unwrap()).await.unwrap();
    assert!(purged >= 2);

    let hit_count = counter.hit_counts().find(&content).await.unwrap().unwrap();
    assert_eq!(hit_count.hits, 1);
    assert_eq!(counter.hits().hits_for(hit_count.id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_system_clock_counter() {
    let pool = common::setup_test_db().await;
    let counter = HitCounter::new(
        Arc::new(PgHitBackend::new(pool)),
        Arc::new(SystemClock::new()),
        HitCounterConfig::default(),
    );
    let content = common::unique_content();

    let outcome = counter
        .register_view(ViewRequest::new(content, common::visitor(&common::unique_ip())))
        .await
        .unwrap();

    let hit = outcome.hit().unwrap();
    assert!(Utc::now() - hit.created < Duration::minutes(1));
}
