//! Room directory tests against PostgreSQL
//!
//! These tests require a running PostgreSQL database.
//! Set TEST_DATABASE_URL environment variable to configure; without it every
//! test returns early.
//!
//! Run with: cargo test -p signalhub-server --test pg_directory

use chrono::{Duration, Utc};
use signalhub_server::directory::{generate_room_code, PgRoomDirectory, RoomDirectory};
use signalhub_server::error::AppError;
use sqlx::PgPool;
use std::collections::HashSet;
use tokio_test::assert_ok;

/// Pool with the schema applied, or `None` when no test database is
/// configured.
async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };

    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    Some(pool)
}

async fn member_rows(pool: &PgPool, room_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM room_peers WHERE room_id = $1")
        .bind(room_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_resolves_by_id_and_by_code() {
    let Some(pool) = test_pool().await else { return };
    let directory = PgRoomDirectory::new(pool);

    let room = directory.create("alice", 4).await.unwrap();
    let by_id = directory.resolve(&room.id).await.unwrap();
    let by_code = directory.resolve(&room.code).await.unwrap();

    assert_eq!(by_id.id, by_code.id);
    assert_eq!(by_id.code, room.code);
    assert_eq!(by_id.creator_id, "alice");
    assert_eq!(by_id.max_peers, 4);
    assert_eq!(by_id.peer_count, 0);
}

#[tokio::test]
async fn test_unknown_identifier_is_not_found() {
    let Some(pool) = test_pool().await else { return };
    let directory = PgRoomDirectory::new(pool);

    assert!(matches!(
        directory.resolve("no-such-room").await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        directory.create("alice", 1).await,
        Err(AppError::BadRequest(_))
    ));
}

#[tokio::test]
async fn test_codes_are_unique() {
    let Some(pool) = test_pool().await else { return };
    let directory = PgRoomDirectory::new(pool);

    let mut codes = HashSet::new();
    for _ in 0..32 {
        let room = directory.create("alice", 8).await.unwrap();
        assert!(codes.insert(room.code));
    }
}

#[tokio::test]
async fn test_membership_feeds_peer_count() {
    let Some(pool) = test_pool().await else { return };
    let directory = PgRoomDirectory::new(pool.clone());
    let room = directory.create("alice", 2).await.unwrap();

    assert_ok!(directory.add_peer(&room.id, "p1").await);
    assert_ok!(directory.add_peer(&room.id, "p2").await);
    assert_ok!(directory.add_peer(&room.id, "p2").await);

    let resolved = directory.resolve(&room.code).await.unwrap();
    assert_eq!(resolved.peer_count, 2);
    assert!(resolved.is_full());

    assert_ok!(directory.remove_peer(&room.id, "p1").await);
    assert_ok!(directory.remove_peer(&room.id, "p1").await);
    assert_eq!(directory.peer_count(&room.id).await.unwrap(), 1);
    assert_eq!(member_rows(&pool, &room.id).await, 1);
}

#[tokio::test]
async fn test_join_refreshes_whole_membership_expiry() {
    let Some(pool) = test_pool().await else { return };
    let directory = PgRoomDirectory::new(pool.clone());
    let room = directory.create("alice", 8).await.unwrap();

    assert_ok!(directory.add_peer(&room.id, "p1").await);
    sqlx::query("UPDATE room_peers SET expires_at = NOW() - INTERVAL '1 minute' WHERE room_id = $1")
        .bind(&room.id)
        .execute(&pool)
        .await
        .unwrap();
    assert_eq!(directory.peer_count(&room.id).await.unwrap(), 0);

    assert_ok!(directory.add_peer(&room.id, "p2").await);
    assert_eq!(directory.peer_count(&room.id).await.unwrap(), 2);
}

#[tokio::test]
async fn test_membership_requires_a_live_room() {
    let Some(pool) = test_pool().await else { return };
    let directory = PgRoomDirectory::new(pool.clone());

    assert!(matches!(
        directory.add_peer("no-such-room", "p1").await,
        Err(AppError::NotFound(_))
    ));
    assert_eq!(member_rows(&pool, "no-such-room").await, 0);
}

#[tokio::test]
async fn test_only_creator_may_delete_and_members_cascade() {
    let Some(pool) = test_pool().await else { return };
    let directory = PgRoomDirectory::new(pool.clone());
    let room = directory.create("alice", 8).await.unwrap();
    assert_ok!(directory.add_peer(&room.id, "p1").await);

    assert!(matches!(
        directory.delete(&room.id, "bob").await,
        Err(AppError::Forbidden(_))
    ));
    assert_ok!(directory.delete(&room.id, "alice").await);

    assert!(directory.resolve(&room.id).await.is_err());
    assert!(directory.resolve(&room.code).await.is_err());
    assert_eq!(member_rows(&pool, &room.id).await, 0);
    assert!(matches!(
        directory.delete(&room.id, "alice").await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        directory.add_peer(&room.id, "p2").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_expired_rooms_are_hidden_then_purged() {
    let Some(pool) = test_pool().await else { return };
    let directory = PgRoomDirectory::with_ttl(pool.clone(), Duration::zero());
    let room = directory.create("alice", 8).await.unwrap();

    assert!(directory.resolve(&room.id).await.is_err());
    assert!(directory.resolve(&room.code).await.is_err());
    assert!(matches!(
        directory.add_peer(&room.id, "p1").await,
        Err(AppError::NotFound(_))
    ));

    assert!(directory.purge_expired().await.unwrap() >= 1);
    let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rooms WHERE id = $1")
        .bind(&room.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(left, 0);
}

#[tokio::test]
async fn test_expired_code_can_be_reissued() {
    let Some(pool) = test_pool().await else { return };
    let directory = PgRoomDirectory::new(pool.clone());

    // A stale room still holding a code it no longer owns
    let code = generate_room_code();
    sqlx::query(
        r#"
        INSERT INTO rooms (id, code, creator_id, created_at, max_peers, expires_at)
        VALUES ($1, $2, 'ghost', $3, 8, $3)
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&code)
    .bind(Utc::now() - Duration::hours(25))
    .execute(&pool)
    .await
    .unwrap();

    assert!(matches!(
        directory.resolve(&code).await,
        Err(AppError::NotFound(_))
    ));

    // A new room is never shadowed by the stale one
    let room = directory.create("alice", 8).await.unwrap();
    assert_eq!(directory.resolve(&room.code).await.unwrap().id, room.id);
}
