use super::{default_ttl, generate_room_code, is_room_code, validate_max_peers, RoomDirectory};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use signalhub_protocol::RoomMetadata;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Attempts at finding an unused shareable code before giving up
const CODE_ATTEMPTS: usize = 8;

#[derive(FromRow)]
struct RoomRow {
    id: String,
    code: String,
    creator_id: String,
    created_at: DateTime<Utc>,
    max_peers: i32,
}

impl RoomRow {
    fn into_metadata(self, peer_count: u32) -> RoomMetadata {
        RoomMetadata {
            id: self.id,
            code: self.code,
            creator_id: self.creator_id,
            created_at: self.created_at,
            max_peers: self.max_peers.max(0) as u32,
            peer_count,
        }
    }
}

/// Room directory persisted in PostgreSQL (`rooms` and `room_peers`).
#[derive(Clone)]
pub struct PgRoomDirectory {
    db: PgPool,
    ttl: Duration,
}

impl PgRoomDirectory {
    pub fn new(db: PgPool) -> Self {
        Self::with_ttl(db, default_ttl())
    }

    pub fn with_ttl(db: PgPool, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    /// Open a pool against `database_url` and bring the schema up to date.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        tracing::info!("Room directory database pool initialized");

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Room directory migrations completed");

        Ok(Self::new(pool))
    }

    async fn find_room(&self, room_id: &str) -> Result<Option<RoomRow>> {
        let row = sqlx::query_as::<_, RoomRow>(
            r#"
            SELECT id, code, creator_id, created_at, max_peers
            FROM rooms
            WHERE id = $1 AND expires_at > NOW()
            "#,
        )
        .bind(room_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row)
    }
}

#[async_trait]
impl RoomDirectory for PgRoomDirectory {
    async fn create(&self, creator_id: &str, max_peers: u32) -> Result<RoomMetadata> {
        validate_max_peers(max_peers)?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        for _ in 0..CODE_ATTEMPTS {
            let code = generate_room_code();

            // Codes of expired rooms are free again
            sqlx::query("DELETE FROM rooms WHERE code = $1 AND expires_at <= NOW()")
                .bind(&code)
                .execute(&self.db)
                .await?;

            let inserted = sqlx::query(
                r#"
                INSERT INTO rooms (id, code, creator_id, created_at, max_peers, expires_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (code) DO NOTHING
                "#,
            )
            .bind(&id)
            .bind(&code)
            .bind(creator_id)
            .bind(now)
            .bind(max_peers as i32)
            .bind(now + self.ttl)
            .execute(&self.db)
            .await?
            .rows_affected();

            if inserted == 1 {
                return Ok(RoomMetadata {
                    id,
                    code,
                    creator_id: creator_id.to_string(),
                    created_at: now,
                    max_peers,
                    peer_count: 0,
                });
            }
        }

        Err(AppError::Internal(anyhow::anyhow!(
            "no free room code after {} attempts",
            CODE_ATTEMPTS
        )))
    }

    async fn resolve(&self, identifier: &str) -> Result<RoomMetadata> {
        let row = if is_room_code(identifier) {
            sqlx::query_as::<_, RoomRow>(
                r#"
                SELECT id, code, creator_id, created_at, max_peers
                FROM rooms
                WHERE code = $1 AND expires_at > NOW()
                "#,
            )
            .bind(identifier)
            .fetch_optional(&self.db)
            .await?
        } else {
            self.find_room(identifier).await?
        };

        let row = row.ok_or_else(AppError::room_not_found)?;
        let peer_count = self.peer_count(&row.id).await?;

        Ok(row.into_metadata(peer_count))
    }

    async fn delete(&self, room_id: &str, requester_id: &str) -> Result<()> {
        let room = self
            .find_room(room_id)
            .await?
            .ok_or_else(AppError::room_not_found)?;

        if room.creator_id != requester_id {
            return Err(AppError::Forbidden(
                "Only the room creator can delete the room".to_string(),
            ));
        }

        // room_peers rows go with it (ON DELETE CASCADE)
        sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(room_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn add_peer(&self, room_id: &str, peer_id: &str) -> Result<()> {
        let expires_at = Utc::now() + self.ttl;
        let mut tx = self.db.begin().await?;

        // Locks the room row so a concurrent delete cannot slip in between
        let live: Option<String> = sqlx::query_scalar(
            "SELECT id FROM rooms WHERE id = $1 AND expires_at > NOW() FOR SHARE",
        )
        .bind(room_id)
        .fetch_optional(&mut *tx)
        .await?;
        if live.is_none() {
            return Err(AppError::room_not_found());
        }

        sqlx::query(
            r#"
            INSERT INTO room_peers (room_id, peer_id, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (room_id, peer_id) DO NOTHING
            "#,
        )
        .bind(room_id)
        .bind(peer_id)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        // The whole set shares one expiry, refreshed on every join
        sqlx::query("UPDATE room_peers SET expires_at = $2 WHERE room_id = $1")
            .bind(room_id)
            .bind(expires_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove_peer(&self, room_id: &str, peer_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM room_peers WHERE room_id = $1 AND peer_id = $2")
            .bind(room_id)
            .bind(peer_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn peer_count(&self, room_id: &str) -> Result<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM room_peers WHERE room_id = $1 AND expires_at > NOW()",
        )
        .bind(room_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count.max(0) as u32)
    }

    async fn purge_expired(&self) -> Result<usize> {
        sqlx::query("DELETE FROM room_peers WHERE expires_at <= NOW()")
            .execute(&self.db)
            .await?;

        let removed = sqlx::query("DELETE FROM rooms WHERE expires_at <= NOW()")
            .execute(&self.db)
            .await?
            .rows_affected();

        Ok(removed as usize)
    }
}
