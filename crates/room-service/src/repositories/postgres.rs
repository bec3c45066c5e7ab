//! PostgreSQL store.
//!
//! Each unit of work runs in one sqlx transaction. The transaction handle is
//! dropped without commit on every error path, which rolls it back.
//!
//! # Security
//!
//! - All queries use parameterized statements (SQL injection safe)
//! - Unique index on `memberships(user_id)` and CHECK constraints on the
//!   participant count reject any unit that would break the invariants

use crate::config::Config;
use crate::errors::RoomError;
use crate::models::{Membership, Room, Subject};
use crate::observability::metrics;
use crate::repositories::store::{RoomStore, StoreWrite, SubjectStore, UnitOfWork};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use std::time::{Duration, Instant};
use tracing::instrument;
use uuid::Uuid;

const ROOM_COLUMNS: &str = "id, name, description, subject, max_participants, is_public, \
                            host_id, participant_count, created_at";

const MEMBERSHIP_COLUMNS: &str = "id, user_id, room_id, joined_at";

/// PostgreSQL-backed store for rooms, memberships and subjects.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the service configuration.
    ///
    /// Every session gets a statement timeout so queries can't hang
    /// indefinitely.
    pub async fn connect(config: &Config) -> Result<Self, RoomError> {
        let database_url = config
            .database_url
            .as_deref()
            .ok_or_else(|| RoomError::Database("DATABASE_URL is not configured".to_string()))?;

        let url_with_timeout =
            add_statement_timeout(database_url, config.db_statement_timeout_seconds);

        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(&url_with_timeout)
            .await?;

        Ok(Self { pool })
    }

    /// Apply pending schema migrations.
    pub async fn run_migrations(&self) -> Result<(), RoomError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RoomError::Database(e.to_string()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn apply(
        tx: &mut Transaction<'static, Postgres>,
        write: StoreWrite,
    ) -> Result<(), RoomError> {
        match write {
            StoreWrite::InsertRoom(room) => {
                sqlx::query(
                    r#"
                    INSERT INTO rooms (
                        id, name, description, subject, max_participants,
                        is_public, host_id, participant_count, created_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    "#,
                )
                .bind(room.id)
                .bind(&room.name)
                .bind(&room.description)
                .bind(&room.subject)
                .bind(room.max_participants)
                .bind(room.is_public)
                .bind(&room.host_id)
                .bind(room.participant_count)
                .bind(room.created_at)
                .execute(&mut **tx)
                .await?;
            }
            StoreWrite::InsertMembership(membership) => {
                sqlx::query(
                    r#"
                    INSERT INTO memberships (id, user_id, room_id, joined_at)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(membership.id)
                .bind(&membership.user_id)
                .bind(membership.room_id)
                .bind(membership.joined_at)
                .execute(&mut **tx)
                .await?;
            }
            StoreWrite::SetParticipantCount { room_id, count } => {
                let result = sqlx::query(
                    r#"
                    UPDATE rooms
                    SET participant_count = $2
                    WHERE id = $1
                    "#,
                )
                .bind(room_id)
                .bind(count)
                .execute(&mut **tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(RoomError::room_not_found());
                }
            }
            StoreWrite::DeleteMembership { membership_id } => {
                let result = sqlx::query("DELETE FROM memberships WHERE id = $1")
                    .bind(membership_id)
                    .execute(&mut **tx)
                    .await?;

                if result.rows_affected() == 0 {
                    return Err(RoomError::not_in_room());
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl RoomStore for PgStore {
    #[instrument(skip_all, name = "room.repo.get_room", fields(room_id = %room_id))]
    async fn get_room(&self, room_id: Uuid) -> Result<Option<Room>, RoomError> {
        let start = Instant::now();
        let result = async {
            let row = sqlx::query(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"))
                .bind(room_id)
                .fetch_optional(&self.pool)
                .await?;
            row.as_ref().map(map_row_to_room).transpose().map_err(RoomError::from)
        }
        .await;
        record("get_room", start, result)
    }

    #[instrument(skip_all, name = "room.repo.list_rooms")]
    async fn list_rooms(&self, subject: Option<&str>) -> Result<Vec<Room>, RoomError> {
        let start = Instant::now();
        let result = async {
            let rows = match subject {
                Some(subject) => {
                    sqlx::query(&format!(
                        "SELECT {ROOM_COLUMNS} FROM rooms WHERE subject = $1 \
                         ORDER BY created_at ASC, id ASC"
                    ))
                    .bind(subject)
                    .fetch_all(&self.pool)
                    .await?
                }
                None => {
                    sqlx::query(&format!(
                        "SELECT {ROOM_COLUMNS} FROM rooms ORDER BY created_at ASC, id ASC"
                    ))
                    .fetch_all(&self.pool)
                    .await?
                }
            };
            rows.iter()
                .map(map_row_to_room)
                .collect::<Result<Vec<_>, _>>()
                .map_err(RoomError::from)
        }
        .await;
        record("list_rooms", start, result)
    }

    #[instrument(skip_all, name = "room.repo.get_membership_by_user", fields(user_id = %user_id))]
    async fn get_membership_by_user(
        &self,
        user_id: &str,
    ) -> Result<Option<Membership>, RoomError> {
        let start = Instant::now();
        let result = async {
            let row = sqlx::query(&format!(
                "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE user_id = $1"
            ))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
            row.as_ref()
                .map(map_row_to_membership)
                .transpose()
                .map_err(RoomError::from)
        }
        .await;
        record("get_membership_by_user", start, result)
    }

    #[instrument(skip_all, name = "room.repo.list_memberships", fields(room_id = %room_id))]
    async fn list_memberships(&self, room_id: Uuid) -> Result<Vec<Membership>, RoomError> {
        let start = Instant::now();
        let result = async {
            let rows = sqlx::query(&format!(
                "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE room_id = $1 \
                 ORDER BY joined_at ASC, id ASC"
            ))
            .bind(room_id)
            .fetch_all(&self.pool)
            .await?;
            rows.iter()
                .map(map_row_to_membership)
                .collect::<Result<Vec<_>, _>>()
                .map_err(RoomError::from)
        }
        .await;
        record("list_memberships", start, result)
    }

    #[instrument(skip_all, name = "room.repo.commit", fields(writes = unit.writes().len()))]
    async fn commit(&self, unit: UnitOfWork) -> Result<(), RoomError> {
        let start = Instant::now();
        let result = async {
            let mut tx = self.pool.begin().await?;

            for write in unit.into_writes() {
                let kind = write.kind();
                if let Err(e) = Self::apply(&mut tx, write).await {
                    tracing::debug!(
                        target: "room.repository.postgres",
                        write = kind,
                        error = %e,
                        "Write rejected, rolling back unit"
                    );
                    // Dropping `tx` rolls back
                    return Err(e);
                }
            }

            tx.commit().await?;
            Ok::<_, RoomError>(())
        }
        .await;
        record("commit", start, result)
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}

#[async_trait]
impl SubjectStore for PgStore {
    #[instrument(skip_all, name = "room.repo.list_subjects")]
    async fn list_subjects(&self) -> Result<Vec<Subject>, RoomError> {
        let start = Instant::now();
        let result = async {
            let rows = sqlx::query("SELECT id, name, icon FROM subjects ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?;
            rows.iter()
                .map(|row| {
                    Ok(Subject {
                        id: row.try_get("id")?,
                        name: row.try_get("name")?,
                        icon: row.try_get("icon")?,
                    })
                })
                .collect::<Result<Vec<_>, sqlx::Error>>()
                .map_err(RoomError::from)
        }
        .await;
        record("list_subjects", start, result)
    }

    #[instrument(skip_all, name = "room.repo.seed_subjects")]
    async fn seed_subjects_if_empty(&self, subjects: Vec<Subject>) -> Result<u64, RoomError> {
        let start = Instant::now();
        let result = async {
            let mut tx = self.pool.begin().await?;

            let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subjects")
                .fetch_one(&mut *tx)
                .await?;
            if existing > 0 {
                return Ok(0);
            }

            let mut inserted = 0;
            for subject in subjects {
                inserted += sqlx::query(
                    r#"
                    INSERT INTO subjects (id, name, icon)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (name) DO NOTHING
                    "#,
                )
                .bind(subject.id)
                .bind(&subject.name)
                .bind(&subject.icon)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            }

            tx.commit().await?;
            Ok::<_, RoomError>(inserted)
        }
        .await;
        record("seed_subjects", start, result)
    }
}

/// Record store latency and pass the result through.
fn record<T>(
    operation: &'static str,
    start: Instant,
    result: Result<T, RoomError>,
) -> Result<T, RoomError> {
    let status = if result.is_ok() { "success" } else { "error" };
    metrics::record_store_operation(operation, status, start.elapsed());
    result
}

/// Map a database row to a Room.
pub fn map_row_to_room(row: &PgRow) -> Result<Room, sqlx::Error> {
    Ok(Room {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        subject: row.try_get("subject")?,
        max_participants: row.try_get("max_participants")?,
        is_public: row.try_get("is_public")?,
        host_id: row.try_get("host_id")?,
        participant_count: row.try_get("participant_count")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Map a database row to a Membership.
pub fn map_row_to_membership(row: &PgRow) -> Result<Membership, sqlx::Error> {
    Ok(Membership {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        room_id: row.try_get("room_id")?,
        joined_at: row.try_get("joined_at")?,
    })
}

/// Adds statement_timeout to the database URL.
fn add_statement_timeout(url: &str, timeout_secs: u32) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}options=-c%20statement_timeout%3D{}s",
        url, separator, timeout_secs
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_statement_timeout_without_query() {
        assert_eq!(
            add_statement_timeout("postgresql://localhost/rooms", 5),
            "postgresql://localhost/rooms?options=-c%20statement_timeout%3D5s"
        );
    }

    #[test]
    fn test_add_statement_timeout_with_existing_query() {
        assert_eq!(
            add_statement_timeout("postgresql://localhost/rooms?sslmode=require", 2),
            "postgresql://localhost/rooms?sslmode=require&options=-c%20statement_timeout%3D2s"
        );
    }
}
