use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor};
use uuid::Uuid;

/// Upper bound on a session's lifetime (100 years).
const MAX_SESSION_AGE_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// A login session. Nothing issues sessions yet; the table exists so resets
/// can clear it before removing users.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// A session for `user_id` that expires `max_age_secs` from now.
    pub fn new(user_id: Uuid, max_age_secs: u64) -> Self {
        let now = Utc::now();
        let max_age = Duration::seconds(max_age_secs.min(MAX_SESSION_AGE_SECS) as i64);
        Self {
            id: Uuid::new_v4(),
            user_id,
            expires_at: now + max_age,
            created_at: now,
        }
    }

    pub fn is_expired(&self, at: DateTime<Utc>) -> bool {
        self.expires_at <= at
    }

    pub async fn insert<'e, E>(&self, executor: E) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(self.id)
        .bind(self.user_id)
        .bind(self.expires_at)
        .bind(self.created_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(executor)
            .await
    }

    pub async fn delete_all<'e, E>(executor: E) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM sessions").execute(executor).await?;
        Ok(result.rows_affected())
    }
}
