mod session;

pub use session::{Session, ANONYMOUS};

use chrono::Utc;
use log::info;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{migrate::MigrateDatabase, sqlite::{SqlitePool, SqlitePoolOptions}, Row, Sqlite};

use crate::error::StorageError;
use crate::models::Topic;
use crate::voting::ballot::VoteList;

pub const CURRENT_TOPIC_KEY: &str = "currentTopic";
pub const POLL_VOTES_KEY: &str = "pollVotes";
pub const USER_NAME_KEY: &str = "userName";

/// Client-side key/value storage that survives between runs, holding
/// JSON-serialized session values.
#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub async fn new(db_url: &str) -> Result<Self, StorageError> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating session database at {}", db_url);
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    // Every in-memory connection is its own database, so keep exactly one
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM session_storage WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get::<String, _>("value")))
    }

    pub async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO session_storage (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key)
            DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[cfg(test)]
    pub async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM session_storage WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        key: &'static str,
    ) -> Result<Option<T>, StorageError> {
        match self.get_item(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StorageError::Serde { key, source }),
            None => Ok(None),
        }
    }

    async fn set_json<T: Serialize>(&self, key: &'static str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Serde { key, source })?;
        self.set_item(key, &raw).await
    }

    pub async fn load_topic(&self) -> Result<Option<Topic>, StorageError> {
        self.get_json(CURRENT_TOPIC_KEY).await
    }

    pub async fn save_topic(&self, topic: &Topic) -> Result<(), StorageError> {
        self.set_json(CURRENT_TOPIC_KEY, topic).await
    }

    pub async fn load_votes(&self) -> Result<Option<VoteList>, StorageError> {
        self.get_json(POLL_VOTES_KEY).await
    }

    pub async fn save_votes(&self, votes: &VoteList) -> Result<(), StorageError> {
        self.set_json(POLL_VOTES_KEY, votes).await
    }

    // The name is kept as a plain string, not JSON
    pub async fn load_user_name(&self) -> Result<Option<String>, StorageError> {
        self.get_item(USER_NAME_KEY).await
    }

    pub async fn save_user_name(&self, name: &str) -> Result<(), StorageError> {
        self.set_item(USER_NAME_KEY, name).await
    }
}
