//! Session stores: where session ids map to `(user id, created_at)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tokio::sync::RwLock;
use tracing::{Instrument, info_span};

use crate::users::RepositoryError;

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct SessionRecord {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    #[must_use]
    pub fn new(user_id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            created_at,
        }
    }
}

/// Mapping from session id to [`SessionRecord`].
///
/// Implementations must make `put` and `delete` atomic per id: a `put` on an
/// existing id is refused, and only one of several concurrent `delete` calls
/// for the same id reports `true`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert unless `session_id` is already present.
    async fn put(&self, session_id: &str, record: SessionRecord)
    -> Result<bool, RepositoryError>;

    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, RepositoryError>;

    /// `true` iff a record existed and this call removed it.
    async fn delete(&self, session_id: &str) -> Result<bool, RepositoryError>;
}

/// Sessions held in process memory; they live as long as the store does.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(
        &self,
        session_id: &str,
        record: SessionRecord,
    ) -> Result<bool, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        match sessions.entry(session_id.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(true)
            }
        }
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, RepositoryError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn delete(&self, session_id: &str) -> Result<bool, RepositoryError> {
        Ok(self.sessions.write().await.remove(session_id).is_some())
    }
}

/// Sessions persisted in the `user_sessions` table.
#[derive(Clone, Debug)]
pub struct SqlSessionStore {
    pool: SqlitePool,
}

impl SqlSessionStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SqlSessionStore {
    async fn put(
        &self,
        session_id: &str,
        record: SessionRecord,
    ) -> Result<bool, RepositoryError> {
        let query = r"
            INSERT INTO user_sessions (session_id, user_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT (session_id) DO NOTHING
        ";
        let span = info_span!(
            "db.query",
            db.system = "sqlite",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(session_id)
            .bind(&record.user_id)
            .bind(record.created_at)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, RepositoryError> {
        let query = r"
            SELECT user_id, created_at
            FROM user_sessions
            WHERE session_id = ?
        ";
        let span = info_span!(
            "db.query",
            db.system = "sqlite",
            db.operation = "SELECT",
            db.statement = query
        );
        let record = sqlx::query_as::<_, SessionRecord>(query)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;
        Ok(record)
    }

    async fn delete(&self, session_id: &str) -> Result<bool, RepositoryError> {
        let query = "DELETE FROM user_sessions WHERE session_id = ?";
        let span = info_span!(
            "db.query",
            db.system = "sqlite",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(session_id)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
