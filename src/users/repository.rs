//! User persistence.
//!
//! The `UserRepository` trait is the only way the rest of the crate reaches
//! stored users. `SqlUserRepository` backs it with SQLite through `sqlx`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{Instrument, info_span};

use super::{User, password::PasswordError};

const USER_COLUMNS: &str =
    "SELECT id, email, password_hash, first_name, last_name, created_at, updated_at FROM users";

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("email already registered: {0}")]
    Conflict(String),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Attribute match used by lookups. Empty filters match every user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub id: Option<String>,
    pub email: Option<String>,
}

impl UserFilter {
    #[must_use]
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            email: None,
        }
    }

    #[must_use]
    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            id: None,
            email: Some(email.into()),
        }
    }
}

/// Attributes accepted when creating a user.
#[derive(Clone, Debug, Default)]
pub struct NewUser {
    pub email: String,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Partial update; only name fields are mutable.
#[derive(Clone, Debug, Default)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, attrs: NewUser) -> Result<User, RepositoryError>;
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, RepositoryError>;
    async fn find_all(&self, filter: &UserFilter) -> Result<Vec<User>, RepositoryError>;
    /// Returns `None` when no user has the given id.
    async fn update(&self, id: &str, attrs: UserUpdate) -> Result<Option<User>, RepositoryError>;
    /// Returns `true` iff a user was removed.
    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;
    async fn count(&self) -> Result<i64, RepositoryError>;
}

#[derive(Clone, Debug)]
pub struct SqlUserRepository {
    pool: SqlitePool,
}

impl SqlUserRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn select_users(filter: &UserFilter) -> QueryBuilder<'static, Sqlite> {
    let mut builder = QueryBuilder::new(USER_COLUMNS);
    let mut separator = " WHERE ";
    if let Some(id) = &filter.id {
        builder.push(separator).push("id = ").push_bind(id.clone());
        separator = " AND ";
    }
    if let Some(email) = &filter.email {
        builder.push(separator).push("email = ").push_bind(email.clone());
    }
    builder.push(" ORDER BY created_at, id");
    builder
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

#[async_trait]
impl UserRepository for SqlUserRepository {
    async fn create(&self, attrs: NewUser) -> Result<User, RepositoryError> {
        let mut user = User::new(attrs.email);
        user.first_name = attrs.first_name;
        user.last_name = attrs.last_name;
        user.set_password(attrs.password.as_deref())?;

        let query = r"
            INSERT INTO users
                (id, email, password_hash, first_name, last_name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        ";
        let span = info_span!(
            "db.query",
            db.system = "sqlite",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(&user.id)
            .bind(&user.email)
            .bind(user.password_hash())
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(_) => Ok(user),
            Err(err) if is_unique_violation(&err) => Err(RepositoryError::Conflict(user.email)),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, RepositoryError> {
        let mut builder = select_users(filter);
        builder.push(" LIMIT 1");
        let span = info_span!(
            "db.query",
            db.system = "sqlite",
            db.operation = "SELECT",
            db.statement = builder.sql()
        );
        let user = builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;
        Ok(user)
    }

    async fn find_all(&self, filter: &UserFilter) -> Result<Vec<User>, RepositoryError> {
        let mut builder = select_users(filter);
        let span = info_span!(
            "db.query",
            db.system = "sqlite",
            db.operation = "SELECT",
            db.statement = builder.sql()
        );
        let users = builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .instrument(span)
            .await?;
        Ok(users)
    }

    async fn update(&self, id: &str, attrs: UserUpdate) -> Result<Option<User>, RepositoryError> {
        let Some(mut user) = self.find_one(&UserFilter::by_id(id)).await? else {
            return Ok(None);
        };
        if let Some(first_name) = attrs.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = attrs.last_name {
            user.last_name = Some(last_name);
        }
        user.updated_at = Utc::now();

        let query = "UPDATE users SET first_name = ?, last_name = ?, updated_at = ? WHERE id = ?";
        let span = info_span!(
            "db.query",
            db.system = "sqlite",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.updated_at)
            .bind(&user.id)
            .execute(&self.pool)
            .instrument(span)
            .await?;

        Ok(Some(user))
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let query = "DELETE FROM users WHERE id = ?";
        let span = info_span!(
            "db.query",
            db.system = "sqlite",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let query = "SELECT COUNT(*) FROM users";
        let span = info_span!(
            "db.query",
            db.system = "sqlite",
            db.operation = "SELECT",
            db.statement = query
        );
        let count = sqlx::query_scalar::<_, i64>(query)
            .fetch_one(&self.pool)
            .instrument(span)
            .await?;
        Ok(count)
    }
}
