//! User accounts: the record, password handling, and the repository that
//! persists them.

pub mod password;
pub mod repository;

pub use repository::{
    NewUser, RepositoryError, SqlUserRepository, UserFilter, UserRepository, UserUpdate,
};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use self::password::{PasswordError, hash_password, verify_password, verify_password_blocking};

/// Timestamp layout used when users are rendered as JSON.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a user with a fresh identifier and no password.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.into(),
            password_hash: None,
            first_name: None,
            last_name: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the stored hash. Empty or missing input clears it.
    ///
    /// # Errors
    /// Returns an error if hashing fails.
    pub fn set_password(&mut self, password: Option<&str>) -> Result<(), PasswordError> {
        self.password_hash = match password {
            Some(password) if !password.is_empty() => Some(hash_password(password)?),
            _ => None,
        };
        Ok(())
    }

    #[must_use]
    pub fn password_hash(&self) -> Option<&str> {
        self.password_hash.as_deref()
    }

    #[must_use]
    pub fn is_valid_password(&self, password: &str) -> bool {
        if password.is_empty() {
            return false;
        }
        self.password_hash
            .as_deref()
            .is_some_and(|hash| verify_password(password, hash))
    }

    /// [`Self::is_valid_password`] without blocking the async runtime.
    pub async fn check_password(&self, password: &str) -> bool {
        let Some(hash) = self.password_hash.clone().filter(|_| !password.is_empty()) else {
            return false;
        };
        verify_password_blocking(password.to_string(), hash).await
    }

    /// Email when no names are set, otherwise `"first last"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or_default();
        let last = self.last_name.as_deref().unwrap_or_default();
        if first.is_empty() && last.is_empty() {
            return self.email.clone();
        }
        format!("{first} {last}").trim().to_string()
    }
}
