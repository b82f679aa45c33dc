//! Authentication strategies, session lifecycle and the request gate.
//!
//! One strategy is selected at startup from [`AuthType`] and handed to the
//! [`gate::RequestGate`]. Strategies share a single capability trait,
//! [`AuthStrategy`]; the ones that keep sessions also expose
//! [`SessionManager`] so the login and logout handlers can drive them without
//! knowing which variant is active.

pub mod basic;
pub mod clock;
pub mod credentials;
pub mod gate;
pub mod paths;
pub mod session;
pub mod store;

use async_trait::async_trait;
use axum::http::HeaderMap;
use sqlx::SqlitePool;
use std::{fmt, str::FromStr, sync::Arc};
use thiserror::Error;

use crate::users::{RepositoryError, User, UserRepository};

use self::{
    basic::BasicAuth,
    clock::{Clock, SystemClock},
    credentials::DEFAULT_SESSION_NAME,
    session::{SessionAuth, SessionDbAuth, SessionExpAuth},
    store::{MemorySessionStore, SqlSessionStore, SessionStore},
};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("failed to generate session id: {0}")]
    SessionId(#[from] rand::Error),
    #[error("session id collided {0} times in a row")]
    SessionIdCollision(usize),
}

/// Strategy names accepted by `AUTH_TYPE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthType {
    /// No strategy at all; the gate allows every request.
    None,
    /// The base strategy: auth is required but never satisfied.
    Default,
    Basic,
    Session,
    SessionExp,
    SessionDb,
}

impl AuthType {
    pub const VARIANTS: [&'static str; 6] = [
        "none",
        "default",
        "basic_auth",
        "session_auth",
        "session_exp_auth",
        "session_db_auth",
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Default => "default",
            Self::Basic => "basic_auth",
            Self::Session => "session_auth",
            Self::SessionExp => "session_exp_auth",
            Self::SessionDb => "session_db_auth",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "none" => Ok(Self::None),
            "default" => Ok(Self::Default),
            "basic_auth" => Ok(Self::Basic),
            "session_auth" => Ok(Self::Session),
            "session_exp_auth" => Ok(Self::SessionExp),
            "session_db_auth" => Ok(Self::SessionDb),
            other => Err(format!(
                "unknown auth type '{other}', expected one of: {}",
                Self::VARIANTS.join(", ")
            )),
        }
    }
}

#[derive(Clone)]
pub struct AuthConfig {
    auth_type: AuthType,
    session_name: String,
    session_duration_seconds: i64,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("auth_type", &self.auth_type)
            .field("session_name", &self.session_name)
            .field("session_duration_seconds", &self.session_duration_seconds)
            .finish_non_exhaustive()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new(auth_type: AuthType) -> Self {
        Self {
            auth_type,
            session_name: DEFAULT_SESSION_NAME.to_string(),
            session_duration_seconds: 0,
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_session_name(mut self, name: String) -> Self {
        self.session_name = name;
        self
    }

    /// Zero or negative means sessions never expire.
    #[must_use]
    pub fn with_session_duration_seconds(mut self, seconds: i64) -> Self {
        self.session_duration_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn auth_type(&self) -> AuthType {
        self.auth_type
    }

    #[must_use]
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    #[must_use]
    pub fn session_duration_seconds(&self) -> i64 {
        self.session_duration_seconds
    }

    /// Build the configured strategy. `None` when `AUTH_TYPE=none`.
    ///
    /// In-memory session stores are created here and owned by the strategy;
    /// `session_db_auth` persists through `pool`.
    #[must_use]
    pub fn build(
        &self,
        users: Arc<dyn UserRepository>,
        pool: &SqlitePool,
    ) -> Option<Arc<dyn AuthStrategy>> {
        let memory_store = || -> Arc<dyn SessionStore> { Arc::new(MemorySessionStore::new()) };
        let session = |store: Arc<dyn SessionStore>| {
            SessionAuth::new(store, Arc::clone(&users))
                .with_session_name(self.session_name.clone())
                .with_clock(Arc::clone(&self.clock))
        };

        let strategy: Arc<dyn AuthStrategy> = match self.auth_type {
            AuthType::None => return None,
            AuthType::Default => Arc::new(NoAuth),
            AuthType::Basic => Arc::new(BasicAuth::new(Arc::clone(&users))),
            AuthType::Session => Arc::new(session(memory_store())),
            AuthType::SessionExp => Arc::new(SessionExpAuth::new(
                session(memory_store()),
                self.session_duration_seconds,
            )),
            AuthType::SessionDb => Arc::new(SessionDbAuth::new(SessionExpAuth::new(
                session(Arc::new(SqlSessionStore::new(pool.clone()))),
                self.session_duration_seconds,
            ))),
        };
        Some(strategy)
    }
}

/// Capability shared by every strategy.
///
/// Only [`AuthStrategy::auth_type`] is required; the base behaviour never
/// resolves a principal, so a strategy that overrides nothing fails closed.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    fn auth_type(&self) -> AuthType;

    /// See [`paths::require_auth`].
    fn require_auth(&self, path: Option<&str>, excluded_paths: &[String]) -> bool {
        paths::require_auth(path, excluded_paths)
    }

    fn authorization_header(&self, headers: &HeaderMap) -> Option<String> {
        credentials::authorization_header(headers)
    }

    fn session_cookie(&self, headers: &HeaderMap) -> Option<String> {
        credentials::session_cookie(headers, DEFAULT_SESSION_NAME)
    }

    /// Whatever the gate should treat as "a credential was presented".
    fn credential(&self, headers: &HeaderMap) -> Option<String> {
        self.authorization_header(headers)
    }

    /// # Errors
    /// Only storage failures are errors; anything that merely fails to
    /// identify a user is `Ok(None)`.
    async fn current_user(&self, _headers: &HeaderMap) -> Result<Option<User>, AuthError> {
        Ok(None)
    }

    /// Session lifecycle, for strategies that have one.
    fn sessions(&self) -> Option<&dyn SessionManager> {
        None
    }
}

/// Session lifecycle shared by the cookie strategies.
#[async_trait]
pub trait SessionManager: Send + Sync {
    fn session_store(&self) -> &dyn SessionStore;

    fn session_name(&self) -> &str;

    /// Lifetime to advertise on the cookie, if sessions expire.
    fn max_age_seconds(&self) -> Option<i64> {
        None
    }

    /// Start a session for `user_id`. A blank id yields `Ok(None)`.
    ///
    /// # Errors
    /// Fails if the id cannot be generated or the store is unavailable.
    async fn create_session(&self, user_id: &str) -> Result<Option<String>, AuthError>;

    /// User id behind a live session, `None` if unknown, expired or blank.
    ///
    /// # Errors
    /// Fails if the store is unavailable.
    async fn user_id_for_session(&self, session_id: &str) -> Result<Option<String>, AuthError>;

    /// End the session named by the request cookie.
    ///
    /// `false` when there is no cookie, the session is not live, or another
    /// caller removed it first.
    ///
    /// # Errors
    /// Fails if the store is unavailable.
    async fn destroy_session(&self, headers: &HeaderMap) -> Result<bool, AuthError> {
        let Some(session_id) = credentials::session_cookie(headers, self.session_name()) else {
            return Ok(false);
        };
        if self.user_id_for_session(&session_id).await?.is_none() {
            return Ok(false);
        }
        Ok(self.session_store().delete(&session_id).await?)
    }
}

/// Base strategy: every protected request is refused.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAuth;

impl AuthStrategy for NoAuth {
    fn auth_type(&self) -> AuthType {
        AuthType::Default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, users::SqlUserRepository};
    use axum::http::HeaderValue;

    #[test]
    fn auth_type_names_round_trip() {
        for name in AuthType::VARIANTS {
            let parsed: AuthType = name.parse().expect("known name");
            assert_eq!(parsed.as_str(), name);
            assert_eq!(parsed.to_string(), name);
        }
        assert!("session".parse::<AuthType>().is_err());
        assert!("".parse::<AuthType>().is_err());
    }

    #[tokio::test]
    async fn no_auth_never_resolves_a_principal() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert_eq!(NoAuth.credential(&headers), Some("Basic Zm9vOmJhcg==".to_string()));
        assert_eq!(NoAuth.current_user(&headers).await.expect("no error"), None);
        assert!(NoAuth.sessions().is_none());
        assert!(NoAuth.require_auth(Some("/api/v1/users"), &[]));
    }

    #[tokio::test]
    async fn build_selects_strategy_by_type() {
        let pool = db::connect(db::MEMORY_DSN).await.expect("pool");
        let users: Arc<dyn UserRepository> = Arc::new(SqlUserRepository::new(pool.clone()));

        assert!(
            AuthConfig::new(AuthType::None)
                .build(Arc::clone(&users), &pool)
                .is_none()
        );

        for auth_type in [
            AuthType::Default,
            AuthType::Basic,
            AuthType::Session,
            AuthType::SessionExp,
            AuthType::SessionDb,
        ] {
            let strategy = AuthConfig::new(auth_type)
                .with_session_name("sid".to_string())
                .build(Arc::clone(&users), &pool)
                .expect("strategy");
            assert_eq!(strategy.auth_type(), auth_type);

            let has_sessions = matches!(
                auth_type,
                AuthType::Session | AuthType::SessionExp | AuthType::SessionDb
            );
            assert_eq!(strategy.sessions().is_some(), has_sessions);
            if let Some(sessions) = strategy.sessions() {
                assert_eq!(sessions.session_name(), "sid");
            }
        }
    }
}
