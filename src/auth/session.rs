//! Cookie-carried server-side sessions.
//!
//! [`SessionAuth`] keeps the mapping in whatever [`SessionStore`] it is given.
//! [`SessionExpAuth`] wraps it and filters out sessions older than the
//! configured duration at read time; nothing is evicted. [`SessionDbAuth`] is
//! the expiring variant over a persistent store.

use async_trait::async_trait;
use axum::http::HeaderMap;
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Duration;
use rand::{RngCore, rngs::OsRng};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{
    AuthError, AuthStrategy, AuthType, SessionManager,
    clock::{Clock, SystemClock},
    credentials::{self, DEFAULT_SESSION_NAME},
    store::{SessionRecord, SessionStore},
};
use crate::users::{User, UserFilter, UserRepository};

const SESSION_ID_BYTES: usize = 32;
const SESSION_ID_ATTEMPTS: usize = 3;

/// Generate a random opaque session id (URL-safe, unpadded).
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn generate_session_id() -> Result<String, rand::Error> {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

#[derive(Clone)]
pub struct SessionAuth {
    store: Arc<dyn SessionStore>,
    users: Arc<dyn UserRepository>,
    session_name: String,
    clock: Arc<dyn Clock>,
}

impl SessionAuth {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, users: Arc<dyn UserRepository>) -> Self {
        Self {
            store,
            users,
            session_name: DEFAULT_SESSION_NAME.to_string(),
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_session_name(mut self, name: String) -> Self {
        self.session_name = name;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Raw record lookup, without any expiry check.
    ///
    /// # Errors
    /// Fails if the store is unavailable.
    pub async fn session_record(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionRecord>, AuthError> {
        if session_id.trim().is_empty() {
            return Ok(None);
        }
        Ok(self.store.get(session_id).await?)
    }
}

#[async_trait]
impl SessionManager for SessionAuth {
    fn session_store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    fn session_name(&self) -> &str {
        &self.session_name
    }

    async fn create_session(&self, user_id: &str) -> Result<Option<String>, AuthError> {
        if user_id.trim().is_empty() {
            return Ok(None);
        }
        for attempt in 1..=SESSION_ID_ATTEMPTS {
            let session_id = generate_session_id()?;
            let record = SessionRecord::new(user_id, self.clock.now());
            if self.store.put(&session_id, record).await? {
                debug!(user_id, "session created");
                return Ok(Some(session_id));
            }
            warn!(attempt, "session id collision, regenerating");
        }
        Err(AuthError::SessionIdCollision(SESSION_ID_ATTEMPTS))
    }

    async fn user_id_for_session(&self, session_id: &str) -> Result<Option<String>, AuthError> {
        Ok(self
            .session_record(session_id)
            .await?
            .map(|record| record.user_id))
    }
}

#[async_trait]
impl AuthStrategy for SessionAuth {
    fn auth_type(&self) -> AuthType {
        AuthType::Session
    }

    fn session_cookie(&self, headers: &HeaderMap) -> Option<String> {
        credentials::session_cookie(headers, &self.session_name)
    }

    fn credential(&self, headers: &HeaderMap) -> Option<String> {
        self.session_cookie(headers)
    }

    async fn current_user(&self, headers: &HeaderMap) -> Result<Option<User>, AuthError> {
        user_for_session_cookie(self, self.users.as_ref(), headers).await
    }

    fn sessions(&self) -> Option<&dyn SessionManager> {
        Some(self)
    }
}

/// cookie → live session → user. `None` at the first missing link.
async fn user_for_session_cookie(
    sessions: &dyn SessionManager,
    users: &dyn UserRepository,
    headers: &HeaderMap,
) -> Result<Option<User>, AuthError> {
    let Some(session_id) = credentials::session_cookie(headers, sessions.session_name()) else {
        return Ok(None);
    };
    let Some(user_id) = sessions.user_id_for_session(&session_id).await? else {
        return Ok(None);
    };
    Ok(users.find_one(&UserFilter::by_id(user_id)).await?)
}

/// [`SessionAuth`] whose sessions stop resolving `duration` seconds after
/// creation.
#[derive(Clone)]
pub struct SessionExpAuth {
    inner: SessionAuth,
    duration: Option<Duration>,
}

impl SessionExpAuth {
    /// `duration_seconds <= 0` disables expiry.
    #[must_use]
    pub fn new(inner: SessionAuth, duration_seconds: i64) -> Self {
        let duration = Some(duration_seconds)
            .filter(|seconds| *seconds > 0)
            .and_then(Duration::try_seconds);
        Self { inner, duration }
    }

    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    #[must_use]
    pub fn is_expired(&self, record: &SessionRecord) -> bool {
        let Some(duration) = self.duration else {
            return false;
        };
        record
            .created_at
            .checked_add_signed(duration)
            .is_some_and(|expires_at| expires_at < self.inner.clock().now())
    }
}

#[async_trait]
impl SessionManager for SessionExpAuth {
    fn session_store(&self) -> &dyn SessionStore {
        self.inner.session_store()
    }

    fn session_name(&self) -> &str {
        self.inner.session_name()
    }

    fn max_age_seconds(&self) -> Option<i64> {
        self.duration.map(|duration| duration.num_seconds())
    }

    async fn create_session(&self, user_id: &str) -> Result<Option<String>, AuthError> {
        self.inner.create_session(user_id).await
    }

    async fn user_id_for_session(&self, session_id: &str) -> Result<Option<String>, AuthError> {
        let Some(record) = self.inner.session_record(session_id).await? else {
            return Ok(None);
        };
        if self.is_expired(&record) {
            debug!("session expired");
            return Ok(None);
        }
        Ok(Some(record.user_id))
    }
}

#[async_trait]
impl AuthStrategy for SessionExpAuth {
    fn auth_type(&self) -> AuthType {
        AuthType::SessionExp
    }

    fn session_cookie(&self, headers: &HeaderMap) -> Option<String> {
        self.inner.session_cookie(headers)
    }

    fn credential(&self, headers: &HeaderMap) -> Option<String> {
        self.session_cookie(headers)
    }

    async fn current_user(&self, headers: &HeaderMap) -> Result<Option<User>, AuthError> {
        user_for_session_cookie(self, self.inner.users.as_ref(), headers).await
    }

    fn sessions(&self) -> Option<&dyn SessionManager> {
        Some(self)
    }
}

/// Expiring sessions kept in durable storage, so they survive a restart.
///
/// Build the inner [`SessionAuth`] over a
/// [`SqlSessionStore`](super::store::SqlSessionStore).
#[derive(Clone)]
pub struct SessionDbAuth {
    inner: SessionExpAuth,
}

impl SessionDbAuth {
    #[must_use]
    pub fn new(inner: SessionExpAuth) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl SessionManager for SessionDbAuth {
    fn session_store(&self) -> &dyn SessionStore {
        self.inner.session_store()
    }

    fn session_name(&self) -> &str {
        self.inner.session_name()
    }

    fn max_age_seconds(&self) -> Option<i64> {
        self.inner.max_age_seconds()
    }

    async fn create_session(&self, user_id: &str) -> Result<Option<String>, AuthError> {
        self.inner.create_session(user_id).await
    }

    async fn user_id_for_session(&self, session_id: &str) -> Result<Option<String>, AuthError> {
        self.inner.user_id_for_session(session_id).await
    }
}

#[async_trait]
impl AuthStrategy for SessionDbAuth {
    fn auth_type(&self) -> AuthType {
        AuthType::SessionDb
    }

    fn session_cookie(&self, headers: &HeaderMap) -> Option<String> {
        self.inner.session_cookie(headers)
    }

    fn credential(&self, headers: &HeaderMap) -> Option<String> {
        self.session_cookie(headers)
    }

    async fn current_user(&self, headers: &HeaderMap) -> Result<Option<User>, AuthError> {
        user_for_session_cookie(self, self.inner.inner.users.as_ref(), headers).await
    }

    fn sessions(&self) -> Option<&dyn SessionManager> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        clock::ManualClock,
        store::{MemorySessionStore, SqlSessionStore, testing::CollidingStore},
    };
    use crate::db;
    use crate::users::{NewUser, SqlUserRepository};
    use axum::http::{HeaderValue, header::COOKIE};
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    struct Fixture {
        store: Arc<dyn SessionStore>,
        users: Arc<dyn UserRepository>,
        user: User,
    }

    async fn fixture(persistent: bool) -> Fixture {
        let pool = db::connect(db::MEMORY_DSN).await.expect("pool");
        let users = SqlUserRepository::new(pool.clone());
        let user = users
            .create(NewUser {
                email: "a@b.com".to_string(),
                password: Some("pw123".to_string()),
                ..NewUser::default()
            })
            .await
            .expect("create user");
        let store: Arc<dyn SessionStore> = if persistent {
            Arc::new(SqlSessionStore::new(pool))
        } else {
            Arc::new(MemorySessionStore::new())
        };
        Fixture {
            store,
            users: Arc::new(users),
            user,
        }
    }

    fn cookie(name: &str, session_id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{name}={session_id}")).expect("cookie"),
        );
        headers
    }

    fn manual_clock() -> Arc<ManualClock> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Arc::new(ManualClock::new(start))
    }

    #[test]
    fn session_ids_are_unique_and_url_safe() {
        let ids: HashSet<String> = (0..256)
            .map(|_| generate_session_id().expect("session id"))
            .collect();
        assert_eq!(ids.len(), 256);
        for id in &ids {
            assert_eq!(id.len(), 43);
            assert!(
                id.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            );
        }
    }

    #[tokio::test]
    async fn create_then_lookup_round_trips() {
        let fx = fixture(false).await;
        let auth = SessionAuth::new(fx.store, fx.users);
        let session_id = auth
            .create_session(&fx.user.id)
            .await
            .expect("create")
            .expect("session id");
        assert_eq!(
            auth.user_id_for_session(&session_id).await.expect("lookup"),
            Some(fx.user.id)
        );
    }

    #[tokio::test]
    async fn create_session_gives_up_after_repeated_collisions() {
        let fx = fixture(false).await;
        let store = Arc::new(CollidingStore::default());
        let auth = SessionAuth::new(store.clone(), fx.users);

        let result = auth.create_session(&fx.user.id).await;
        assert!(matches!(result, Err(AuthError::SessionIdCollision(3))));
        assert_eq!(store.puts(), 3);
    }

    #[tokio::test]
    async fn blank_inputs_are_rejected() {
        let fx = fixture(false).await;
        let auth = SessionAuth::new(fx.store, fx.users);
        assert_eq!(auth.create_session("").await.expect("create"), None);
        assert_eq!(auth.create_session("   ").await.expect("create"), None);
        assert_eq!(auth.user_id_for_session("").await.expect("lookup"), None);
        assert_eq!(auth.user_id_for_session("unknown").await.expect("lookup"), None);
    }

    #[tokio::test]
    async fn current_user_follows_the_named_cookie() {
        let fx = fixture(false).await;
        let auth = SessionAuth::new(fx.store, fx.users).with_session_name("sid".to_string());
        let session_id = auth
            .create_session(&fx.user.id)
            .await
            .expect("create")
            .expect("session id");

        let headers = cookie("sid", &session_id);
        assert_eq!(auth.credential(&headers), Some(session_id.clone()));
        let resolved = auth.current_user(&headers).await.expect("resolve");
        assert_eq!(resolved.map(|user| user.id), Some(fx.user.id.clone()));

        let wrong_name = cookie(DEFAULT_SESSION_NAME, &session_id);
        assert_eq!(auth.credential(&wrong_name), None);
        assert_eq!(auth.current_user(&wrong_name).await.expect("resolve"), None);
        assert_eq!(
            auth.current_user(&cookie("sid", "bogus")).await.expect("resolve"),
            None
        );
    }

    #[tokio::test]
    async fn current_user_is_none_once_user_is_deleted() {
        let fx = fixture(false).await;
        let auth = SessionAuth::new(fx.store, Arc::clone(&fx.users));
        let session_id = auth
            .create_session(&fx.user.id)
            .await
            .expect("create")
            .expect("session id");
        assert!(fx.users.delete(&fx.user.id).await.expect("delete"));

        let headers = cookie(DEFAULT_SESSION_NAME, &session_id);
        assert_eq!(auth.current_user(&headers).await.expect("resolve"), None);
    }

    #[tokio::test]
    async fn destroy_reports_true_exactly_once() {
        let fx = fixture(false).await;
        let auth = SessionAuth::new(fx.store, fx.users);
        assert!(!auth.destroy_session(&HeaderMap::new()).await.expect("destroy"));
        assert!(
            !auth
                .destroy_session(&cookie(DEFAULT_SESSION_NAME, "never-created"))
                .await
                .expect("destroy")
        );

        let session_id = auth
            .create_session(&fx.user.id)
            .await
            .expect("create")
            .expect("session id");
        let headers = cookie(DEFAULT_SESSION_NAME, &session_id);
        assert!(auth.destroy_session(&headers).await.expect("destroy"));
        assert!(!auth.destroy_session(&headers).await.expect("destroy again"));
        assert_eq!(auth.user_id_for_session(&session_id).await.expect("lookup"), None);
    }

    #[tokio::test]
    async fn concurrent_destroy_succeeds_once() {
        let fx = fixture(false).await;
        let auth = Arc::new(SessionAuth::new(fx.store, fx.users));
        let session_id = auth
            .create_session(&fx.user.id)
            .await
            .expect("create")
            .expect("session id");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let auth = Arc::clone(&auth);
                let headers = cookie(DEFAULT_SESSION_NAME, &session_id);
                tokio::spawn(async move { auth.destroy_session(&headers).await.expect("destroy") })
            })
            .collect();

        let mut destroyed = 0;
        for handle in handles {
            if handle.await.expect("join") {
                destroyed += 1;
            }
        }
        assert_eq!(destroyed, 1);
    }

    #[tokio::test]
    async fn a_user_may_hold_several_sessions() {
        let fx = fixture(false).await;
        let auth = SessionAuth::new(fx.store, fx.users);
        let first = auth.create_session(&fx.user.id).await.expect("create");
        let second = auth.create_session(&fx.user.id).await.expect("create");
        assert!(first.is_some() && second.is_some());
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn expiry_is_a_read_time_filter() {
        let fx = fixture(false).await;
        let clock = manual_clock();
        let auth = SessionExpAuth::new(
            SessionAuth::new(Arc::clone(&fx.store), fx.users).with_clock(clock.clone()),
            1,
        );
        let session_id = auth
            .create_session(&fx.user.id)
            .await
            .expect("create")
            .expect("session id");

        assert_eq!(
            auth.user_id_for_session(&session_id).await.expect("lookup"),
            Some(fx.user.id.clone())
        );

        // Age equal to the duration is still valid.
        clock.advance(1);
        assert!(auth.user_id_for_session(&session_id).await.expect("lookup").is_some());

        clock.advance(1);
        assert_eq!(auth.user_id_for_session(&session_id).await.expect("lookup"), None);
        let headers = cookie(DEFAULT_SESSION_NAME, &session_id);
        assert_eq!(auth.current_user(&headers).await.expect("resolve"), None);

        // Still in the store, and an expired session cannot be destroyed.
        let record = fx.store.get(&session_id).await.expect("get");
        assert_eq!(record.map(|record| record.user_id), Some(fx.user.id));
        assert!(!auth.destroy_session(&headers).await.expect("destroy"));
        assert!(fx.store.get(&session_id).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn non_positive_duration_never_expires() {
        for duration in [0, -5] {
            let fx = fixture(false).await;
            let clock = manual_clock();
            let auth = SessionExpAuth::new(
                SessionAuth::new(fx.store, fx.users).with_clock(clock.clone()),
                duration,
            );
            assert_eq!(auth.duration(), None);
            assert_eq!(auth.max_age_seconds(), None);
            let session_id = auth
                .create_session(&fx.user.id)
                .await
                .expect("create")
                .expect("session id");
            clock.advance(10 * 365 * 24 * 60 * 60);
            assert_eq!(
                auth.user_id_for_session(&session_id).await.expect("lookup"),
                Some(fx.user.id)
            );
        }
    }

    #[tokio::test]
    async fn persistent_sessions_expire_and_destroy() {
        let fx = fixture(true).await;
        let clock = manual_clock();
        let auth = SessionDbAuth::new(SessionExpAuth::new(
            SessionAuth::new(Arc::clone(&fx.store), fx.users).with_clock(clock.clone()),
            60,
        ));
        assert_eq!(auth.max_age_seconds(), Some(60));

        let session_id = auth
            .create_session(&fx.user.id)
            .await
            .expect("create")
            .expect("session id");
        let headers = cookie(DEFAULT_SESSION_NAME, &session_id);
        let resolved = auth.current_user(&headers).await.expect("resolve");
        assert_eq!(resolved.map(|user| user.id), Some(fx.user.id.clone()));

        clock.advance(61);
        assert_eq!(auth.current_user(&headers).await.expect("resolve"), None);
        assert!(fx.store.get(&session_id).await.expect("get").is_some());

        clock.advance(-61);
        assert!(auth.destroy_session(&headers).await.expect("destroy"));
        assert!(fx.store.get(&session_id).await.expect("get").is_none());
    }
}
