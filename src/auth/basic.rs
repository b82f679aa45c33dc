//! HTTP Basic authentication against stored password hashes.

use async_trait::async_trait;
use axum::http::HeaderMap;
use base64ct::{Base64, Encoding};
use std::sync::Arc;
use tracing::debug;

use super::{AuthError, AuthStrategy, AuthType};
use crate::users::{RepositoryError, User, UserFilter, UserRepository};

const BASIC_PREFIX: &str = "Basic ";

/// Resolves `Authorization: Basic <base64(email:password)>`.
///
/// Each step of the pipeline is exposed on its own. A malformed header is
/// indistinguishable from a missing one; only repository failures are errors.
#[derive(Clone)]
pub struct BasicAuth {
    users: Arc<dyn UserRepository>,
}

impl BasicAuth {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// The part after the case-sensitive `"Basic "` prefix.
    #[must_use]
    pub fn extract_base64_authorization_header(header: &str) -> Option<&str> {
        header.strip_prefix(BASIC_PREFIX)
    }

    /// Strict, padded base64 that must also be valid UTF-8.
    #[must_use]
    pub fn decode_base64_authorization_header(encoded: &str) -> Option<String> {
        let bytes = Base64::decode_vec(encoded).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// Split on the first `:`; the password may contain more colons.
    #[must_use]
    pub fn extract_user_credentials(decoded: &str) -> Option<(&str, &str)> {
        decoded.split_once(':')
    }

    /// Look the user up by exact email and check the password.
    ///
    /// # Errors
    /// Propagates repository failures.
    pub async fn user_object_from_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let Some(user) = self.users.find_one(&UserFilter::by_email(email)).await? else {
            debug!("basic auth: unknown email");
            return Ok(None);
        };
        if !user.check_password(password).await {
            debug!(user_id = %user.id, "basic auth: password mismatch");
            return Ok(None);
        }
        Ok(Some(user))
    }
}

#[async_trait]
impl AuthStrategy for BasicAuth {
    fn auth_type(&self) -> AuthType {
        AuthType::Basic
    }

    async fn current_user(&self, headers: &HeaderMap) -> Result<Option<User>, AuthError> {
        let Some(header) = self.authorization_header(headers) else {
            return Ok(None);
        };
        let Some(decoded) = Self::extract_base64_authorization_header(&header)
            .and_then(Self::decode_base64_authorization_header)
        else {
            debug!("basic auth: malformed header");
            return Ok(None);
        };
        let Some((email, password)) = Self::extract_user_credentials(&decoded) else {
            debug!("basic auth: missing separator");
            return Ok(None);
        };
        Ok(self.user_object_from_credentials(email, password).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::users::{NewUser, SqlUserRepository};
    use axum::http::HeaderValue;

    const EMAIL: &str = "user@example.com";
    // 24 bytes, so the encoding has no padding and no spare bits.
    const PASSWORD: &str = "secret1";

    async fn basic_with_user() -> (BasicAuth, User) {
        let pool = db::connect(db::MEMORY_DSN).await.expect("pool");
        let users = SqlUserRepository::new(pool);
        let user = users
            .create(NewUser {
                email: EMAIL.to_string(),
                password: Some(PASSWORD.to_string()),
                ..NewUser::default()
            })
            .await
            .expect("create user");
        (BasicAuth::new(Arc::new(users)), user)
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(value).expect("header value"),
        );
        headers
    }

    fn encode(credentials: &str) -> String {
        Base64::encode_string(credentials.as_bytes())
    }

    #[test]
    fn prefix_is_case_sensitive_with_single_space() {
        assert_eq!(
            BasicAuth::extract_base64_authorization_header("Basic abc"),
            Some("abc")
        );
        assert_eq!(BasicAuth::extract_base64_authorization_header("basic abc"), None);
        assert_eq!(BasicAuth::extract_base64_authorization_header("Basicabc"), None);
        assert_eq!(BasicAuth::extract_base64_authorization_header("Bearer abc"), None);
        assert_eq!(
            BasicAuth::extract_base64_authorization_header("Basic  abc"),
            Some(" abc")
        );
    }

    #[test]
    fn decode_is_strict() {
        assert_eq!(
            BasicAuth::decode_base64_authorization_header(&encode("a@b.com:pw")),
            Some("a@b.com:pw".to_string())
        );
        assert_eq!(BasicAuth::decode_base64_authorization_header("not base64!"), None);
        assert_eq!(BasicAuth::decode_base64_authorization_header("YWJj="), None);
        assert_eq!(BasicAuth::decode_base64_authorization_header(" abc"), None);
        // Valid base64, invalid UTF-8.
        assert_eq!(BasicAuth::decode_base64_authorization_header("/w=="), None);
    }

    #[test]
    fn credentials_split_on_first_colon() {
        assert_eq!(
            BasicAuth::extract_user_credentials("a@b.com:pw:with:colons"),
            Some(("a@b.com", "pw:with:colons"))
        );
        assert_eq!(BasicAuth::extract_user_credentials("a@b.com:"), Some(("a@b.com", "")));
        assert_eq!(BasicAuth::extract_user_credentials("no separator"), None);
    }

    #[tokio::test]
    async fn resolves_user_with_valid_credentials() {
        let (basic, user) = basic_with_user().await;
        let headers = headers_with(&format!("Basic {}", encode(&format!("{EMAIL}:{PASSWORD}"))));
        let resolved = basic.current_user(&headers).await.expect("no error");
        assert_eq!(resolved.map(|found| found.id), Some(user.id));
    }

    #[tokio::test]
    async fn rejects_unknown_email_and_wrong_password() {
        let (basic, _) = basic_with_user().await;
        for credentials in [
            format!("other@example.com:{PASSWORD}"),
            format!("{EMAIL}:wrong"),
            format!("{EMAIL}:"),
        ] {
            let headers = headers_with(&format!("Basic {}", encode(&credentials)));
            assert_eq!(basic.current_user(&headers).await.expect("no error"), None);
        }
    }

    #[tokio::test]
    async fn missing_or_malformed_header_yields_none() {
        let (basic, _) = basic_with_user().await;
        assert_eq!(basic.current_user(&HeaderMap::new()).await.expect("no error"), None);
        for value in ["Bearer token", "Basic", "Basic !!!", "Basic bm9jb2xvbg=="] {
            let headers = headers_with(value);
            assert_eq!(basic.current_user(&headers).await.expect("no error"), None);
        }
    }

    #[tokio::test]
    async fn any_single_character_corruption_fails() {
        let (basic, _) = basic_with_user().await;
        let payload = encode(&format!("{EMAIL}:{PASSWORD}"));
        assert!(!payload.ends_with('='));

        for index in 0..payload.len() {
            let mut corrupted: Vec<char> = payload.chars().collect();
            corrupted[index] = if corrupted[index] == 'A' { 'B' } else { 'A' };
            let corrupted: String = corrupted.into_iter().collect();
            let headers = headers_with(&format!("Basic {corrupted}"));
            assert_eq!(
                basic.current_user(&headers).await.expect("no error"),
                None,
                "corruption at {index} resolved a user"
            );
        }
    }
}
