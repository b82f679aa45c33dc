//! Per-request authentication, independent of the active strategy.

use axum::http::HeaderMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

use super::{AuthError, AuthStrategy};
use crate::users::User;

/// Routes reachable without credentials unless overridden.
pub const DEFAULT_EXCLUDED_PATHS: [&str; 4] = [
    "/api/v1/status/",
    "/api/v1/unauthorized/",
    "/api/v1/forbidden/",
    "/api/v1/auth_session/login/",
];

#[derive(Debug, Error)]
pub enum GateError {
    /// No credential was presented.
    #[error("unauthenticated")]
    Unauthenticated,
    /// A credential was presented but did not resolve to a user.
    #[error("forbidden")]
    Forbidden,
    /// Resolution failed; never reported as an auth failure.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[derive(Clone)]
pub struct RequestGate {
    strategy: Option<Arc<dyn AuthStrategy>>,
    excluded_paths: Vec<String>,
}

impl RequestGate {
    #[must_use]
    pub fn new(strategy: Option<Arc<dyn AuthStrategy>>, excluded_paths: Vec<String>) -> Self {
        Self {
            strategy,
            excluded_paths,
        }
    }

    #[must_use]
    pub fn default_excluded_paths() -> Vec<String> {
        DEFAULT_EXCLUDED_PATHS
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[must_use]
    pub fn strategy(&self) -> Option<&Arc<dyn AuthStrategy>> {
        self.strategy.as_ref()
    }

    #[must_use]
    pub fn excluded_paths(&self) -> &[String] {
        &self.excluded_paths
    }

    /// Decide whether the request may proceed.
    ///
    /// `Ok(Some(user))` carries the principal for downstream handlers;
    /// `Ok(None)` means the route is open or no strategy is configured.
    ///
    /// # Errors
    /// [`GateError::Unauthenticated`] without a credential,
    /// [`GateError::Forbidden`] when it resolves to nobody, and
    /// [`GateError::Auth`] when resolution itself failed.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn authorize(&self, path: &str, headers: &HeaderMap) -> Result<Option<User>, GateError> {
        let Some(strategy) = &self.strategy else {
            return Ok(None);
        };
        if !strategy.require_auth(Some(path), &self.excluded_paths) {
            debug!("path excluded from auth");
            return Ok(None);
        }
        if strategy.credential(headers).is_none() {
            return Err(GateError::Unauthenticated);
        }
        match strategy.current_user(headers).await? {
            Some(user) => Ok(Some(user)),
            None => Err(GateError::Forbidden),
        }
    }
}
