//! Credential extraction from request headers.

use axum::http::{
    HeaderMap,
    header::{AUTHORIZATION, COOKIE},
};

/// Cookie name used when `SESSION_NAME` is not set.
pub const DEFAULT_SESSION_NAME: &str = "session_id";

/// Raw `Authorization` header value. Header names are case-insensitive.
#[must_use]
pub fn authorization_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

/// Value of the cookie called `name`, searching every `Cookie` header.
#[must_use]
pub fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| val.trim().to_string())
        })
}
