#![allow(dead_code)]

use authgate::{
    api::{self, AppState},
    auth::{AuthConfig, AuthType, gate::RequestGate},
    db,
    users::{NewUser, User, UserRepository},
};
use axum::{
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;

pub const EMAIL: &str = "a@b.com";
pub const PASSWORD: &str = "pw123";
// base64("a@b.com:pw123")
pub const BASIC_HEADER: &str = "Basic YUBiLmNvbTpwdzEyMw==";

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: Value,
}

impl Reply {
    pub fn error(&self) -> Option<&str> {
        self.json.get("error").and_then(Value::as_str)
    }

    /// `name=value` from the first `Set-Cookie` header.
    pub fn cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(ToString::to_string)
    }
}

pub async fn state(config: &AuthConfig) -> AppState {
    state_with_dsn(config, db::MEMORY_DSN).await
}

pub async fn state_with_dsn(config: &AuthConfig, dsn: &str) -> AppState {
    let pool = db::connect(dsn).await.expect("pool");
    AppState::new(pool, config, RequestGate::default_excluded_paths())
}

pub async fn state_for(auth_type: AuthType) -> AppState {
    state(&AuthConfig::new(auth_type)).await
}

pub async fn create_user(state: &AppState) -> User {
    state
        .users
        .create(NewUser {
            email: EMAIL.to_string(),
            password: Some(PASSWORD.to_string()),
            ..NewUser::default()
        })
        .await
        .expect("create user")
}

pub async fn send(state: &AppState, request: Request<Body>) -> Reply {
    let response = api::app(state.clone())
        .oneshot(request)
        .await
        .expect("infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    Reply {
        status,
        headers,
        json,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    request("GET", uri, &[], Body::empty())
}

pub fn request(
    method: &str,
    uri: &str,
    headers: &[(header::HeaderName, &str)],
    body: Body,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(name.clone(), *value);
    }
    builder.body(body).expect("request")
}

pub fn json(method: &str, uri: &str, auth: Option<&str>, body: &Value) -> Request<Body> {
    let mut headers = vec![(header::CONTENT_TYPE, "application/json")];
    if let Some(auth) = auth {
        headers.push((header::AUTHORIZATION, auth));
    }
    request(method, uri, &headers, Body::from(body.to_string()))
}

pub fn login(email: &str, password: &str) -> Request<Body> {
    let form = format!("email={}&password={password}", email.replace('@', "%40"));
    request(
        "POST",
        "/api/v1/auth_session/login",
        &[(header::CONTENT_TYPE, "application/x-www-form-urlencoded")],
        Body::from(form),
    )
}

pub fn with_cookie(method: &str, uri: &str, cookie: &str) -> Request<Body> {
    request(method, uri, &[(header::COOKIE, cookie)], Body::empty())
}
