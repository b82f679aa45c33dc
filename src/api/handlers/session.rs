//! Session login and logout for the cookie strategies.

use axum::{
    Form, Json,
    extract::{Extension, rejection::FormRejection},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{InvalidHeaderValue, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use super::{UserResponse, users::Empty};
use crate::{
    api::error::{ApiError, ErrorBody},
    auth::{SessionManager, gate::RequestGate},
    users::{UserFilter, UserRepository},
};

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct LoginForm {
    pub email: Option<String>,
    #[schema(value_type = Option<String>, format = Password)]
    pub password: Option<SecretString>,
}

fn no_sessions() -> ApiError {
    ApiError::new(
        StatusCode::NOT_IMPLEMENTED,
        "Session authentication is not enabled",
    )
}

#[utoipa::path(
    post,
    path = "/api/v1/auth_session/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Logged in; session cookie set", body = UserResponse),
        (status = 400, description = "Missing email or password", body = ErrorBody),
        (status = 401, description = "Wrong password", body = ErrorBody),
        (status = 404, description = "Unknown email", body = ErrorBody),
        (status = 501, description = "Active strategy has no sessions", body = ErrorBody)
    ),
    tag = "auth_session"
)]
#[instrument(skip_all)]
pub async fn login(
    Extension(gate): Extension<Arc<RequestGate>>,
    Extension(users): Extension<Arc<dyn UserRepository>>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Response, ApiError> {
    let Some(sessions) = gate.strategy().and_then(|strategy| strategy.sessions()) else {
        return Err(no_sessions());
    };
    let form = form.map(|Form(form)| form).unwrap_or_default();

    let Some(email) = form.email.filter(|email| !email.is_empty()) else {
        return Err(ApiError::bad_request("email missing"));
    };
    let Some(password) = form
        .password
        .filter(|password| !password.expose_secret().is_empty())
    else {
        return Err(ApiError::bad_request("password missing"));
    };

    let Some(user) = users.find_one(&UserFilter::by_email(email)).await? else {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "no user found for this email",
        ));
    };
    if !user.check_password(password.expose_secret()).await {
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "wrong password"));
    }

    let Some(session_id) = sessions.create_session(&user.id).await? else {
        return Err(ApiError::internal());
    };
    info!(user_id = %user.id, "user logged in");

    let mut headers = HeaderMap::new();
    match session_cookie(sessions, &session_id) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return Err(ApiError::internal());
        }
    }
    Ok((StatusCode::OK, headers, Json(UserResponse::from(&user))).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/v1/auth_session/logout",
    responses(
        (status = 200, description = "Session destroyed", body = Empty),
        (status = 404, description = "No live session for this cookie", body = ErrorBody),
        (status = 501, description = "Active strategy has no sessions", body = ErrorBody)
    ),
    tag = "auth_session"
)]
pub async fn logout(
    Extension(gate): Extension<Arc<RequestGate>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let Some(sessions) = gate.strategy().and_then(|strategy| strategy.sessions()) else {
        return Err(no_sessions());
    };
    if !sessions.destroy_session(&headers).await? {
        return Err(ApiError::not_found());
    }

    // Clear the cookie alongside the server-side record.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(sessions) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    Ok((StatusCode::OK, response_headers, Json(Empty {})).into_response())
}

/// `HttpOnly` cookie carrying the session id, with `Max-Age` when sessions expire.
fn session_cookie(
    sessions: &dyn SessionManager,
    session_id: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{}={session_id}; Path=/; HttpOnly; SameSite=Lax",
        sessions.session_name()
    );
    if let Some(max_age) = sessions.max_age_seconds() {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(sessions: &dyn SessionManager) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        sessions.session_name()
    ))
}
