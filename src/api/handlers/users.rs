//! User CRUD. `GET /users/me` returns the principal attached by the gate.

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use super::UserResponse;
use crate::{
    api::{
        error::{ApiError, ErrorBody},
        gate::CurrentUser,
    },
    users::{NewUser, RepositoryError, UserFilter, UserRepository, UserUpdate},
};

const ME: &str = "me";

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct CreateUser {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(ToSchema, Serialize, Debug, Default)]
pub struct Empty {}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses((status = 200, description = "All users", body = [UserResponse])),
    tag = "users"
)]
pub async fn list_users(
    Extension(users): Extension<Arc<dyn UserRepository>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let all = users.find_all(&UserFilter::default()).await?;
    Ok(Json(all.iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    params(("user_id" = String, Path, description = "User id, or `me` for the authenticated user")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn get_user(
    Path(user_id): Path<String>,
    Extension(users): Extension<Arc<dyn UserRepository>>,
    current_user: Option<Extension<CurrentUser>>,
) -> Result<Json<UserResponse>, ApiError> {
    if user_id == ME {
        return current_user
            .map(|Extension(CurrentUser(user))| Json(UserResponse::from(&user)))
            .ok_or_else(ApiError::not_found);
    }
    users
        .find_one(&UserFilter::by_id(user_id))
        .await?
        .map(|user| Json(UserResponse::from(&user)))
        .ok_or_else(ApiError::not_found)
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid payload or duplicate email", body = ErrorBody)
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn create_user(
    Extension(users): Extension<Arc<dyn UserRepository>>,
    payload: Result<Json<CreateUser>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Ok(Json(payload)) = payload else {
        return Err(ApiError::bad_request("Wrong format"));
    };
    let Some(email) = non_empty(payload.email) else {
        return Err(ApiError::bad_request("email missing"));
    };
    let Some(password) = non_empty(payload.password) else {
        return Err(ApiError::bad_request("password missing"));
    };

    let attrs = NewUser {
        email,
        password: Some(password),
        first_name: payload.first_name,
        last_name: payload.last_name,
    };
    match users.create(attrs).await {
        Ok(user) => {
            debug!(user_id = %user.id, "user created");
            Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
        }
        Err(err @ RepositoryError::Conflict(_)) => {
            Err(ApiError::bad_request(format!("Can't create User: {err}")))
        }
        Err(err) => Err(err.into()),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    params(("user_id" = String, Path, description = "User id")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn update_user(
    Path(user_id): Path<String>,
    Extension(users): Extension<Arc<dyn UserRepository>>,
    payload: Result<Json<UpdateUser>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    if users.find_one(&UserFilter::by_id(&user_id)).await?.is_none() {
        return Err(ApiError::not_found());
    }
    let Ok(Json(payload)) = payload else {
        return Err(ApiError::bad_request("Wrong format"));
    };

    let attrs = UserUpdate {
        first_name: non_empty(payload.first_name),
        last_name: non_empty(payload.last_name),
    };
    users
        .update(&user_id, attrs)
        .await?
        .map(|user| Json(UserResponse::from(&user)))
        .ok_or_else(ApiError::not_found)
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = Empty),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn delete_user(
    Path(user_id): Path<String>,
    Extension(users): Extension<Arc<dyn UserRepository>>,
) -> Result<Json<Empty>, ApiError> {
    if users.delete(&user_id).await? {
        Ok(Json(Empty {}))
    } else {
        Err(ApiError::not_found())
    }
}
