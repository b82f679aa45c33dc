//! Service-level routes: status, stats and the canned error endpoints.

use axum::{Json, extract::Extension};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    api::error::{ApiError, ErrorBody},
    users::UserRepository,
};

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Status {
    pub status: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Stats {
    pub users: i64,
}

#[utoipa::path(
    get,
    path = "/api/v1/status",
    responses((status = 200, description = "API is up", body = Status)),
    tag = "index"
)]
pub async fn status() -> Json<Status> {
    Json(Status {
        status: "OK".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/stats",
    responses((status = 200, description = "Object counts", body = Stats)),
    tag = "index"
)]
pub async fn stats(
    Extension(users): Extension<Arc<dyn UserRepository>>,
) -> Result<Json<Stats>, ApiError> {
    let users = users.count().await?;
    Ok(Json(Stats { users }))
}

#[utoipa::path(
    get,
    path = "/api/v1/unauthorized",
    responses((status = 401, description = "Always unauthorized", body = ErrorBody)),
    tag = "index"
)]
pub async fn unauthorized() -> ApiError {
    ApiError::unauthorized()
}

#[utoipa::path(
    get,
    path = "/api/v1/forbidden",
    responses((status = 403, description = "Always forbidden", body = ErrorBody)),
    tag = "index"
)]
pub async fn forbidden() -> ApiError {
    ApiError::forbidden()
}

pub async fn not_found() -> ApiError {
    ApiError::not_found()
}
