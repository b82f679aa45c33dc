#![allow(clippy::needless_for_each)]

use utoipa::OpenApi;

use super::{
    error::ErrorBody,
    handlers::{
        UserResponse, health, index, session,
        users::{self, CreateUser, Empty, UpdateUser},
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        index::status,
        index::stats,
        index::unauthorized,
        index::forbidden,
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        session::login,
        session::logout,
    ),
    components(
        schemas(
            health::Health,
            index::Status,
            index::Stats,
            UserResponse,
            CreateUser,
            UpdateUser,
            Empty,
            session::LoginForm,
            ErrorBody
        )
    ),
    tags(
        (name = "index", description = "Service status"),
        (name = "users", description = "User accounts"),
        (name = "auth_session", description = "Session login and logout"),
        (name = "health", description = "Liveness and database status"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
