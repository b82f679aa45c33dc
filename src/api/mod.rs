use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    extract::{MatchedPath, Request},
    http::{HeaderName, HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::{Layer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    normalize_path::{NormalizePath, NormalizePathLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;

use crate::{
    auth::{AuthConfig, gate::RequestGate},
    db,
    users::{SqlUserRepository, UserRepository},
};

pub mod error;
pub mod gate;
pub mod handlers;
mod openapi;

pub use openapi::openapi;

use self::handlers::{health, index, session, users};

/// Shared handles injected into every request as extensions.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub users: Arc<dyn UserRepository>,
    pub gate: Arc<RequestGate>,
}

impl AppState {
    /// Wire the repository and the configured strategy over `pool`.
    #[must_use]
    pub fn new(pool: SqlitePool, auth_config: &AuthConfig, excluded_paths: Vec<String>) -> Self {
        let users: Arc<dyn UserRepository> = Arc::new(SqlUserRepository::new(pool.clone()));
        let strategy = auth_config.build(Arc::clone(&users), &pool);
        Self {
            pool,
            users,
            gate: Arc::new(RequestGate::new(strategy, excluded_paths)),
        }
    }
}

/// Build the application: gated `/api/v1` routes plus an open `/health`.
///
/// Trailing slashes are trimmed before routing, so `/api/v1/status/` and
/// `/api/v1/status` reach the same handler.
pub fn app(state: AppState) -> NormalizePath<Router> {
    let api = Router::new()
        .route("/api/v1/status", get(index::status))
        .route("/api/v1/stats", get(index::stats))
        .route("/api/v1/unauthorized", get(index::unauthorized))
        .route("/api/v1/forbidden", get(index::forbidden))
        .route("/api/v1/users", get(users::list_users).post(users::create_user))
        .route(
            "/api/v1/users/:user_id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/api/v1/auth_session/login", post(session::login))
        .route(
            "/api/v1/auth_session/logout",
            delete(session::logout),
        )
        .fallback(index::not_found)
        .layer(middleware::from_fn(gate::authenticate));

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(Any);

    let router = api
        .route("/health", get(health).options(health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(state.gate))
                .layer(Extension(state.users))
                .layer(Extension(state.pool)),
        );

    NormalizePathLayer::trim_trailing_slash().layer(router)
}

/// Start the server
/// # Errors
/// Return error if the database or the listener cannot be set up
pub async fn new(
    host: &str,
    port: u16,
    dsn: &str,
    auth_config: &AuthConfig,
    excluded_paths: Vec<String>,
) -> Result<()> {
    let pool = db::connect(dsn).await?;
    let state = AppState::new(pool.clone(), auth_config, excluded_paths);
    info!(
        auth_type = %auth_config.auth_type(),
        excluded_paths = ?state.gate.excluded_paths(),
        "Authentication configured"
    );

    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {host}:{port}"))?;

    info!("Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        axum::ServiceExt::<Request>::into_make_service(app(state)),
    )
    .with_graceful_shutdown(async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {err}");
        }
        info!("Gracefully shutdown");
    })
    .await?;

    pool.close().await;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
