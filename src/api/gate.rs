//! Axum middleware running the [`RequestGate`] in front of the API routes.

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

use super::error::ApiError;
use crate::{
    auth::gate::{GateError, RequestGate},
    users::User,
};

/// Principal resolved by the gate, available to handlers as an extension.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

pub async fn authenticate(
    Extension(gate): Extension<Arc<RequestGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    match gate.authorize(&path, request.headers()).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(GateError::Unauthenticated) => ApiError::unauthorized().into_response(),
        Err(GateError::Forbidden) => ApiError::forbidden().into_response(),
        Err(GateError::Auth(err)) => {
            error!("Failed to resolve principal: {err}");
            ApiError::internal().into_response()
        }
    }
}
