//! Optional bearer token gate for the execution routes

use axum::{
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::{AppState, handlers::ExecuteResponse};

/// Compare a presented token with the configured one in constant time
fn token_matches(provided: Option<&str>, expected: &str) -> bool {
    provided.is_some_and(|token| bool::from(token.as_bytes().ct_eq(expected.as_bytes())))
}

/// Reject requests without `Authorization: Bearer <token>` when a token is
/// configured. Passes everything through otherwise.
pub async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.auth_token.as_deref() else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if token_matches(provided, expected) {
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "rejected unauthenticated request");
    (
        StatusCode::UNAUTHORIZED,
        Json(ExecuteResponse::failure("Unauthorized")),
    )
        .into_response()
}
