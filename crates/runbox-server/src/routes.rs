// Route definitions for the runbox API

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{AppState, auth, handlers};

pub fn router(state: AppState) -> Router {
    let gated = Router::new()
        .route("/execute", post(handlers::execute))
        .route("/languages", get(handlers::languages))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(gated)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
