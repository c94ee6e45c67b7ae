use std::time::Duration;

use axum::{
    Router,
    middleware::map_response,
    routing::{get, post},
};

use crate::{
    AppState,
    server_layers::{timeout_error_body, timeout_layer, trace_layer},
};

mod health;
mod verify;

pub(crate) fn build_app(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/v1/verify/{app_id}", post(verify::verify))
        .with_state(state)
        .layer(timeout_layer(request_timeout))
        .layer(map_response(timeout_error_body))
        .layer(trace_layer())
}
