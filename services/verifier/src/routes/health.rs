use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    success: bool,
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { success: true })
}
