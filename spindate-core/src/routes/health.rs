use axum::Json;
use spindate_shared::types::api::HealthResponse;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("spindate-core", env!("CARGO_PKG_VERSION")))
}
