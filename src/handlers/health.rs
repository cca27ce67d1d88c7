use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status))
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is alive")),
    tag = "Health"
)]
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[utoipa::path(
    get,
    path = "/status",
    responses((status = 200, description = "Service status and configuration summary")),
    tag = "Health"
)]
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "live_mode": state.config.processor.live_mode,
        "methods": {
            "pix": state.config.methods.pix,
            "bank_slip": state.config.methods.bank_slip,
            "credit_card": state.config.methods.credit_card,
        },
    }))
}
