use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::errors::ServiceError;
use crate::{ApiResponse, AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/orders/:order_id/receipt", get(order_receipt))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{order_id}/receipt",
    params(("order_id" = i64, Path, description = "Storefront order ID")),
    responses(
        (status = 200, description = "Receipt for the order's latest payment", body = crate::services::receipts::Receipt),
        (status = 404, description = "Order or payment record not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Receipts"
)]
pub async fn order_receipt(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let receipt = state.receipts.build(order_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(receipt))))
}
