use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::ServiceError;
use crate::services::checkout::CardDetails;
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DocumentCheckoutRequest {
    /// Buyer's CPF or CNPJ, punctuation allowed
    #[validate(length(min = 1, message = "document is required"))]
    pub document: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CardCheckoutRequest {
    #[validate(length(min = 1, message = "document is required"))]
    pub document: String,
    #[validate(length(min = 1, message = "card holder is required"))]
    pub holder: String,
    #[validate(length(min = 12, message = "card number is too short"))]
    pub number: String,
    #[validate(length(min = 4, message = "expiry is required"))]
    pub expiry: String,
    #[validate(length(min = 3, max = 4, message = "invalid security code"))]
    pub cvc: String,
    #[serde(default)]
    pub installments: Option<u32>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/checkout/:order_id/pix", post(pix_checkout))
        .route("/checkout/:order_id/bank-slip", post(bank_slip_checkout))
        .route("/checkout/:order_id/credit-card", post(credit_card_checkout))
}

fn ensure_enabled(enabled: bool, method: &str) -> Result<(), ServiceError> {
    if enabled {
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!(
            "{method} checkout is not available"
        )))
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/{order_id}/pix",
    params(("order_id" = i64, Path, description = "Storefront order ID")),
    request_body = DocumentCheckoutRequest,
    responses(
        (status = 200, description = "Pix payment created"),
        (status = 400, description = "Invalid document", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Processor error", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn pix_checkout(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Json(req): Json<DocumentCheckoutRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    ensure_enabled(state.config.methods.pix, "Pix")?;
    req.validate()?;
    let out = state.checkout.process_pix(order_id, &req.document).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(out))))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/{order_id}/bank-slip",
    params(("order_id" = i64, Path, description = "Storefront order ID")),
    request_body = DocumentCheckoutRequest,
    responses(
        (status = 200, description = "Bank slip issued"),
        (status = 400, description = "Invalid document", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Processor error", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn bank_slip_checkout(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Json(req): Json<DocumentCheckoutRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    ensure_enabled(state.config.methods.bank_slip, "Bank slip")?;
    req.validate()?;
    let out = state
        .checkout
        .process_bank_slip(order_id, &req.document)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(out))))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/{order_id}/credit-card",
    params(("order_id" = i64, Path, description = "Storefront order ID")),
    request_body = CardCheckoutRequest,
    responses(
        (status = 200, description = "Charge submitted"),
        (status = 400, description = "Invalid document or card data", body = crate::errors::ErrorResponse),
        (status = 402, description = "Charge declined", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Processor error", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn credit_card_checkout(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Json(req): Json<CardCheckoutRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    ensure_enabled(state.config.methods.credit_card, "Credit card")?;
    req.validate()?;
    let card = CardDetails {
        holder: req.holder,
        number: req.number,
        expiry: req.expiry,
        cvc: req.cvc,
        installments: req.installments.unwrap_or(1),
    };
    let out = state
        .checkout
        .process_credit_card(order_id, &req.document, card)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(out))))
}
