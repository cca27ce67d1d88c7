use axum::{response::IntoResponse, routing::get, Json, Router};
use utoipa::OpenApi;

use crate::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Paygate API",
        version = "0.1.0",
        description = r#"
Storefront payment-gateway integration.

Bridges storefront orders to a Brazilian payment processor: Pix and bank
slip (boleto) checkout, synchronous credit-card charges, receipts rebuilt
from persisted payment records, and the webhook that settles orders when
the processor confirms payment.

Checkout submissions require the buyer's CPF or CNPJ; the document is
validated before any call leaves the service.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Checkout", description = "Per-method checkout submissions"),
        (name = "Receipts", description = "Payment receipts from persisted records"),
        (name = "Webhooks", description = "Processor payment notifications"),
        (name = "Health", description = "Health and status endpoints")
    ),
    paths(
        crate::handlers::checkout::pix_checkout,
        crate::handlers::checkout::bank_slip_checkout,
        crate::handlers::checkout::credit_card_checkout,
        crate::handlers::receipts::order_receipt,
        crate::handlers::webhooks::payment_webhook,
        crate::handlers::health::health_check,
        crate::handlers::health::status,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::handlers::checkout::DocumentCheckoutRequest,
        crate::handlers::checkout::CardCheckoutRequest,
        crate::services::receipts::Receipt,
        crate::services::receipts::ReceiptPayment,
    ))
)]
pub struct ApiDoc;

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Serves the OpenAPI document. No bundled UI; point any Swagger/Redoc
/// instance at `/api-docs/openapi.json`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}
