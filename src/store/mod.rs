//! Persistence port for order-attached state.
//!
//! All cross-call state (remote resource links, payment records, documents)
//! lives in order metadata behind [`OrderStore`]; services receive the store
//! as a capability so tests can substitute the in-memory implementation.

pub mod memory;
pub mod sql;

use async_trait::async_trait;

use crate::entities::order::{self, OrderStatus};
use crate::errors::ServiceError;

/// Namespaced metadata keys. Targeted single-key writes only; concurrent
/// same-key writes are last-writer-wins (no merge logic).
pub mod meta_keys {
    pub const CUSTOMER: &str = "_paygate_customer";
    pub const INVOICE: &str = "_paygate_invoice";
    /// Method code of the latest persisted payment record; receipts render
    /// this method's block when several records exist.
    pub const PAYMENT_METHOD: &str = "_paygate_payment_method";
    pub const DOCUMENT_NUMBER: &str = "_paygate_document_number";
    pub const BILLING_CPF: &str = "_billing_cpf";
    pub const BILLING_CNPJ: &str = "_billing_cnpj";

    pub const PIX_PAYMENT_ID: &str = "_paygate_pix_payment_id";
    pub const PIX_STATUS: &str = "_paygate_pix_status";
    pub const PIX_AMOUNT: &str = "_paygate_pix_amount";
    pub const PIX_COPY_PASTE: &str = "_paygate_pix_copy_paste";
    pub const PIX_QR_BASE64: &str = "_paygate_pix_qr_base64";
    pub const PIX_QR_PNG_URL: &str = "_paygate_pix_qr_png_url";
    pub const PIX_EXPIRES_AT: &str = "_paygate_pix_expires_at";

    pub const BANKSLIP_PAYMENT_ID: &str = "_paygate_bankslip_payment_id";
    pub const BANKSLIP_STATUS: &str = "_paygate_bankslip_status";
    pub const BANKSLIP_AMOUNT: &str = "_paygate_bankslip_amount";
    pub const BANKSLIP_IDENTIFICATION_FIELD: &str = "_paygate_bankslip_identification_field";
    pub const BANKSLIP_NUMBER: &str = "_paygate_bankslip_number";
    pub const BANKSLIP_BARCODE: &str = "_paygate_bankslip_barcode";
    pub const BANKSLIP_URL: &str = "_paygate_bankslip_url";
    pub const BANKSLIP_PDF_URL: &str = "_paygate_bankslip_pdf_url";

    pub const CARD_PAYMENT_ID: &str = "_paygate_cc_payment_id";
    pub const CARD_STATUS: &str = "_paygate_cc_status";
    pub const CARD_AMOUNT: &str = "_paygate_cc_amount";
    pub const CARD_CHARGE_ID: &str = "_paygate_cc_charge_id";
    pub const CARD_INSTALLMENTS: &str = "_paygate_cc_installments";
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_order(&self, order_id: i64) -> Result<Option<order::Model>, ServiceError>;

    /// Transitions the order and appends the given audit note.
    async fn set_status(
        &self,
        order_id: i64,
        status: OrderStatus,
        note: &str,
    ) -> Result<(), ServiceError>;

    /// Marks the order paid with the processor's transaction reference.
    /// Callers are expected to check `is_paid()` first; this always writes.
    async fn mark_paid(&self, order_id: i64, transaction_id: &str) -> Result<(), ServiceError>;

    async fn add_note(&self, order_id: i64, note: &str) -> Result<(), ServiceError>;

    async fn get_meta(&self, order_id: i64, key: &str) -> Result<Option<String>, ServiceError>;
    async fn put_meta(&self, order_id: i64, key: &str, value: &str) -> Result<(), ServiceError>;

    /// Account-level remote customer link (survives across orders).
    async fn get_customer_link(&self, account_id: i64) -> Result<Option<String>, ServiceError>;
    async fn put_customer_link(
        &self,
        account_id: i64,
        remote_customer_id: &str,
    ) -> Result<(), ServiceError>;
}
