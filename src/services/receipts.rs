//! Receipt views rebuilt from persisted order metadata.
//!
//! Receipts never call the processor: everything shown after checkout comes
//! from what the persisters recorded, so a receipt renders identically while
//! the remote is down.

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::entities::order::OrderStatus;
use crate::errors::ServiceError;
use crate::processor::types::PaymentMethod;
use crate::store::{meta_keys, OrderStore};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Receipt {
    pub order_id: i64,
    pub order_number: String,
    pub order_status: String,
    pub paid: bool,
    pub payment: ReceiptPayment,
}

/// Method-specific receipt block, tagged by method.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ReceiptPayment {
    Pix {
        copy_paste: Option<String>,
        qr_png_url: Option<String>,
        expires_at: Option<String>,
        amount: Option<String>,
    },
    BankSlip {
        identification_field: Option<String>,
        barcode: Option<String>,
        bank_slip_url: Option<String>,
        pdf_url: Option<String>,
        amount: Option<String>,
    },
    CreditCard {
        charge_id: Option<String>,
        installments: Option<String>,
        status: Option<String>,
        amount: Option<String>,
    },
}

/// Per-request render guard. The payment instructions block must appear at
/// most once per rendered page even when several fragments ask for it; each
/// request gets its own context instead of process-global state.
#[derive(Debug, Default)]
pub struct ReceiptContext {
    rendered: bool,
}

impl ReceiptContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// True exactly once.
    pub fn should_render(&mut self) -> bool {
        !std::mem::replace(&mut self.rendered, true)
    }
}

pub struct ReceiptService {
    store: Arc<dyn OrderStore>,
}

impl ReceiptService {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Builds the receipt for an order from its persisted payment metadata.
    /// Which method's block is shown follows the method marker the persisters
    /// write, so the newest checkout wins even when older records remain.
    pub async fn build(&self, order_id: i64) -> Result<Receipt, ServiceError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_id} not found")))?;

        let mut ctx = ReceiptContext::new();
        let payment = self.payment_block(order_id, &mut ctx).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("order {order_id} has no payment record"))
        })?;

        Ok(Receipt {
            order_id,
            order_number: order.order_number.clone(),
            order_status: order.status.clone(),
            paid: order.status() == Some(OrderStatus::Paid),
            payment,
        })
    }

    /// At most one block per context, even if several records exist.
    ///
    /// The persisters record which method the latest checkout used; that
    /// method's block wins, so a Pix attempt retried as a boleto renders
    /// the boleto. Orders persisted before the method marker existed fall
    /// back to a fixed Pix, bank slip, card scan.
    async fn payment_block(
        &self,
        order_id: i64,
        ctx: &mut ReceiptContext,
    ) -> Result<Option<ReceiptPayment>, ServiceError> {
        if !ctx.should_render() {
            return Ok(None);
        }
        let latest = self
            .meta(order_id, meta_keys::PAYMENT_METHOD)
            .await?
            .and_then(|raw| raw.parse::<PaymentMethod>().ok());
        if let Some(method) = latest {
            if let Some(block) = self.method_block(order_id, method).await? {
                return Ok(Some(block));
            }
        }
        for method in [
            PaymentMethod::Pix,
            PaymentMethod::BankSlip,
            PaymentMethod::CreditCard,
        ] {
            if let Some(block) = self.method_block(order_id, method).await? {
                return Ok(Some(block));
            }
        }
        Ok(None)
    }

    async fn method_block(
        &self,
        order_id: i64,
        method: PaymentMethod,
    ) -> Result<Option<ReceiptPayment>, ServiceError> {
        match method {
            PaymentMethod::Pix => {
                if !self.has(order_id, meta_keys::PIX_PAYMENT_ID).await? {
                    return Ok(None);
                }
                Ok(Some(ReceiptPayment::Pix {
                    copy_paste: self.meta(order_id, meta_keys::PIX_COPY_PASTE).await?,
                    qr_png_url: self.meta(order_id, meta_keys::PIX_QR_PNG_URL).await?,
                    expires_at: self.meta(order_id, meta_keys::PIX_EXPIRES_AT).await?,
                    amount: self.meta(order_id, meta_keys::PIX_AMOUNT).await?,
                }))
            }
            PaymentMethod::BankSlip => {
                if !self.has(order_id, meta_keys::BANKSLIP_PAYMENT_ID).await? {
                    return Ok(None);
                }
                Ok(Some(ReceiptPayment::BankSlip {
                    identification_field: self
                        .meta(order_id, meta_keys::BANKSLIP_IDENTIFICATION_FIELD)
                        .await?,
                    barcode: self.meta(order_id, meta_keys::BANKSLIP_BARCODE).await?,
                    bank_slip_url: self.meta(order_id, meta_keys::BANKSLIP_URL).await?,
                    pdf_url: self.meta(order_id, meta_keys::BANKSLIP_PDF_URL).await?,
                    amount: self.meta(order_id, meta_keys::BANKSLIP_AMOUNT).await?,
                }))
            }
            PaymentMethod::CreditCard => {
                if !self.has(order_id, meta_keys::CARD_PAYMENT_ID).await? {
                    return Ok(None);
                }
                Ok(Some(ReceiptPayment::CreditCard {
                    charge_id: self.meta(order_id, meta_keys::CARD_CHARGE_ID).await?,
                    installments: self.meta(order_id, meta_keys::CARD_INSTALLMENTS).await?,
                    status: self.meta(order_id, meta_keys::CARD_STATUS).await?,
                    amount: self.meta(order_id, meta_keys::CARD_AMOUNT).await?,
                }))
            }
        }
    }

    async fn meta(&self, order_id: i64, key: &str) -> Result<Option<String>, ServiceError> {
        self.store.get_meta(order_id, key).await
    }

    async fn has(&self, order_id: i64, key: &str) -> Result<bool, ServiceError> {
        Ok(self.meta(order_id, key).await?.is_some())
    }
}
