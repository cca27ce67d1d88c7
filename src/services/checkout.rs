//! Checkout orchestration per payment method.
//!
//! Each `process_*` runs the same spine: validate the buyer's document
//! before any remote call, ensure the remote customer and invoice, extract
//! the method's payment data, persist it, and move the order to on-hold.
//! Credit card additionally charges synchronously and settles the order from
//! the charge outcome instead of waiting for a webhook.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::document::{normalize_and_validate, CNPJ_LEN, CPF_LEN};
use crate::entities::order::{self, OrderStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::processor::types::{CardCharge, ChargeStatus, PaymentMethod};
use crate::processor::ProcessorApi;
use crate::services::customers::CustomerResolver;
use crate::services::invoices::InvoiceResolver;
use crate::services::mappers::InvoiceOptions;
use crate::services::payloads::{
    self, BankSlipPaymentData, CardPaymentData, PixPaymentData,
};
use crate::services::persisters::PaymentDataPersister;
use crate::store::{meta_keys, OrderStore};

/// Card details as submitted at checkout. Never logged whole; the charge
/// payload's Debug masking applies once this is converted.
#[derive(Clone)]
pub struct CardDetails {
    pub holder: String,
    pub number: String,
    pub expiry: String,
    pub cvc: String,
    pub installments: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PixCheckout {
    pub invoice_id: String,
    pub payment_id: String,
    pub copy_paste: Option<String>,
    pub qr_png_url: Option<String>,
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BankSlipCheckout {
    pub invoice_id: String,
    pub payment_id: String,
    pub identification_field: Option<String>,
    pub barcode: Option<String>,
    pub bank_slip_url: Option<String>,
    pub pdf_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardCheckout {
    pub invoice_id: String,
    pub payment_id: String,
    pub charge_id: String,
    pub status: ChargeStatus,
    pub paid: bool,
}

pub struct CheckoutService {
    store: Arc<dyn OrderStore>,
    customers: CustomerResolver,
    invoices: InvoiceResolver,
    persister: PaymentDataPersister,
    processor: Arc<dyn ProcessorApi>,
    events: EventSender,
    store_name: String,
    max_installments: u32,
}

impl CheckoutService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn OrderStore>,
        processor: Arc<dyn ProcessorApi>,
        persister: PaymentDataPersister,
        events: EventSender,
        store_name: String,
        max_installments: u32,
    ) -> Self {
        Self {
            customers: CustomerResolver::new(store.clone(), processor.clone()),
            invoices: InvoiceResolver::new(store.clone(), processor.clone(), store_name.clone()),
            persister,
            processor,
            events,
            store_name,
            max_installments,
            store,
        }
    }

    #[instrument(skip(self, document), fields(order_id))]
    pub async fn process_pix(
        &self,
        order_id: i64,
        document: &str,
    ) -> Result<PixCheckout, ServiceError> {
        let order = self.load_payable_order(order_id).await?;
        self.capture_document(order_id, document).await?;

        let customer = self.customers.ensure(&order).await?;
        self.customers.sync_document(&customer.id, order_id).await;

        let invoice = self
            .invoices
            .ensure(
                &order,
                &customer.id,
                &InvoiceOptions {
                    payment_method: PaymentMethod::Pix,
                    installments: None,
                    immutable: Some(true),
                    extra_tags: vec!["pix".into()],
                },
            )
            .await?;

        let data: PixPaymentData = payloads::first_pix_payment(&invoice).ok_or_else(|| {
            ServiceError::PayloadMissing(format!("invoice {} has no Pix payment", invoice.id))
        })?;
        self.persister.persist_pix(order_id, &data).await?;

        self.place_on_hold(order_id, PaymentMethod::Pix, &data.payment_id)
            .await?;

        let qr_png_url = self.store.get_meta(order_id, meta_keys::PIX_QR_PNG_URL).await?;
        Ok(PixCheckout {
            invoice_id: invoice.id,
            payment_id: data.payment_id,
            copy_paste: data.copy_paste,
            qr_png_url,
            expires_at: data.expires_at,
        })
    }

    #[instrument(skip(self, document), fields(order_id))]
    pub async fn process_bank_slip(
        &self,
        order_id: i64,
        document: &str,
    ) -> Result<BankSlipCheckout, ServiceError> {
        let order = self.load_payable_order(order_id).await?;
        self.capture_document(order_id, document).await?;

        let customer = self.customers.ensure(&order).await?;
        self.customers.sync_document(&customer.id, order_id).await;

        let invoice = self
            .invoices
            .ensure(
                &order,
                &customer.id,
                &InvoiceOptions {
                    payment_method: PaymentMethod::BankSlip,
                    installments: None,
                    immutable: Some(true),
                    extra_tags: vec!["bank-slip".into()],
                },
            )
            .await?;

        let data: BankSlipPaymentData =
            payloads::first_bank_slip_payment(&invoice).ok_or_else(|| {
                ServiceError::PayloadMissing(format!(
                    "invoice {} has no bank slip payment",
                    invoice.id
                ))
            })?;
        self.persister.persist_bank_slip(order_id, &data).await?;

        self.place_on_hold(order_id, PaymentMethod::BankSlip, &data.payment_id)
            .await?;

        let pdf_url = self
            .store
            .get_meta(order_id, meta_keys::BANKSLIP_PDF_URL)
            .await?;
        Ok(BankSlipCheckout {
            invoice_id: invoice.id,
            payment_id: data.payment_id,
            identification_field: data.identification_field,
            barcode: data.barcode,
            bank_slip_url: data.bank_slip_url,
            pdf_url,
        })
    }

    #[instrument(skip(self, document, card), fields(order_id))]
    pub async fn process_credit_card(
        &self,
        order_id: i64,
        document: &str,
        card: CardDetails,
    ) -> Result<CardCheckout, ServiceError> {
        let order = self.load_payable_order(order_id).await?;
        self.capture_document(order_id, document).await?;

        let installments = card.installments.clamp(1, self.max_installments);

        let customer = self.customers.ensure(&order).await?;
        self.customers.sync_document(&customer.id, order_id).await;

        let invoice = self
            .invoices
            .ensure(
                &order,
                &customer.id,
                &InvoiceOptions {
                    payment_method: PaymentMethod::CreditCard,
                    installments: Some(installments),
                    immutable: Some(true),
                    extra_tags: vec!["credit-card".into()],
                },
            )
            .await?;

        let data: CardPaymentData = payloads::first_card_payment(&invoice).ok_or_else(|| {
            ServiceError::PayloadMissing(format!(
                "invoice {} has no credit card payment",
                invoice.id
            ))
        })?;
        self.persister
            .persist_card(order_id, &data, installments)
            .await?;

        let charge = CardCharge {
            holder: card.holder,
            number: card.number,
            expiry: normalize_expiry(&card.expiry),
            cvc: card.cvc,
            installments,
            soft_descriptor: Some(self.store_name.clone()),
        };
        info!(order_id, card = ?charge, "submitting card charge");

        let result = match self.processor.charge_card(&invoice.id, &charge).await {
            Ok(result) => result,
            Err(e) => {
                warn!(order_id, error = %e, "card charge submission failed");
                self.store
                    .add_note(order_id, "Credit card charge could not be submitted.")
                    .await?;
                return Err(e);
            }
        };
        self.store
            .put_meta(order_id, meta_keys::CARD_CHARGE_ID, &result.id)
            .await?;

        match result.status {
            ChargeStatus::Approved => {
                self.store.mark_paid(order_id, &result.id).await?;
                self.store
                    .add_note(
                        order_id,
                        &format!("Credit card charge {} approved.", result.id),
                    )
                    .await?;
                self.events
                    .send(Event::PaymentConfirmed {
                        order_id,
                        transaction_id: Some(result.id.clone()),
                    })
                    .await;
                Ok(CardCheckout {
                    invoice_id: invoice.id,
                    payment_id: data.payment_id,
                    charge_id: result.id,
                    status: ChargeStatus::Approved,
                    paid: true,
                })
            }
            ChargeStatus::Pending | ChargeStatus::Unknown => {
                self.place_on_hold(order_id, PaymentMethod::CreditCard, &data.payment_id)
                    .await?;
                Ok(CardCheckout {
                    invoice_id: invoice.id,
                    payment_id: data.payment_id,
                    charge_id: result.id,
                    status: result.status,
                    paid: false,
                })
            }
            ChargeStatus::Declined => {
                warn!(order_id, charge_id = %result.id, "card charge declined");
                self.store
                    .set_status(
                        order_id,
                        OrderStatus::Failed,
                        &format!("Credit card charge {} declined.", result.id),
                    )
                    .await?;
                self.events
                    .send(Event::PaymentFailed {
                        order_id,
                        reason: "card charge declined".into(),
                    })
                    .await;
                Err(ServiceError::PaymentFailed(
                    "card charge was declined".into(),
                ))
            }
        }
    }

    async fn load_payable_order(&self, order_id: i64) -> Result<order::Model, ServiceError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_id} not found")))?;
        if order.is_paid() {
            return Err(ServiceError::InvalidOperation(format!(
                "order {order_id} is already paid"
            )));
        }
        Ok(order)
    }

    /// Validates the submitted CPF/CNPJ and writes it back onto the order
    /// before anything leaves the building. An invalid document stops the
    /// checkout with no remote side effects.
    async fn capture_document(&self, order_id: i64, document: &str) -> Result<(), ServiceError> {
        let digits = normalize_and_validate(document);
        if digits.is_empty() {
            return Err(ServiceError::ValidationError(
                "a valid CPF or CNPJ is required".into(),
            ));
        }
        self.store
            .put_meta(order_id, meta_keys::DOCUMENT_NUMBER, &digits)
            .await?;
        let billing_key = match digits.len() {
            CPF_LEN => meta_keys::BILLING_CPF,
            CNPJ_LEN => meta_keys::BILLING_CNPJ,
            _ => return Ok(()),
        };
        self.store.put_meta(order_id, billing_key, &digits).await
    }

    async fn place_on_hold(
        &self,
        order_id: i64,
        method: PaymentMethod,
        payment_id: &str,
    ) -> Result<(), ServiceError> {
        self.store
            .set_status(
                order_id,
                OrderStatus::OnHold,
                &format!("Awaiting {method} payment (payment {payment_id})."),
            )
            .await?;
        self.events
            .send(Event::CheckoutGenerated {
                order_id,
                method,
                payment_id: payment_id.to_string(),
            })
            .await;
        Ok(())
    }
}

/// Normalizes a card expiry to MM/YY. Accepts `/` or `-` separators,
/// one-digit months and four-digit years; anything unparseable passes
/// through untouched for the processor to reject.
pub fn normalize_expiry(raw: &str) -> String {
    let raw = raw.trim();
    let Some((month, year)) = raw.split_once(['/', '-']) else {
        return raw.to_string();
    };
    let (month, year) = (month.trim(), year.trim());
    if month.is_empty()
        || year.is_empty()
        || !month.chars().all(|c| c.is_ascii_digit())
        || !year.chars().all(|c| c.is_ascii_digit())
    {
        return raw.to_string();
    }
    let month = format!("{:0>2}", month);
    let year = if year.len() == 4 { &year[2..] } else { year };
    format!("{month}/{year}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::types::{Payable, PaymentAttempt};
    use crate::services::persisters::ArtifactStore;
    use crate::services::test_support::{order_fixture, FakeProcessor};
    use crate::store::memory::InMemoryOrderStore;
    use assert_matches::assert_matches;
    use std::time::Duration;
    use tempfile::TempDir;

    const VALID_CPF: &str = "529.982.247-25";

    fn service(
        store: Arc<InMemoryOrderStore>,
        processor: Arc<FakeProcessor>,
        dir: &TempDir,
    ) -> CheckoutService {
        let (events, mut rx) = EventSender::channel(32);
        // Drain events so sends never hit a full channel
        tokio::spawn(async move { while rx.recv().await.is_some() {} });
        let persister = PaymentDataPersister::new(
            store.clone(),
            ArtifactStore::new(dir.path(), None, Duration::from_secs(20)),
        );
        CheckoutService::new(
            store,
            processor,
            persister,
            events,
            "Minha Loja".into(),
            12,
        )
    }

    fn pix_attempt() -> PaymentAttempt {
        PaymentAttempt {
            id: "pay_pix".into(),
            payment_method: "PIX".into(),
            status: Some("PENDING".into()),
            amount: Some(12990),
            payable: Some(Payable {
                copy_paste: Some("00020126...".into()),
                qr_code_base64: Some("cGl4".into()),
                ..Payable::default()
            }),
        }
    }

    fn card_attempt() -> PaymentAttempt {
        PaymentAttempt {
            id: "pay_cc".into(),
            payment_method: "CREDIT_CARD".into(),
            status: Some("PENDING".into()),
            amount: Some(12990),
            payable: None,
        }
    }

    fn card() -> CardDetails {
        CardDetails {
            holder: "ANA SOUZA".into(),
            number: "4111 1111 1111 1111".into(),
            expiry: "12/2028".into(),
            cvc: "123".into(),
            installments: 3,
        }
    }

    #[tokio::test]
    async fn pix_checkout_holds_order_and_returns_payable() {
        let store = Arc::new(InMemoryOrderStore::new());
        let processor = Arc::new(FakeProcessor::new());
        processor.script_invoice_payments(vec![pix_attempt()]);
        store.insert_order(order_fixture(1)).await;
        let dir = TempDir::new().unwrap();

        let out = service(store.clone(), processor, &dir)
            .process_pix(1, VALID_CPF)
            .await
            .unwrap();

        assert_eq!(out.payment_id, "pay_pix");
        assert_eq!(out.copy_paste.as_deref(), Some("00020126..."));
        assert_eq!(out.qr_png_url.as_deref(), Some("/artifacts/pix-1.png"));

        let order = store.get_order(1).await.unwrap().unwrap();
        assert_eq!(order.status, "on-hold");
        assert_eq!(
            store.get_meta(1, meta_keys::BILLING_CPF).await.unwrap(),
            Some("52998224725".into())
        );
    }

    #[tokio::test]
    async fn invalid_document_stops_before_any_remote_call() {
        let store = Arc::new(InMemoryOrderStore::new());
        let processor = Arc::new(FakeProcessor::new());
        store.insert_order(order_fixture(1)).await;
        let dir = TempDir::new().unwrap();

        let result = service(store.clone(), processor.clone(), &dir)
            .process_pix(1, "111.111.111-11")
            .await;

        assert_matches!(result, Err(ServiceError::ValidationError(_)));
        assert_eq!(processor.customer_creates(), 0);
        assert_eq!(processor.invoice_creates(), 0);
        let order = store.get_order(1).await.unwrap().unwrap();
        assert_eq!(order.status, "pending");
    }

    #[tokio::test]
    async fn missing_method_payment_is_a_remote_payload_error() {
        let store = Arc::new(InMemoryOrderStore::new());
        let processor = Arc::new(FakeProcessor::new());
        // Invoice comes back with no payments at all
        store.insert_order(order_fixture(1)).await;
        let dir = TempDir::new().unwrap();

        let result = service(store.clone(), processor, &dir)
            .process_bank_slip(1, VALID_CPF)
            .await;
        assert_matches!(result, Err(ServiceError::PayloadMissing(_)));
    }

    #[tokio::test]
    async fn approved_card_charge_pays_the_order() {
        let store = Arc::new(InMemoryOrderStore::new());
        let processor = Arc::new(FakeProcessor::new());
        processor.script_invoice_payments(vec![card_attempt()]);
        store.insert_order(order_fixture(1)).await;
        let dir = TempDir::new().unwrap();

        let out = service(store.clone(), processor, &dir)
            .process_credit_card(1, VALID_CPF, card())
            .await
            .unwrap();

        assert!(out.paid);
        assert_eq!(out.charge_id, "chg_1");
        let order = store.get_order(1).await.unwrap().unwrap();
        assert!(order.is_paid());
        assert_eq!(order.transaction_id.as_deref(), Some("chg_1"));
    }

    #[tokio::test]
    async fn declined_card_charge_fails_the_order() {
        let store = Arc::new(InMemoryOrderStore::new());
        let processor = Arc::new(FakeProcessor::new());
        processor.script_invoice_payments(vec![card_attempt()]);
        processor.script_charge_status(ChargeStatus::Declined);
        store.insert_order(order_fixture(1)).await;
        let dir = TempDir::new().unwrap();

        let result = service(store.clone(), processor, &dir)
            .process_credit_card(1, VALID_CPF, card())
            .await;

        assert_matches!(result, Err(ServiceError::PaymentFailed(_)));
        let order = store.get_order(1).await.unwrap().unwrap();
        assert_eq!(order.status, "failed");
        let notes = store.notes_for(1).await;
        assert!(notes.iter().any(|n| n.contains("declined")));
    }

    #[tokio::test]
    async fn charge_transport_failure_leaves_an_internal_note() {
        let store = Arc::new(InMemoryOrderStore::new());
        let processor = Arc::new(FakeProcessor::new());
        processor.script_invoice_payments(vec![card_attempt()]);
        processor.fail_charge();
        store.insert_order(order_fixture(1)).await;
        let dir = TempDir::new().unwrap();

        let result = service(store.clone(), processor, &dir)
            .process_credit_card(1, VALID_CPF, card())
            .await;

        assert_matches!(result, Err(ServiceError::ExternalServiceError(_)));
        let notes = store.notes_for(1).await;
        assert!(notes.iter().any(|n| n.contains("could not be submitted")));
    }

    #[tokio::test]
    async fn pending_card_charge_holds_the_order() {
        let store = Arc::new(InMemoryOrderStore::new());
        let processor = Arc::new(FakeProcessor::new());
        processor.script_invoice_payments(vec![card_attempt()]);
        processor.script_charge_status(ChargeStatus::Pending);
        store.insert_order(order_fixture(1)).await;
        let dir = TempDir::new().unwrap();

        let out = service(store.clone(), processor, &dir)
            .process_credit_card(1, VALID_CPF, card())
            .await
            .unwrap();

        assert!(!out.paid);
        let order = store.get_order(1).await.unwrap().unwrap();
        assert_eq!(order.status, "on-hold");
    }

    #[tokio::test]
    async fn already_paid_order_is_rejected() {
        let store = Arc::new(InMemoryOrderStore::new());
        let processor = Arc::new(FakeProcessor::new());
        let mut order = order_fixture(1);
        order.status = "paid".into();
        store.insert_order(order).await;
        let dir = TempDir::new().unwrap();

        let result = service(store, processor, &dir)
            .process_pix(1, VALID_CPF)
            .await;
        assert_matches!(result, Err(ServiceError::InvalidOperation(_)));
    }

    #[test]
    fn expiry_normalization() {
        assert_eq!(normalize_expiry("12/2028"), "12/28");
        assert_eq!(normalize_expiry("1-28"), "01/28");
        assert_eq!(normalize_expiry(" 03 / 2027 "), "03/27");
        assert_eq!(normalize_expiry("12/28"), "12/28");
        // Malformed input passes through for the processor to reject
        assert_eq!(normalize_expiry("garbage"), "garbage");
        assert_eq!(normalize_expiry("12|28"), "12|28");
    }
}
