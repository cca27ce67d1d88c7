//! Method-specific payment data extracted from a remote invoice.
//!
//! The invoice's `payments` array mixes methods; each extractor picks the
//! first attempt matching its method and flattens the payable into a struct
//! the persisters and receipt views consume. `None` means the invoice carries
//! no usable attempt for that method, which callers treat as a remote
//! contract problem.

use crate::processor::types::{Invoice, PaymentAttempt, Payable, PaymentMethod};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixPaymentData {
    pub payment_id: String,
    pub status: Option<String>,
    pub amount: Option<i64>,
    pub copy_paste: Option<String>,
    pub qr_base64: Option<String>,
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankSlipPaymentData {
    pub payment_id: String,
    pub status: Option<String>,
    pub amount: Option<i64>,
    pub identification_field: Option<String>,
    pub bank_slip_number: Option<String>,
    pub barcode: Option<String>,
    pub bank_slip_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPaymentData {
    pub payment_id: String,
    pub status: Option<String>,
    pub amount: Option<i64>,
    pub charge_id: Option<String>,
}

fn first_attempt(invoice: &Invoice, method: PaymentMethod) -> Option<&PaymentAttempt> {
    invoice
        .payments
        .iter()
        .find(|p| method.matches_tag(&p.payment_method))
}

fn payable(attempt: &PaymentAttempt) -> Payable {
    attempt.payable.clone().unwrap_or_default()
}

pub fn first_pix_payment(invoice: &Invoice) -> Option<PixPaymentData> {
    let attempt = first_attempt(invoice, PaymentMethod::Pix)?;
    let payable = payable(attempt);
    Some(PixPaymentData {
        payment_id: attempt.id.clone(),
        status: attempt.status.clone(),
        amount: attempt.amount,
        copy_paste: payable.copy_paste,
        qr_base64: payable.qr_code_base64,
        expires_at: payable.expires_at,
    })
}

pub fn first_bank_slip_payment(invoice: &Invoice) -> Option<BankSlipPaymentData> {
    let attempt = first_attempt(invoice, PaymentMethod::BankSlip)?;
    let payable = payable(attempt);
    Some(BankSlipPaymentData {
        payment_id: attempt.id.clone(),
        status: attempt.status.clone(),
        amount: attempt.amount,
        identification_field: payable.identification_field,
        bank_slip_number: payable.bank_slip_number,
        barcode: payable.barcode,
        bank_slip_url: payable.bank_slip_url,
    })
}

pub fn first_card_payment(invoice: &Invoice) -> Option<CardPaymentData> {
    let attempt = first_attempt(invoice, PaymentMethod::CreditCard)?;
    let payable = payable(attempt);
    Some(CardPaymentData {
        payment_id: attempt.id.clone(),
        status: attempt.status.clone(),
        amount: attempt.amount,
        charge_id: payable.charge_id,
    })
}
