//! Typed wire schema for the remote payment processor.
//!
//! One serde boundary: responses are deserialized into these structs at the
//! client and everything above (resolvers, extractors) consumes typed data
//! only.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

use crate::document::DocumentKind;

/// Payment method codes the processor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Pix,
    BankSlip,
    CreditCard,
}

impl PaymentMethod {
    /// Case-insensitive match against an attempt's method tag. Bank slip
    /// accepts the legacy `BOLETO` alias still emitted by older invoices.
    pub fn matches_tag(self, tag: &str) -> bool {
        let tag = tag.to_ascii_uppercase();
        match self {
            Self::Pix => tag == "PIX",
            Self::BankSlip => tag == "BANK_SLIP" || tag == "BOLETO",
            Self::CreditCard => tag == "CREDIT_CARD",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub document_number: Option<String>,
}

/// Creation payload for a remote customer record.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerDraft {
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub tags: Vec<String>,
}

/// Partial update; currently only the document sync uses it.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerUpdate {
    pub document_number: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
}

/// Creation payload for a remote invoice.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDraft {
    pub customer: String,
    pub payment_method: PaymentMethod,
    /// Minor currency units (centavos).
    pub amount: i64,
    pub due_date: NaiveDate,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installments: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub immutable: Option<bool>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payments: Vec<PaymentAttempt>,
}

/// One concrete way to pay an invoice, with its method-specific payable.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentAttempt {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub payable: Option<Payable>,
}

/// Method-specific payable fields. The wire object varies by method; absent
/// fields stay None and extractors pick the set for their method.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Payable {
    // Pix
    #[serde(default)]
    pub copy_paste: Option<String>,
    #[serde(default)]
    pub qr_code_base64: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    // Bank slip
    #[serde(default)]
    pub identification_field: Option<String>,
    #[serde(default)]
    pub bank_slip_number: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub bank_slip_url: Option<String>,
    // Credit card
    #[serde(default)]
    pub charge_id: Option<String>,
    #[serde(default)]
    pub approval_status: Option<String>,
}

/// Tokenless card charge payload. Card data is sensitive: Debug masks the
/// number and hides the CVC so it can never reach a log line whole.
#[derive(Clone, Serialize)]
pub struct CardCharge {
    pub holder: String,
    pub number: String,
    /// Normalized MM/YY.
    pub expiry: String,
    pub cvc: String,
    pub installments: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_descriptor: Option<String>,
}

impl CardCharge {
    pub fn masked_number(&self) -> String {
        let digits: String = self.number.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() < 4 {
            return "****".to_string();
        }
        format!("**** {}", &digits[digits.len() - 4..])
    }
}

impl fmt::Debug for CardCharge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardCharge")
            .field("holder", &self.holder)
            .field("number", &self.masked_number())
            .field("expiry", &self.expiry)
            .field("cvc", &"***")
            .field("installments", &self.installments)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Approved,
    Pending,
    Declined,
    #[serde(other)]
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargeResult {
    #[serde(default)]
    pub id: String,
    pub status: ChargeStatus,
}
