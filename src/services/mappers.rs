//! Order → processor payload mapping.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::document::{only_digits, DocumentKind};
use crate::entities::order;
use crate::errors::ServiceError;
use crate::processor::types::{CustomerDraft, InvoiceDraft, PaymentMethod};
use crate::store::{meta_keys, OrderStore};

/// Tag stamped on every remote resource this service creates.
pub const ORIGIN_TAG: &str = "storefront";

static ADDRESS_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d+[A-Za-z0-9-]*)\b").expect("address number regex"));

/// Extracts the house number from a free-text address line
/// ("Rua Tal, 123A apt 45" -> "123A").
pub fn extract_address_number(address_line: &str) -> Option<String> {
    ADDRESS_NUMBER
        .captures(address_line)
        .map(|caps| caps[1].to_string())
}

/// Removes the house number, keeping only the street.
pub fn strip_address_number(address_line: &str) -> String {
    let stripped = ADDRESS_NUMBER.replace_all(address_line, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Order total in minor currency units (centavos).
pub fn amount_in_cents(total: Decimal) -> Result<i64, ServiceError> {
    (total * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or_else(|| ServiceError::InvalidInput(format!("order total out of range: {total}")))
}

/// Resolves the buyer's document from order metadata: checkout-captured
/// document first, then the billing CPF/CNPJ fields, digits only.
pub async fn resolve_order_document(
    store: &dyn OrderStore,
    order_id: i64,
) -> Result<String, ServiceError> {
    for key in [
        meta_keys::DOCUMENT_NUMBER,
        meta_keys::BILLING_CPF,
        meta_keys::BILLING_CNPJ,
    ] {
        if let Some(doc) = store.get_meta(order_id, key).await? {
            let digits = only_digits(&doc);
            if !digits.is_empty() {
                return Ok(digits);
            }
        }
    }
    Ok(String::new())
}

/// Builds the remote customer creation payload from the order's billing
/// snapshot. Legal name falls back from company to the buyer's full name;
/// the street line is split into street + number for the processor's
/// address schema.
pub async fn customer_draft(
    store: &dyn OrderStore,
    order: &order::Model,
) -> Result<CustomerDraft, ServiceError> {
    let doc = resolve_order_document(store, order.id).await?;
    let kind = DocumentKind::from_digits(&doc).unwrap_or(DocumentKind::Natural);

    let full_name = order.billing_full_name();
    let legal_name = non_empty(order.billing_company.clone()).or_else(|| {
        if full_name.is_empty() {
            None
        } else {
            Some(full_name.clone())
        }
    });

    let address_line = order.billing_address_1.clone().unwrap_or_default();
    let address_line = address_line.trim();
    let (street, number) = if address_line.is_empty() {
        (None, None)
    } else {
        (
            non_empty(Some(strip_address_number(address_line))),
            extract_address_number(address_line),
        )
    };

    Ok(CustomerDraft {
        kind,
        name: if full_name.is_empty() {
            None
        } else {
            Some(full_name)
        },
        legal_name,
        email: non_empty(Some(order.billing_email.clone())),
        phone: non_empty(order.billing_phone.clone()),
        document_number: if doc.is_empty() { None } else { Some(doc) },
        address: street,
        address_number: number,
        complement: non_empty(order.billing_address_2.clone()),
        province: non_empty(order.billing_neighborhood.clone()),
        postal_code: non_empty(
            order
                .billing_postcode
                .as_deref()
                .map(only_digits),
        ),
        state: non_empty(order.billing_state.clone()),
        city: non_empty(order.billing_city.clone()),
        tags: vec![ORIGIN_TAG.to_string()],
    })
}

/// Per-checkout invoice creation parameters.
#[derive(Debug, Clone)]
pub struct InvoiceOptions {
    pub payment_method: PaymentMethod,
    pub installments: Option<u32>,
    pub immutable: Option<bool>,
    pub extra_tags: Vec<String>,
}

/// Builds the invoice creation payload: amount in minor units, due today,
/// description from order number and store name, origin + order tags.
pub fn invoice_draft(
    order: &order::Model,
    customer_id: &str,
    store_name: &str,
    opts: &InvoiceOptions,
) -> Result<InvoiceDraft, ServiceError> {
    let mut tags = vec![ORIGIN_TAG.to_string(), format!("order:{}", order.id)];
    tags.extend(opts.extra_tags.iter().cloned());

    Ok(InvoiceDraft {
        customer: customer_id.to_string(),
        payment_method: opts.payment_method,
        amount: amount_in_cents(order.total_amount)?,
        due_date: Utc::now().date_naive(),
        description: format!("Order #{} – {}", order.order_number, store_name),
        installments: opts.installments,
        immutable: opts.immutable,
        tags,
    })
}
