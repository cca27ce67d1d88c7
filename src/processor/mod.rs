//! Remote payment-processor capability.
//!
//! The rest of the crate talks to the processor exclusively through
//! [`ProcessorApi`], so services can be wired with the HTTP client in
//! production and a scripted fake in tests.

pub mod http;
pub mod types;

use async_trait::async_trait;

use crate::errors::ServiceError;
use types::{
    CardCharge, ChargeResult, Customer, CustomerDraft, CustomerUpdate, Invoice, InvoiceDraft,
};

/// Outcome of a remote lookup. Not-found and transport failure are distinct,
/// visible cases rather than a catch-all exception, so the resolver's
/// fall-through-to-create branch is an explicit match arm.
#[derive(Debug)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    TransportError(String),
}

#[async_trait]
pub trait ProcessorApi: Send + Sync {
    async fn get_customer(&self, id: &str) -> Lookup<Customer>;
    async fn create_customer(&self, draft: &CustomerDraft) -> Result<Customer, ServiceError>;
    async fn update_customer(&self, id: &str, update: &CustomerUpdate)
        -> Result<(), ServiceError>;

    async fn get_invoice(&self, id: &str) -> Lookup<Invoice>;
    async fn create_invoice(&self, draft: &InvoiceDraft) -> Result<Invoice, ServiceError>;

    /// Synchronous card charge against an existing invoice.
    async fn charge_card(
        &self,
        invoice_id: &str,
        charge: &CardCharge,
    ) -> Result<ChargeResult, ServiceError>;
}
