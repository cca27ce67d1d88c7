//! Remote customer resolution.
//!
//! Idempotent ensure: reuse a persisted remote customer ID when the remote
//! still recognizes it, create otherwise, and persist only after the remote
//! has confirmed the ID. Lookup failure of any kind falls through to
//! creation; it is never fatal.

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::document::{normalize_and_validate, DocumentKind};
use crate::entities::order;
use crate::errors::ServiceError;
use crate::processor::types::{Customer, CustomerUpdate};
use crate::processor::{Lookup, ProcessorApi};
use crate::services::mappers;
use crate::store::{meta_keys, OrderStore};

pub struct CustomerResolver {
    store: Arc<dyn OrderStore>,
    processor: Arc<dyn ProcessorApi>,
}

impl CustomerResolver {
    pub fn new(store: Arc<dyn OrderStore>, processor: Arc<dyn ProcessorApi>) -> Self {
        Self { store, processor }
    }

    /// Ensures a remote customer exists for the order's buyer and returns it.
    ///
    /// The account-level link is authoritative when present; the per-order
    /// snapshot is the fallback (guest checkout, account changes). After any
    /// successful resolve both are rewritten with the canonical remote ID,
    /// which self-heals drift between the two.
    #[instrument(skip(self, order), fields(order_id = order.id))]
    pub async fn ensure(&self, order: &order::Model) -> Result<Customer, ServiceError> {
        if let Some(saved_id) = self.saved_id(order).await? {
            match self.processor.get_customer(&saved_id).await {
                Lookup::Found(customer) => {
                    self.persist_ids(order, &customer.id).await?;
                    return Ok(customer);
                }
                Lookup::NotFound => {
                    warn!(%saved_id, "saved customer ID no longer known to processor; recreating");
                }
                Lookup::TransportError(cause) => {
                    warn!(%saved_id, %cause, "customer lookup failed; falling through to create");
                }
            }
        }

        let draft = mappers::customer_draft(&*self.store, order).await?;
        let customer = self.processor.create_customer(&draft).await?;

        if customer.id.is_empty() {
            return Err(ServiceError::RemoteContract(
                "customer create returned no identifier".into(),
            ));
        }

        self.persist_ids(order, &customer.id).await?;
        Ok(customer)
    }

    /// Best-effort sync of the buyer's document to the remote customer
    /// record. The customer identity is already established; a failure here
    /// is logged and swallowed, never surfaced to the caller.
    #[instrument(skip(self), fields(order_id))]
    pub async fn sync_document(&self, customer_id: &str, order_id: i64) {
        let doc = match mappers::resolve_order_document(&*self.store, order_id).await {
            Ok(doc) => normalize_and_validate(&doc),
            Err(e) => {
                warn!(%customer_id, error = %e, "could not read order document for sync");
                return;
            }
        };
        if doc.is_empty() {
            return;
        }

        let kind = DocumentKind::from_digits(&doc).unwrap_or(DocumentKind::Natural);
        let update = CustomerUpdate {
            document_number: doc,
            kind,
        };

        if let Err(e) = self.processor.update_customer(customer_id, &update).await {
            warn!(%customer_id, order_id, error = %e, "document sync to remote customer failed");
        }
    }

    async fn saved_id(&self, order: &order::Model) -> Result<Option<String>, ServiceError> {
        if let Some(account_id) = order.customer_account_id {
            if let Some(id) = self.store.get_customer_link(account_id).await? {
                if !id.is_empty() {
                    return Ok(Some(id));
                }
            }
        }
        Ok(self
            .store
            .get_meta(order.id, meta_keys::CUSTOMER)
            .await?
            .filter(|id| !id.is_empty()))
    }

    async fn persist_ids(
        &self,
        order: &order::Model,
        customer_id: &str,
    ) -> Result<(), ServiceError> {
        if let Some(account_id) = order.customer_account_id {
            self.store
                .put_customer_link(account_id, customer_id)
                .await?;
        }
        self.store
            .put_meta(order.id, meta_keys::CUSTOMER, customer_id)
            .await
    }
}
