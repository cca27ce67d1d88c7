//! Remote invoice resolution.
//!
//! Same ensure discipline as the customer resolver, scoped to the order:
//! reuse the persisted invoice when the remote still has it, create
//! otherwise, persist only a remote-confirmed ID.

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::entities::order;
use crate::errors::ServiceError;
use crate::processor::types::Invoice;
use crate::processor::{Lookup, ProcessorApi};
use crate::services::mappers::{self, InvoiceOptions};
use crate::store::{meta_keys, OrderStore};

pub struct InvoiceResolver {
    store: Arc<dyn OrderStore>,
    processor: Arc<dyn ProcessorApi>,
    store_name: String,
}

impl InvoiceResolver {
    pub fn new(
        store: Arc<dyn OrderStore>,
        processor: Arc<dyn ProcessorApi>,
        store_name: String,
    ) -> Self {
        Self {
            store,
            processor,
            store_name,
        }
    }

    /// Ensures a remote invoice exists for the order and returns it with its
    /// payments. A saved ID the remote no longer recognizes, or a lookup that
    /// fails in transit, falls through to creation.
    #[instrument(skip(self, order, opts), fields(order_id = order.id))]
    pub async fn ensure(
        &self,
        order: &order::Model,
        customer_id: &str,
        opts: &InvoiceOptions,
    ) -> Result<Invoice, ServiceError> {
        if let Some(saved_id) = self
            .store
            .get_meta(order.id, meta_keys::INVOICE)
            .await?
            .filter(|id| !id.is_empty())
        {
            match self.processor.get_invoice(&saved_id).await {
                Lookup::Found(invoice) => {
                    // Rewrite the canonical ID so drift self-heals
                    self.store
                        .put_meta(order.id, meta_keys::INVOICE, &invoice.id)
                        .await?;
                    return Ok(invoice);
                }
                Lookup::NotFound => {
                    warn!(%saved_id, "saved invoice ID no longer known to processor; recreating");
                }
                Lookup::TransportError(cause) => {
                    warn!(%saved_id, %cause, "invoice lookup failed; falling through to create");
                }
            }
        }

        let draft = mappers::invoice_draft(order, customer_id, &self.store_name, opts)?;
        let invoice = self.processor.create_invoice(&draft).await?;

        if invoice.id.is_empty() {
            return Err(ServiceError::RemoteContract(
                "invoice create returned no identifier".into(),
            ));
        }

        self.store
            .put_meta(order.id, meta_keys::INVOICE, &invoice.id)
            .await?;
        Ok(invoice)
    }
}
