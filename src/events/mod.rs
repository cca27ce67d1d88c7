//! Payment lifecycle events.
//!
//! Checkout and the webhook handler emit events over an mpsc channel; a
//! background consumer logs them. Delivery is best-effort and never blocks a
//! request path.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::entities::order::OrderStatus;
use crate::processor::types::PaymentMethod;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CheckoutGenerated {
        order_id: i64,
        method: PaymentMethod,
        payment_id: String,
    },
    PaymentConfirmed {
        order_id: i64,
        transaction_id: Option<String>,
    },
    PaymentFailed {
        order_id: i64,
        reason: String,
    },
    OrderStatusChanged {
        order_id: i64,
        new_status: OrderStatus,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Channel of the given capacity plus the receiving half for the
    /// consumer task.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("Failed to enqueue event: {}", e);
        }
    }
}

/// Consumer task; runs until every sender is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::CheckoutGenerated {
                order_id,
                method,
                payment_id,
            } => info!(order_id, %method, %payment_id, "checkout payment generated"),
            Event::PaymentConfirmed {
                order_id,
                transaction_id,
            } => info!(order_id, ?transaction_id, "payment confirmed"),
            Event::PaymentFailed { order_id, reason } => {
                warn!(order_id, %reason, "payment failed")
            }
            Event::OrderStatusChanged {
                order_id,
                new_status,
            } => info!(order_id, %new_status, "order status changed"),
        }
    }
}
