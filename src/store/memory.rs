//! In-memory implementation of the persistence port, for tests and local
//! development without a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::entities::order::{self, OrderStatus};
use crate::errors::ServiceError;

use super::OrderStore;

#[derive(Default)]
struct State {
    orders: HashMap<i64, order::Model>,
    meta: HashMap<(i64, String), String>,
    notes: HashMap<i64, Vec<String>>,
    links: HashMap<i64, String>,
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    state: RwLock<State>,
    writes: AtomicUsize,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_order(&self, model: order::Model) {
        self.state.write().await.orders.insert(model.id, model);
    }

    pub async fn notes_for(&self, order_id: i64) -> Vec<String> {
        self.state
            .read()
            .await
            .notes
            .get(&order_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Count of persistence writes (meta + links) since construction.
    pub fn persistence_writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get_order(&self, order_id: i64) -> Result<Option<order::Model>, ServiceError> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn set_status(
        &self,
        order_id: i64,
        status: OrderStatus,
        note: &str,
    ) -> Result<(), ServiceError> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        order.status = status.to_string();
        order.updated_at = Some(Utc::now());
        state
            .notes
            .entry(order_id)
            .or_default()
            .push(note.to_string());
        Ok(())
    }

    async fn mark_paid(&self, order_id: i64, transaction_id: &str) -> Result<(), ServiceError> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        order.status = OrderStatus::Paid.to_string();
        order.transaction_id = if transaction_id.is_empty() {
            None
        } else {
            Some(transaction_id.to_string())
        };
        order.paid_at = Some(Utc::now());
        order.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn add_note(&self, order_id: i64, note: &str) -> Result<(), ServiceError> {
        self.state
            .write()
            .await
            .notes
            .entry(order_id)
            .or_default()
            .push(note.to_string());
        Ok(())
    }

    async fn get_meta(&self, order_id: i64, key: &str) -> Result<Option<String>, ServiceError> {
        Ok(self
            .state
            .read()
            .await
            .meta
            .get(&(order_id, key.to_string()))
            .cloned())
    }

    async fn put_meta(&self, order_id: i64, key: &str, value: &str) -> Result<(), ServiceError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.state
            .write()
            .await
            .meta
            .insert((order_id, key.to_string()), value.to_string());
        Ok(())
    }

    async fn get_customer_link(&self, account_id: i64) -> Result<Option<String>, ServiceError> {
        Ok(self.state.read().await.links.get(&account_id).cloned())
    }

    async fn put_customer_link(
        &self,
        account_id: i64,
        remote_customer_id: &str,
    ) -> Result<(), ServiceError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.state
            .write()
            .await
            .links
            .insert(account_id, remote_customer_id.to_string());
        Ok(())
    }
}
