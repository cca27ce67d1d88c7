//! sea-orm implementation of the persistence port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter, Set,
};

use crate::entities::{customer_link, order, order_meta, order_note};
use crate::errors::ServiceError;

use super::OrderStore;

pub struct SqlOrderStore {
    db: Arc<DatabaseConnection>,
}

impl SqlOrderStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl OrderStore for SqlOrderStore {
    async fn get_order(&self, order_id: i64) -> Result<Option<order::Model>, ServiceError> {
        Ok(order::Entity::find_by_id(order_id).one(&*self.db).await?)
    }

    async fn set_status(
        &self,
        order_id: i64,
        status: order::OrderStatus,
        note: &str,
    ) -> Result<(), ServiceError> {
        let existing = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let mut active: order::ActiveModel = existing.into();
        active.status = Set(status.to_string());
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;

        self.add_note(order_id, note).await
    }

    async fn mark_paid(&self, order_id: i64, transaction_id: &str) -> Result<(), ServiceError> {
        let existing = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let mut active: order::ActiveModel = existing.into();
        active.status = Set(order::OrderStatus::Paid.to_string());
        active.transaction_id = Set(if transaction_id.is_empty() {
            None
        } else {
            Some(transaction_id.to_string())
        });
        active.paid_at = Set(Some(Utc::now()));
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;
        Ok(())
    }

    async fn add_note(&self, order_id: i64, note: &str) -> Result<(), ServiceError> {
        order_note::ActiveModel {
            id: NotSet,
            order_id: Set(order_id),
            note: Set(note.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;
        Ok(())
    }

    async fn get_meta(&self, order_id: i64, key: &str) -> Result<Option<String>, ServiceError> {
        let row = order_meta::Entity::find()
            .filter(order_meta::Column::OrderId.eq(order_id))
            .filter(order_meta::Column::MetaKey.eq(key))
            .one(&*self.db)
            .await?;
        Ok(row.map(|m| m.meta_value))
    }

    async fn put_meta(&self, order_id: i64, key: &str, value: &str) -> Result<(), ServiceError> {
        let model = order_meta::ActiveModel {
            order_id: Set(order_id),
            meta_key: Set(key.to_string()),
            meta_value: Set(value.to_string()),
        };
        order_meta::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([order_meta::Column::OrderId, order_meta::Column::MetaKey])
                    .update_column(order_meta::Column::MetaValue)
                    .to_owned(),
            )
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    async fn get_customer_link(&self, account_id: i64) -> Result<Option<String>, ServiceError> {
        let row = customer_link::Entity::find_by_id(account_id)
            .one(&*self.db)
            .await?;
        Ok(row.map(|l| l.remote_customer_id))
    }

    async fn put_customer_link(
        &self,
        account_id: i64,
        remote_customer_id: &str,
    ) -> Result<(), ServiceError> {
        let model = customer_link::ActiveModel {
            account_id: Set(account_id),
            remote_customer_id: Set(remote_customer_id.to_string()),
        };
        customer_link::Entity::insert(model)
            .on_conflict(
                OnConflict::column(customer_link::Column::AccountId)
                    .update_column(customer_link::Column::RemoteCustomerId)
                    .to_owned(),
            )
            .exec(&*self.db)
            .await?;
        Ok(())
    }
}
