use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Storefront order snapshot. Owned by the storefront platform; this service
/// mutates only `status`, `transaction_id`/`paid_at` and the metadata rows
/// keyed by `id`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    pub order_number: String,

    /// Storefront account of the buyer; None for guest checkout.
    pub customer_account_id: Option<i64>,

    pub status: String,
    pub payment_method: Option<String>,

    pub total_amount: Decimal,
    pub currency: String,

    // Billing snapshot used to build the remote customer record
    pub billing_first_name: String,
    pub billing_last_name: String,
    pub billing_company: Option<String>,
    pub billing_email: String,
    pub billing_phone: Option<String>,
    pub billing_address_1: Option<String>,
    pub billing_address_2: Option<String>,
    pub billing_neighborhood: Option<String>,
    pub billing_city: Option<String>,
    pub billing_state: Option<String>,
    pub billing_postcode: Option<String>,

    /// Processor charge/payment reference set when the order is paid.
    pub transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_meta::Entity")]
    Meta,
    #[sea_orm(has_many = "super::order_note::Entity")]
    Notes,
}

impl Related<super::order_meta::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meta.def()
    }
}

impl Related<super::order_note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Order lifecycle as this service drives it. `Pending` is where the
/// storefront leaves a fresh order; checkout moves it to `OnHold` (payment
/// initiated, not confirmed) and webhook notifications settle it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    OnHold,
    Paid,
    Failed,
}

impl Model {
    pub fn status(&self) -> Option<OrderStatus> {
        self.status.parse().ok()
    }

    pub fn is_paid(&self) -> bool {
        self.status() == Some(OrderStatus::Paid)
    }

    pub fn billing_full_name(&self) -> String {
        let name = format!("{} {}", self.billing_first_name, self.billing_last_name);
        name.trim().to_string()
    }
}
