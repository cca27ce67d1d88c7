pub mod checkout;
pub mod health;
pub mod receipts;
pub mod webhooks;
