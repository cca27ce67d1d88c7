pub mod checkout;
pub mod customers;
pub mod invoices;
pub mod mappers;
pub mod payloads;
pub mod persisters;
pub mod receipts;
