pub mod customer_link;
pub mod order;
pub mod order_meta;
pub mod order_note;
