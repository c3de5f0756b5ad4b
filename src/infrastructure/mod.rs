pub mod batch_query;
pub mod models;
pub mod outbox_store;
pub mod publisher;
