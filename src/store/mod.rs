//! Document store: models, the `DocumentStore` trait and its backends

pub mod client;
mod impl_document_store;
pub mod memory;
pub mod models;
pub mod traits;
pub mod triggering;

pub use client::Neo4jStore;
pub use memory::MemoryStore;
pub use models::*;
pub use traits::{DocumentStore, StoreError, MAX_BATCH_SIZE};
pub use triggering::TriggeringStore;
