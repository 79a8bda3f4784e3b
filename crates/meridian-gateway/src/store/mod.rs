//! Store implementations.

mod memory;

pub use memory::{InMemoryCatalogStore, InMemoryTenantStore};
