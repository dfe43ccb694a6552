//! rulevault-stores - Node store implementations for rulevault.
//!
//! # Supported Backends
//!
//! - **Memory** - re-exported from `rulevault-core`
//! - **SQLite** (feature: `sqlite`, default) - embedded single-file store

mod factory;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use factory::NodeStoreFactory;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteNodeStore;

// Re-export core types
pub use rulevault_core::store::InMemoryNodeStore;
pub use rulevault_core::traits::{NodeStore, NodeStoreConfig, NodeStoreProvider};
