//! rulevault-core - Versioned rule items over a node store.
//!
//! Every stored artifact (rule, package, function, DSL) is a mutable head
//! with an immutable history of checked-in snapshots, plus a set of
//! category tags attached to the head.
//!
//! # Example
//!
//! ```
//! use rulevault_core::{RuleItem, RulesRepository, VersionableItem};
//!
//! let repo = RulesRepository::in_memory();
//! let rule = repo.create_item::<RuleItem>("loan-approval")?;
//!
//! rule.update_title("Loan Rule")?;
//! rule.checkin("first")?;
//! rule.update_title("Loan Rule v2")?;
//! rule.checkin("second")?;
//!
//! let previous = rule.preceding_version()?.expect("first snapshot");
//! assert_eq!(previous.title()?.as_deref(), Some("Loan Rule"));
//! # Ok::<(), rulevault_core::RepositoryError>(())
//! ```

pub mod config;
pub mod error;
pub mod item;
pub mod repository;
pub mod store;
pub mod traits;
pub mod types;
pub mod versioning;

// Re-export commonly used types
pub use config::RepositoryConfig;
pub use error::{ErrorCode, RepositoryError, RepositoryResult, StoreError, StoreResult};
pub use item::{
    CategoryItem, DslItem, FunctionItem, RuleItem, RulePackageItem, VersionableItem,
    VersionedNode,
};
pub use repository::RulesRepository;
pub use store::{InMemoryNodeStore, NodeArena};
pub use traits::{NodeStore, NodeStoreConfig, NodeStoreProvider, VersionNumberGenerator};
pub use types::{ItemFormat, NodeId, NodeKind, NodeRecord, Property, Value};
pub use versioning::{
    DottedVersionGenerator, IncrementingVersionGenerator, ItemVersionIterator, IterationDirection,
    VersionScheme,
};
