//! Versionable items and their concrete kinds.
//!
//! [`VersionedNode`] carries the behaviour shared by every item. Concrete
//! kinds wrap it and implement [`VersionableItem`] so that history
//! traversal hands back the caller's own kind.

mod category;
mod kinds;
mod versioned;

pub use category::CategoryItem;
pub use kinds::{DslItem, FunctionItem, RuleItem, RulePackageItem};
pub use versioned::VersionedNode;

use crate::error::RepositoryResult;
use crate::types::ItemFormat;
use crate::versioning::{IterationDirection, ItemVersionIterator};

/// Capability shared by every concrete item kind.
pub trait VersionableItem: Sized {
    /// Format stamped on items of this kind when they are created.
    const FORMAT: ItemFormat;

    /// Wrap a node as this kind.
    fn from_versioned_node(node: VersionedNode) -> Self;

    fn versioned_node(&self) -> &VersionedNode;

    /// The previous snapshot, as the same kind.
    fn preceding_version(&self) -> RepositoryResult<Option<Self>> {
        Ok(self
            .versioned_node()
            .preceding_version_node()?
            .map(Self::from_versioned_node))
    }

    /// The next snapshot, as the same kind.
    fn succeeding_version(&self) -> RepositoryResult<Option<Self>> {
        Ok(self
            .versioned_node()
            .succeeding_version_node()?
            .map(Self::from_versioned_node))
    }

    fn predecessor_versions_iterator(&self) -> ItemVersionIterator<Self> {
        ItemVersionIterator::new(self, IterationDirection::Predecessor)
    }

    fn successor_versions_iterator(&self) -> ItemVersionIterator<Self> {
        ItemVersionIterator::new(self, IterationDirection::Successor)
    }

    /// Every earlier snapshot, newest first.
    fn history(&self) -> RepositoryResult<Vec<Self>> {
        self.predecessor_versions_iterator().collect()
    }
}
