//! Node store trait and related types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::StoreResult;
use crate::types::{NodeId, NodeKind, Property, Value};

/// Core NodeStore trait - all node store backends implement this.
///
/// A store is one session: writes through [`NodeStore::set_property`] are
/// pending until [`NodeStore::save`] commits them. Checking a node in
/// freezes its current state into a new immutable version record.
///
/// Absence of a property or version link is reported as
/// [`StoreError::PropertyNotFound`](crate::error::StoreError::PropertyNotFound)
/// so callers can tell it apart from real failures.
#[cfg_attr(test, mockall::automock)]
pub trait NodeStore: Send + Sync {
    /// Whether checkout/checkin and version links are available.
    fn supports_versioning(&self) -> bool;

    /// Create a node. Heads start checked out with an empty history.
    fn create_node(&self, kind: NodeKind, name: &str) -> StoreResult<NodeId>;

    /// Check whether a node exists.
    fn contains(&self, id: NodeId) -> StoreResult<bool>;

    /// Structural type of the node.
    fn node_kind(&self, id: NodeId) -> StoreResult<NodeKind>;

    /// Name of the node.
    fn node_name(&self, id: NodeId) -> StoreResult<String>;

    /// Read a property.
    fn property(&self, id: NodeId, name: &str) -> StoreResult<Property>;

    /// Check whether a property exists.
    fn has_property(&self, id: NodeId, name: &str) -> StoreResult<bool>;

    /// Write a property, replacing any previous value.
    fn set_property(&self, id: NodeId, name: &str, value: Property) -> StoreResult<()>;

    /// The frozen content child of a version record.
    fn frozen_node(&self, version: NodeId) -> StoreResult<NodeId>;

    /// Make a head node writable.
    fn checkout(&self, id: NodeId) -> StoreResult<()>;

    /// Freeze a head node's saved state into a new version record.
    ///
    /// `stamp` is written to the head and the snapshot as part of the same
    /// change. If the check-in fails, neither the head nor its history is
    /// modified.
    fn checkin(&self, id: NodeId, stamp: BTreeMap<String, Property>) -> StoreResult<NodeId>;

    /// Whether a node accepts writes.
    fn is_checked_out(&self, id: NodeId) -> StoreResult<bool>;

    /// The version record a head node's content was last frozen into.
    fn base_version(&self, id: NodeId) -> StoreResult<NodeId>;

    /// Predecessor links of a version record.
    fn predecessors(&self, id: NodeId) -> StoreResult<Vec<NodeId>>;

    /// Successor links of a version record.
    fn successors(&self, id: NodeId) -> StoreResult<Vec<NodeId>>;

    /// Create a value referencing `target`.
    fn create_reference(&self, target: NodeId) -> StoreResult<Value>;

    /// Look up a category node by name.
    fn find_category(&self, name: &str) -> StoreResult<Option<NodeId>>;

    /// Commit pending writes.
    fn save(&self) -> StoreResult<()>;
}

/// Node store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStoreConfig {
    /// Provider type.
    pub provider: NodeStoreProvider,
    /// Database path for file-backed providers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Workspace partition inside the store.
    pub workspace: String,
}

impl Default for NodeStoreConfig {
    fn default() -> Self {
        Self {
            provider: NodeStoreProvider::Memory,
            path: None,
            workspace: "default".to_string(),
        }
    }
}

impl NodeStoreConfig {
    /// The configured path, or `~/.rulevault/nodes.db`.
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_db_path)
    }
}

/// Default location of the SQLite node database.
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".rulevault"))
        .unwrap_or_else(|| PathBuf::from(".rulevault"))
        .join("nodes.db")
}

/// Node store provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeStoreProvider {
    #[default]
    Memory,
    Sqlite,
}
