//! In-memory node store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::NodeArena;
use crate::traits::NodeStore;
use crate::types::{NodeId, NodeKind, Property, Value};

/// Node store that keeps everything in process memory.
///
/// Nothing survives the process. Useful for tests and short-lived sessions.
pub struct InMemoryNodeStore {
    arena: Mutex<NodeArena>,
    versioning: bool,
}

impl InMemoryNodeStore {
    /// Create an empty store with versioning enabled.
    pub fn new() -> Self {
        Self {
            arena: Mutex::new(NodeArena::new()),
            versioning: true,
        }
    }

    /// Create a store that rejects every version operation.
    pub fn non_versioning() -> Self {
        Self {
            arena: Mutex::new(NodeArena::new()),
            versioning: false,
        }
    }

    /// Number of nodes held, version records and snapshots included.
    pub fn node_count(&self) -> StoreResult<usize> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, NodeArena>> {
        self.arena
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn require_versioning(&self) -> StoreResult<()> {
        if self.versioning {
            Ok(())
        } else {
            Err(StoreError::VersioningUnsupported)
        }
    }
}

impl Default for InMemoryNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore for InMemoryNodeStore {
    fn supports_versioning(&self) -> bool {
        self.versioning
    }

    fn create_node(&self, kind: NodeKind, name: &str) -> StoreResult<NodeId> {
        self.lock()?.create_node(kind, name)
    }

    fn contains(&self, id: NodeId) -> StoreResult<bool> {
        Ok(self.lock()?.contains(id))
    }

    fn node_kind(&self, id: NodeId) -> StoreResult<NodeKind> {
        Ok(self.lock()?.record(id)?.kind)
    }

    fn node_name(&self, id: NodeId) -> StoreResult<String> {
        Ok(self.lock()?.record(id)?.name.clone())
    }

    fn property(&self, id: NodeId, name: &str) -> StoreResult<Property> {
        self.lock()?.property(id, name)
    }

    fn has_property(&self, id: NodeId, name: &str) -> StoreResult<bool> {
        self.lock()?.has_property(id, name)
    }

    fn set_property(&self, id: NodeId, name: &str, value: Property) -> StoreResult<()> {
        self.lock()?.set_property(id, name, value)
    }

    fn frozen_node(&self, version: NodeId) -> StoreResult<NodeId> {
        self.require_versioning()?;
        self.lock()?.frozen_node(version)
    }

    fn checkout(&self, id: NodeId) -> StoreResult<()> {
        self.require_versioning()?;
        self.lock()?.checkout(id)
    }

    fn checkin(&self, id: NodeId, stamp: BTreeMap<String, Property>) -> StoreResult<NodeId> {
        self.require_versioning()?;
        self.lock()?.checkin(id, stamp)
    }

    fn is_checked_out(&self, id: NodeId) -> StoreResult<bool> {
        self.lock()?.is_checked_out(id)
    }

    fn base_version(&self, id: NodeId) -> StoreResult<NodeId> {
        self.require_versioning()?;
        self.lock()?.base_version(id)
    }

    fn predecessors(&self, id: NodeId) -> StoreResult<Vec<NodeId>> {
        self.require_versioning()?;
        self.lock()?.predecessors(id)
    }

    fn successors(&self, id: NodeId) -> StoreResult<Vec<NodeId>> {
        self.require_versioning()?;
        self.lock()?.successors(id)
    }

    fn create_reference(&self, target: NodeId) -> StoreResult<Value> {
        self.lock()?.create_reference(target)
    }

    fn find_category(&self, name: &str) -> StoreResult<Option<NodeId>> {
        Ok(self.lock()?.find_category(name))
    }

    fn save(&self) -> StoreResult<()> {
        let mut arena = self.lock()?;
        let changed = arena.dirty_records().len();
        arena.mark_saved();
        arena.mark_persisted();
        debug!(changed, "saved in-memory session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::property;

    #[test]
    fn test_save_allows_checkin() {
        let store = InMemoryNodeStore::new();
        let id = store.create_node(NodeKind::Head, "rule").unwrap();
        store
            .set_property(id, property::TITLE, Property::string("T1"))
            .unwrap();

        assert!(matches!(
            store.checkin(id, BTreeMap::new()),
            Err(StoreError::UnsavedChanges(_))
        ));
        store.save().unwrap();
        let version = store.checkin(id, BTreeMap::new()).unwrap();
        assert_eq!(store.base_version(id).unwrap(), version);
    }

    #[test]
    fn test_non_versioning_store_rejects_version_ops() {
        let store = InMemoryNodeStore::non_versioning();
        let id = store.create_node(NodeKind::Head, "rule").unwrap();

        assert!(!store.supports_versioning());
        assert!(matches!(store.checkout(id), Err(StoreError::VersioningUnsupported)));
        assert!(matches!(
            store.checkin(id, BTreeMap::new()),
            Err(StoreError::VersioningUnsupported)
        ));
        assert!(matches!(
            store.base_version(id),
            Err(StoreError::VersioningUnsupported)
        ));
        // plain properties still work
        store
            .set_property(id, property::TITLE, Property::string("T1"))
            .unwrap();
    }

    #[test]
    fn test_unknown_node() {
        let store = InMemoryNodeStore::new();
        let missing = NodeId::new();
        assert!(!store.contains(missing).unwrap());
        assert!(matches!(
            store.node_kind(missing),
            Err(StoreError::NodeNotFound(id)) if id == missing
        ));
    }

    #[test]
    fn test_head_creates_root_version() {
        let store = InMemoryNodeStore::new();
        store.create_node(NodeKind::Head, "rule").unwrap();
        assert_eq!(store.node_count().unwrap(), 2);
    }
}
