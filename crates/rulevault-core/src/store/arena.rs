//! In-memory node graph with check-out/check-in version semantics.
//!
//! Version links are stored as node ids and resolved through the arena on
//! demand, so predecessor/successor pairs never form ownership cycles.
//!
//! ```text
//!  head ──base_version──► v2 ──predecessors──► v1 ──predecessors──► rootVersion
//!                          │                    │
//!                        frozen               frozen
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::types::{property, NodeId, NodeKind, NodeRecord, Property, Value, ROOT_VERSION_NAME};

/// Node records indexed by id, plus the bookkeeping a session needs.
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    nodes: HashMap<NodeId, NodeRecord>,
    /// Category name -> node.
    categories: HashMap<String, NodeId>,
    /// Nodes with property writes not yet saved.
    unsaved: BTreeSet<NodeId>,
    /// Nodes changed since they were last persisted.
    dirty: BTreeSet<NodeId>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an arena from persisted records. Nothing is dirty afterwards.
    pub fn from_records(records: impl IntoIterator<Item = NodeRecord>) -> Self {
        let mut arena = Self::new();
        for record in records {
            arena.insert_persisted(record);
        }
        arena
    }

    /// Add a record that is already durable. It is not marked dirty.
    pub fn insert_persisted(&mut self, record: NodeRecord) -> NodeId {
        let id = record.id;
        if record.kind == NodeKind::Category {
            self.categories.insert(record.name.clone(), id);
        }
        self.nodes.insert(id, record);
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn record(&self, id: NodeId) -> StoreResult<&NodeRecord> {
        self.nodes.get(&id).ok_or(StoreError::NodeNotFound(id))
    }

    fn record_mut(&mut self, id: NodeId) -> StoreResult<&mut NodeRecord> {
        self.nodes.get_mut(&id).ok_or(StoreError::NodeNotFound(id))
    }

    fn insert(&mut self, record: NodeRecord) -> NodeId {
        let id = record.id;
        self.dirty.insert(id);
        self.nodes.insert(id, record);
        id
    }

    /// Create a head or category node.
    ///
    /// A head is created checked out, with a root version as its base.
    pub fn create_node(&mut self, kind: NodeKind, name: &str) -> StoreResult<NodeId> {
        match kind {
            NodeKind::Head => {
                let mut head = NodeRecord::new(NodeKind::Head, name);
                head.checked_out = true;

                let mut root = NodeRecord::new(NodeKind::Version, ROOT_VERSION_NAME);
                root.predecessors = Some(Vec::new());
                root.successors = Some(Vec::new());

                head.base_version = Some(root.id);

                self.insert(root);
                let id = self.insert(head);
                debug!(node = %id, name, "created head node");
                Ok(id)
            }
            NodeKind::Category => {
                let record = NodeRecord::new(NodeKind::Category, name);
                self.categories.insert(name.to_string(), record.id);
                let id = self.insert(record);
                debug!(node = %id, name, "created category node");
                Ok(id)
            }
            NodeKind::Version | NodeKind::Frozen => Err(StoreError::InvalidKind {
                node: NodeId::new(),
                kind,
                operation: "created directly",
            }),
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn property(&self, id: NodeId, name: &str) -> StoreResult<Property> {
        self.record(id)?
            .properties
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::property_not_found(id, name))
    }

    pub fn has_property(&self, id: NodeId, name: &str) -> StoreResult<bool> {
        Ok(self.record(id)?.properties.contains_key(name))
    }

    pub fn set_property(&mut self, id: NodeId, name: &str, value: Property) -> StoreResult<()> {
        let record = self.record_mut(id)?;
        match record.kind {
            NodeKind::Version | NodeKind::Frozen => {
                return Err(StoreError::InvalidKind {
                    node: id,
                    kind: record.kind,
                    operation: "modified",
                })
            }
            NodeKind::Head if !record.checked_out => return Err(StoreError::CheckedIn(id)),
            _ => {}
        }
        record.properties.insert(name.to_string(), value);
        self.unsaved.insert(id);
        self.dirty.insert(id);
        Ok(())
    }

    pub fn frozen_node(&self, version: NodeId) -> StoreResult<NodeId> {
        let record = self.expect_kind(version, NodeKind::Version, "asked for frozen content")?;
        record.frozen.ok_or_else(|| StoreError::ChildNotFound {
            node: version,
            child: "frozenNode".to_string(),
        })
    }

    pub fn checkout(&mut self, id: NodeId) -> StoreResult<()> {
        self.expect_kind(id, NodeKind::Head, "checked out")?;
        let record = self.record_mut(id)?;
        if !record.checked_out {
            record.checked_out = true;
            self.dirty.insert(id);
            debug!(node = %id, "checked out");
        }
        Ok(())
    }

    /// Freeze the head's properties into a new version record.
    ///
    /// `stamp` is written to the head together with the freeze. The new
    /// version becomes the head's base version, succeeding the old one.
    /// Checking in a head that is not checked out returns its current base
    /// version unchanged and ignores `stamp`.
    pub fn checkin(
        &mut self,
        id: NodeId,
        stamp: BTreeMap<String, Property>,
    ) -> StoreResult<NodeId> {
        let staged = self.stage_checkin(id, stamp)?;
        Ok(self.commit_checkin(staged))
    }

    /// Build the records a check-in would write, without touching the arena.
    ///
    /// Every failure happens here, so a store can persist the staged
    /// records first and commit them only once they are durable.
    pub fn stage_checkin(
        &self,
        id: NodeId,
        stamp: BTreeMap<String, Property>,
    ) -> StoreResult<StagedCheckin> {
        let head = self.expect_kind(id, NodeKind::Head, "checked in")?;
        let base = head.base_version.ok_or_else(|| StoreError::Corrupted {
            node: id,
            message: "head has no base version".to_string(),
        })?;
        if !head.checked_out {
            return Ok(StagedCheckin {
                version: base,
                records: Vec::new(),
            });
        }
        if self.unsaved.contains(&id) {
            return Err(StoreError::UnsavedChanges(id));
        }

        let ordinal = self.history_depth(base)? + 1;
        let mut head = head.clone();
        head.properties.extend(stamp);
        let mut properties = head.properties.clone();
        let digest = content_hash(&properties)?;
        properties.insert(property::CONTENT_HASH.to_string(), Property::string(digest));

        let mut frozen = NodeRecord::new(NodeKind::Frozen, head.name.clone());
        frozen.properties = properties;

        let mut version = NodeRecord::new(NodeKind::Version, format!("{ordinal}.0"));
        version.frozen = Some(frozen.id);
        version.predecessors = Some(vec![base]);
        version.successors = Some(Vec::new());

        let mut previous = self.record(base)?.clone();
        previous
            .successors
            .get_or_insert_with(Vec::new)
            .push(version.id);

        head.base_version = Some(version.id);
        head.checked_out = false;

        debug!(node = %id, version = %version.id, ordinal, "staged check-in");
        Ok(StagedCheckin {
            version: version.id,
            records: vec![head, previous, version, frozen],
        })
    }

    /// Apply a staged check-in and return the new base version.
    pub fn commit_checkin(&mut self, staged: StagedCheckin) -> NodeId {
        for record in staged.records {
            self.insert(record);
        }
        staged.version
    }

    pub fn is_checked_out(&self, id: NodeId) -> StoreResult<bool> {
        let record = self.record(id)?;
        Ok(match record.kind {
            NodeKind::Head => record.checked_out,
            NodeKind::Category => true,
            NodeKind::Version | NodeKind::Frozen => false,
        })
    }

    pub fn base_version(&self, id: NodeId) -> StoreResult<NodeId> {
        let record = self.expect_kind(id, NodeKind::Head, "asked for a base version")?;
        record.base_version.ok_or_else(|| StoreError::Corrupted {
            node: id,
            message: "head has no base version".to_string(),
        })
    }

    pub fn predecessors(&self, id: NodeId) -> StoreResult<Vec<NodeId>> {
        self.record(id)?
            .predecessors
            .clone()
            .ok_or_else(|| StoreError::property_not_found(id, "predecessors"))
    }

    pub fn successors(&self, id: NodeId) -> StoreResult<Vec<NodeId>> {
        self.record(id)?
            .successors
            .clone()
            .ok_or_else(|| StoreError::property_not_found(id, "successors"))
    }

    pub fn create_reference(&self, target: NodeId) -> StoreResult<Value> {
        self.record(target)?;
        Ok(Value::Reference(target))
    }

    pub fn find_category(&self, name: &str) -> Option<NodeId> {
        self.categories.get(name).copied()
    }

    /// Forget pending writes; they are now committed.
    pub fn mark_saved(&mut self) {
        self.unsaved.clear();
    }

    /// Records changed since they were last persisted.
    pub fn dirty_records(&self) -> Vec<&NodeRecord> {
        self.dirty
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    pub fn mark_persisted(&mut self) {
        self.dirty.clear();
    }

    /// Forget the dirty flag of records persisted on their own.
    pub fn mark_clean(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        for id in ids {
            self.dirty.remove(&id);
        }
    }

    /// Number of real versions between `version` and the root.
    fn history_depth(&self, version: NodeId) -> StoreResult<usize> {
        let mut depth = 0;
        let mut cursor = version;
        loop {
            let record = self.record(cursor)?;
            if record.name == ROOT_VERSION_NAME {
                return Ok(depth);
            }
            depth += 1;
            if depth > self.nodes.len() {
                return Err(StoreError::Corrupted {
                    node: version,
                    message: "cycle in predecessor links".to_string(),
                });
            }
            cursor = match record.predecessors.as_deref().and_then(|p| p.first()) {
                Some(previous) => *previous,
                None => return Ok(depth),
            };
        }
    }

    fn expect_kind(
        &self,
        id: NodeId,
        kind: NodeKind,
        operation: &'static str,
    ) -> StoreResult<&NodeRecord> {
        let record = self.record(id)?;
        if record.kind != kind {
            return Err(StoreError::InvalidKind {
                node: id,
                kind: record.kind,
                operation,
            });
        }
        Ok(record)
    }
}

/// Records produced by [`NodeArena::stage_checkin`].
///
/// Empty when the head was already checked in.
#[derive(Debug, Clone)]
pub struct StagedCheckin {
    version: NodeId,
    records: Vec<NodeRecord>,
}

impl StagedCheckin {
    /// The base version the head will have once committed.
    pub fn version(&self) -> NodeId {
        self.version
    }

    /// Updated head, updated previous base, new version and its frozen node.
    pub fn records(&self) -> Vec<&NodeRecord> {
        self.records.iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// SHA-256 over the canonical JSON form of a property map.
fn content_hash(properties: &BTreeMap<String, Property>) -> StoreResult<String> {
    let bytes = serde_json::to_vec(properties)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head_with_title(arena: &mut NodeArena, title: &str) -> NodeId {
        let id = arena.create_node(NodeKind::Head, "loan-rule").unwrap();
        arena
            .set_property(id, property::TITLE, Property::string(title))
            .unwrap();
        arena.mark_saved();
        id
    }

    #[test]
    fn test_new_head_is_checked_out_on_root_version() {
        let mut arena = NodeArena::new();
        let id = arena.create_node(NodeKind::Head, "loan-rule").unwrap();

        assert!(arena.is_checked_out(id).unwrap());
        let base = arena.base_version(id).unwrap();
        assert_eq!(arena.record(base).unwrap().name, ROOT_VERSION_NAME);
        assert!(arena.predecessors(base).unwrap().is_empty());
    }

    #[test]
    fn test_checkin_freezes_properties() {
        let mut arena = NodeArena::new();
        let id = head_with_title(&mut arena, "T1");

        let v1 = arena.checkin(id, BTreeMap::new()).unwrap();
        let frozen = arena.frozen_node(v1).unwrap();

        assert_eq!(arena.property(frozen, property::TITLE).unwrap().as_str(), Some("T1"));
        assert!(arena.has_property(frozen, property::CONTENT_HASH).unwrap());
        assert_eq!(arena.base_version(id).unwrap(), v1);
        assert!(!arena.is_checked_out(id).unwrap());
    }

    #[test]
    fn test_checkin_links_predecessor_and_successor() {
        let mut arena = NodeArena::new();
        let id = head_with_title(&mut arena, "T1");
        let root = arena.base_version(id).unwrap();

        let v1 = arena.checkin(id, BTreeMap::new()).unwrap();
        arena.checkout(id).unwrap();
        let v2 = arena.checkin(id, BTreeMap::new()).unwrap();

        assert_eq!(arena.predecessors(v1).unwrap(), vec![root]);
        assert_eq!(arena.predecessors(v2).unwrap(), vec![v1]);
        assert_eq!(arena.successors(root).unwrap(), vec![v1]);
        assert_eq!(arena.successors(v1).unwrap(), vec![v2]);
        assert!(arena.successors(v2).unwrap().is_empty());
        assert_eq!(arena.record(v2).unwrap().name, "2.0");
    }

    #[test]
    fn test_checkin_stamp_is_frozen_with_content() {
        let mut arena = NodeArena::new();
        let id = head_with_title(&mut arena, "T1");
        let stamp = BTreeMap::from([(
            property::VERSION_NUMBER.to_string(),
            Property::string("1"),
        )]);

        let v1 = arena.checkin(id, stamp).unwrap();
        let frozen = arena.frozen_node(v1).unwrap();
        assert_eq!(
            arena.property(frozen, property::VERSION_NUMBER).unwrap().as_str(),
            Some("1")
        );
        assert_eq!(
            arena.property(id, property::VERSION_NUMBER).unwrap().as_str(),
            Some("1")
        );
    }

    #[test]
    fn test_staged_checkin_leaves_arena_untouched() {
        let mut arena = NodeArena::new();
        let id = head_with_title(&mut arena, "T1");
        let root = arena.base_version(id).unwrap();
        let before = arena.len();
        let stamp = BTreeMap::from([(
            property::VERSION_NUMBER.to_string(),
            Property::string("1"),
        )]);

        let staged = arena.stage_checkin(id, stamp).unwrap();
        assert_eq!(staged.records().len(), 4);
        assert_eq!(arena.len(), before);
        assert_eq!(arena.base_version(id).unwrap(), root);
        assert!(arena.is_checked_out(id).unwrap());
        assert!(!arena.has_property(id, property::VERSION_NUMBER).unwrap());
        assert!(arena.successors(root).unwrap().is_empty());

        let version = staged.version();
        assert_eq!(arena.commit_checkin(staged), version);
        assert_eq!(arena.base_version(id).unwrap(), version);
        assert_eq!(arena.successors(root).unwrap(), vec![version]);
        assert_eq!(arena.len(), before + 2);
    }

    #[test]
    fn test_staging_checked_in_head_is_empty() {
        let mut arena = NodeArena::new();
        let id = head_with_title(&mut arena, "T1");
        let v1 = arena.checkin(id, BTreeMap::new()).unwrap();

        let staged = arena.stage_checkin(id, BTreeMap::new()).unwrap();
        assert!(staged.is_empty());
        assert_eq!(staged.version(), v1);
    }

    #[test]
    fn test_write_to_checked_in_head_fails() {
        let mut arena = NodeArena::new();
        let id = head_with_title(&mut arena, "T1");
        arena.checkin(id, BTreeMap::new()).unwrap();

        let err = arena
            .set_property(id, property::TITLE, Property::string("T2"))
            .unwrap_err();
        assert!(matches!(err, StoreError::CheckedIn(node) if node == id));
    }

    #[test]
    fn test_checkin_with_unsaved_changes_fails() {
        let mut arena = NodeArena::new();
        let id = arena.create_node(NodeKind::Head, "loan-rule").unwrap();
        arena
            .set_property(id, property::TITLE, Property::string("T1"))
            .unwrap();

        assert!(matches!(
            arena.checkin(id, BTreeMap::new()),
            Err(StoreError::UnsavedChanges(_))
        ));
        assert!(arena.is_checked_out(id).unwrap());
    }

    #[test]
    fn test_checkin_of_checked_in_head_is_noop() {
        let mut arena = NodeArena::new();
        let id = head_with_title(&mut arena, "T1");
        let v1 = arena.checkin(id, BTreeMap::new()).unwrap();

        assert_eq!(arena.checkin(id, BTreeMap::new()).unwrap(), v1);
        assert!(arena.successors(v1).unwrap().is_empty());
    }

    #[test]
    fn test_history_nodes_are_immutable() {
        let mut arena = NodeArena::new();
        let id = head_with_title(&mut arena, "T1");
        let v1 = arena.checkin(id, BTreeMap::new()).unwrap();
        let frozen = arena.frozen_node(v1).unwrap();

        for node in [v1, frozen] {
            let err = arena
                .set_property(node, property::TITLE, Property::string("X"))
                .unwrap_err();
            assert!(matches!(err, StoreError::InvalidKind { .. }));
        }
    }

    #[test]
    fn test_head_has_no_successor_links() {
        let mut arena = NodeArena::new();
        let id = head_with_title(&mut arena, "T1");
        assert!(arena.successors(id).unwrap_err().is_absence());
    }

    #[test]
    fn test_identical_content_hashes_match() {
        let mut arena = NodeArena::new();
        let id = head_with_title(&mut arena, "T1");
        let v1 = arena.checkin(id, BTreeMap::new()).unwrap();
        arena.checkout(id).unwrap();
        let v2 = arena.checkin(id, BTreeMap::new()).unwrap();

        let h1 = arena
            .property(arena.frozen_node(v1).unwrap(), property::CONTENT_HASH)
            .unwrap();
        let h2 = arena
            .property(arena.frozen_node(v2).unwrap(), property::CONTENT_HASH)
            .unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_categories_are_indexed_by_name() {
        let mut arena = NodeArena::new();
        let id = arena.create_node(NodeKind::Category, "finance").unwrap();
        assert_eq!(arena.find_category("finance"), Some(id));
        assert!(arena.find_category("legal").is_none());

        let restored = NodeArena::from_records(arena.dirty_records().into_iter().cloned());
        assert_eq!(restored.find_category("finance"), Some(id));
    }

    #[test]
    fn test_version_nodes_cannot_be_created_directly() {
        let mut arena = NodeArena::new();
        assert!(arena.create_node(NodeKind::Frozen, "x").is_err());
    }
}
