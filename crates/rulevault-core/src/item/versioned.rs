//! Shared state and behaviour of every versionable item.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use once_cell::unsync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{ErrorCode, OptionalExt, RepositoryError, RepositoryResult, StoreError};
use crate::repository::RulesRepository;
use crate::traits::NodeStore;
use crate::types::{property, ItemFormat, NodeId, NodeKind, Property, ROOT_VERSION_NAME};

/// One item, head or historical, bound to a repository session.
///
/// The content node is resolved on first use and cached for the lifetime of
/// the wrapper. A wrapper is cheap; create one per access rather than
/// holding it across sessions.
#[derive(Debug, Clone)]
pub struct VersionedNode {
    repository: RulesRepository,
    node: NodeId,
    content: OnceCell<NodeId>,
}

impl VersionedNode {
    pub fn new(repository: RulesRepository, node: NodeId) -> Self {
        Self {
            repository,
            node,
            content: OnceCell::new(),
        }
    }

    /// The wrapped node: a head or a version record.
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn repository(&self) -> &RulesRepository {
        &self.repository
    }

    pub(crate) fn store(&self) -> &dyn NodeStore {
        self.repository.store()
    }

    /// Another node of the same repository.
    pub(crate) fn sibling(&self, node: NodeId) -> Self {
        Self::new(self.repository.clone(), node)
    }

    /// True iff the wrapped node is a version record or a frozen snapshot.
    pub fn is_historical_version(&self) -> RepositoryResult<bool> {
        Ok(self.node_kind()?.is_historical())
    }

    /// The node holding this item's property values.
    ///
    /// A version record resolves to its frozen child, anything else to
    /// itself. Repeated calls return the same id.
    pub fn resolve_content(&self) -> RepositoryResult<NodeId> {
        self.content
            .get_or_try_init(|| {
                if self.node_kind()? == NodeKind::Version {
                    self.store()
                        .frozen_node(self.node)
                        .map_err(|e| RepositoryError::store("resolving frozen content", e))
                } else {
                    Ok(self.node)
                }
            })
            .copied()
    }

    pub fn content_node_id(&self) -> RepositoryResult<NodeId> {
        self.resolve_content()
    }

    fn node_kind(&self) -> RepositoryResult<NodeKind> {
        self.store()
            .node_kind(self.node)
            .map_err(|e| RepositoryError::store("reading node kind", e))
    }

    pub fn name(&self) -> RepositoryResult<String> {
        let content = self.resolve_content()?;
        self.store()
            .node_name(content)
            .map_err(|e| RepositoryError::store("reading item name", e))
    }

    pub fn title(&self) -> RepositoryResult<Option<String>> {
        self.read_string(property::TITLE)
    }

    pub fn description(&self) -> RepositoryResult<Option<String>> {
        self.read_string(property::DESCRIPTION)
    }

    pub fn checkin_comment(&self) -> RepositoryResult<Option<String>> {
        self.read_string(property::CHECKIN_COMMENT)
    }

    /// The marker assigned at the last check-in, `None` if never checked in.
    pub fn version_number(&self) -> RepositoryResult<Option<String>> {
        self.read_string(property::VERSION_NUMBER)
    }

    pub fn format(&self) -> RepositoryResult<Option<ItemFormat>> {
        let Some(raw) = self.read_string(property::FORMAT)? else {
            return Ok(None);
        };
        raw.parse::<ItemFormat>().map(Some).map_err(|_| {
            RepositoryError::validation_with_suggestion(
                format!("Unknown item format '{raw}'"),
                ErrorCode::ValFormatMismatch,
                format!("Expected one of: {}", ItemFormat::all_names().join(", ")),
            )
        })
    }

    pub fn last_modified(&self) -> RepositoryResult<Option<DateTime<Utc>>> {
        let content = self.resolve_content()?;
        let Some(prop) = self.read_property(content, property::LAST_MODIFIED)? else {
            return Ok(None);
        };
        prop.as_date().map(Some).ok_or_else(|| {
            RepositoryError::store(
                "reading lastModified",
                StoreError::ValueType {
                    node: content,
                    property: property::LAST_MODIFIED.to_string(),
                    expected: "date",
                },
            )
        })
    }

    pub fn update_title(&self, title: &str) -> RepositoryResult<()> {
        self.update_string(property::TITLE, title)
    }

    pub fn update_description(&self, description: &str) -> RepositoryResult<()> {
        self.update_string(property::DESCRIPTION, description)
    }

    pub fn update_format(&self, format: ItemFormat) -> RepositoryResult<()> {
        self.update_string(property::FORMAT, format.as_str())
    }

    /// Make the head writable.
    pub fn checkout(&self) -> RepositoryResult<()> {
        self.check_is_updateable()?;
        self.checkout_node()
    }

    /// Freeze the head's pending edits into a new historical snapshot.
    ///
    /// The head is checked out first if needed. The next version marker is
    /// derived from the marker the head carried before this call. The
    /// marker, comment and modification time are written by the store
    /// together with the freeze, so a failed check-in leaves them as they
    /// were. Returns the new version record.
    pub fn checkin(&self, comment: &str) -> RepositoryResult<NodeId> {
        self.check_is_updateable()?;
        self.checkout_node()?;

        let current = self.version_number()?;
        let next = self
            .repository
            .generator()
            .calculate_next_version(current.as_deref(), self)?;

        let stamp = BTreeMap::from([
            (
                property::LAST_MODIFIED.to_string(),
                Property::date(Utc::now()),
            ),
            (
                property::CHECKIN_COMMENT.to_string(),
                Property::string(comment),
            ),
            (
                property::VERSION_NUMBER.to_string(),
                Property::string(next.as_str()),
            ),
        ]);

        self.repository.save()?;
        let version = self
            .store()
            .checkin(self.node, stamp)
            .map_err(|e| RepositoryError::store("checking in", e))?;

        info!(node = %self.node, version = %version, marker = %next, "checked in item");
        Ok(version)
    }

    /// Reject any mutation of a historical snapshot.
    pub fn check_is_updateable(&self) -> RepositoryResult<()> {
        if self.is_historical_version()? {
            warn!(node = %self.node, "rejected mutation of historical version");
            return Err(RepositoryError::usage(format!(
                "Item {} is a historical version and cannot be modified",
                self.node
            )));
        }
        Ok(())
    }

    /// The snapshot before this one, never the virtual root.
    ///
    /// A head starts from its base version. Only the first predecessor link
    /// is followed; history is linear per item.
    pub fn preceding_version_node(&self) -> RepositoryResult<Option<VersionedNode>> {
        let version = if self.node_kind()? == NodeKind::Version {
            self.node
        } else {
            self.store()
                .base_version(self.node)
                .map_err(|e| RepositoryError::store("reading base version", e))?
        };

        let links = self
            .store()
            .predecessors(version)
            .optional()
            .map_err(|e| RepositoryError::store("reading predecessor links", e))?;
        let Some(previous) = links.and_then(|l| l.first().copied()) else {
            return Ok(None);
        };

        let name = self
            .store()
            .node_name(previous)
            .map_err(|e| RepositoryError::store("reading predecessor", e))?;
        if name == ROOT_VERSION_NAME {
            return Ok(None);
        }
        Ok(Some(self.sibling(previous)))
    }

    /// The snapshot after this one, read directly off the wrapped node.
    pub fn succeeding_version_node(&self) -> RepositoryResult<Option<VersionedNode>> {
        let links = self
            .store()
            .successors(self.node)
            .optional()
            .map_err(|e| RepositoryError::store("reading successor links", e))?;
        Ok(links
            .and_then(|l| l.first().copied())
            .map(|next| self.sibling(next)))
    }

    pub(crate) fn checkout_node(&self) -> RepositoryResult<()> {
        self.store()
            .checkout(self.node)
            .map_err(|e| RepositoryError::store("checking out", e))?;
        debug!(node = %self.node, "item checked out");
        Ok(())
    }

    pub(crate) fn read_property(
        &self,
        node: NodeId,
        name: &str,
    ) -> RepositoryResult<Option<Property>> {
        self.store()
            .property(node, name)
            .optional()
            .map_err(|e| RepositoryError::store("reading property", e))
    }

    pub(crate) fn write(&self, name: &str, value: Property) -> RepositoryResult<()> {
        self.store()
            .set_property(self.node, name, value)
            .map_err(|e| RepositoryError::store("writing property", e))
    }

    fn read_string(&self, name: &str) -> RepositoryResult<Option<String>> {
        let content = self.resolve_content()?;
        let Some(prop) = self.read_property(content, name)? else {
            return Ok(None);
        };
        match prop.as_str() {
            Some(s) => Ok(Some(s.to_string())),
            None => Err(RepositoryError::store(
                "reading property",
                StoreError::ValueType {
                    node: content,
                    property: name.to_string(),
                    expected: "string",
                },
            )),
        }
    }

    fn update_string(&self, name: &str, value: &str) -> RepositoryResult<()> {
        self.check_is_updateable()?;
        self.checkout_node()?;
        self.write(name, Property::string(value))?;
        self.stamp_last_modified()
    }

    fn stamp_last_modified(&self) -> RepositoryResult<()> {
        self.write(property::LAST_MODIFIED, Property::date(Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockNodeStore;
    use crate::versioning::IncrementingVersionGenerator;
    use std::sync::Arc;

    fn mocked(store: MockNodeStore) -> VersionedNode {
        let repo = RulesRepository::new(Arc::new(store), Arc::new(IncrementingVersionGenerator));
        VersionedNode::new(repo, NodeId::new())
    }

    #[test]
    fn test_absent_property_reads_as_none() {
        let mut store = MockNodeStore::new();
        store.expect_node_kind().returning(|_| Ok(NodeKind::Head));
        store
            .expect_property()
            .returning(|id, name| Err(StoreError::property_not_found(id, name)));

        let item = mocked(store);
        assert_eq!(item.title().unwrap(), None);
        assert_eq!(item.version_number().unwrap(), None);
        assert_eq!(item.last_modified().unwrap(), None);
    }

    #[test]
    fn test_backend_failure_is_not_absence() {
        let mut store = MockNodeStore::new();
        store.expect_node_kind().returning(|_| Ok(NodeKind::Head));
        store.expect_property().returning(|_, _| {
            Err(StoreError::Backend {
                message: "disk gone".to_string(),
                source: None,
            })
        });

        let err = mocked(store).description().unwrap_err();
        assert_eq!(err.code(), ErrorCode::StoreOperationFailed);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_checkout_without_versioning_is_unsupported() {
        let mut store = MockNodeStore::new();
        store.expect_node_kind().returning(|_| Ok(NodeKind::Head));
        store
            .expect_checkout()
            .returning(|_| Err(StoreError::VersioningUnsupported));

        let err = mocked(store).checkout().unwrap_err();
        assert!(matches!(err, RepositoryError::UnsupportedOperation { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_wrong_value_type_is_reported() {
        let mut store = MockNodeStore::new();
        store.expect_node_kind().returning(|_| Ok(NodeKind::Head));
        store
            .expect_property()
            .returning(|_, _| Ok(Property::references([NodeId::new()])));

        assert!(mocked(store).title().is_err());
    }

    #[test]
    fn test_content_resolved_once() {
        let mut store = MockNodeStore::new();
        let frozen = NodeId::new();
        store
            .expect_node_kind()
            .times(1)
            .returning(|_| Ok(NodeKind::Version));
        store
            .expect_frozen_node()
            .times(1)
            .returning(move |_| Ok(frozen));

        let item = mocked(store);
        assert_eq!(item.resolve_content().unwrap(), frozen);
        assert_eq!(item.resolve_content().unwrap(), frozen);
        assert_eq!(item.content_node_id().unwrap(), frozen);
    }

    #[test]
    fn test_predecessor_of_first_version_is_none() {
        let mut store = MockNodeStore::new();
        let base = NodeId::new();
        let root = NodeId::new();
        store.expect_node_kind().returning(|_| Ok(NodeKind::Head));
        store.expect_base_version().returning(move |_| Ok(base));
        store.expect_predecessors().returning(move |_| Ok(vec![root]));
        store
            .expect_node_name()
            .returning(|_| Ok(ROOT_VERSION_NAME.to_string()));

        assert!(mocked(store).preceding_version_node().unwrap().is_none());
    }

    #[test]
    fn test_head_without_successor_links() {
        let mut store = MockNodeStore::new();
        store
            .expect_successors()
            .returning(|id| Err(StoreError::property_not_found(id, "successors")));

        assert!(mocked(store).succeeding_version_node().unwrap().is_none());
    }

    #[test]
    fn test_historical_item_rejects_checkin_before_any_write() {
        let mut store = MockNodeStore::new();
        store.expect_node_kind().returning(|_| Ok(NodeKind::Version));
        store.expect_set_property().never();
        store.expect_checkout().never();
        store.expect_checkin().never();

        let err = mocked(store).checkin("nope").unwrap_err();
        assert_eq!(err.code(), ErrorCode::UseReadOnlyVersion);
    }

    #[test]
    fn test_checkin_hands_marker_to_store() {
        let mut store = MockNodeStore::new();
        store.expect_node_kind().returning(|_| Ok(NodeKind::Head));
        store.expect_checkout().times(1).returning(|_| Ok(()));
        store
            .expect_property()
            .returning(|id, name| Err(StoreError::property_not_found(id, name)));
        store.expect_set_property().never();
        store.expect_save().times(1).returning(|| Ok(()));
        let version = NodeId::new();
        store
            .expect_checkin()
            .withf(|_, stamp| {
                stamp.get(property::VERSION_NUMBER).and_then(Property::as_str) == Some("1")
                    && stamp.get(property::CHECKIN_COMMENT).and_then(Property::as_str)
                        == Some("first")
                    && stamp.contains_key(property::LAST_MODIFIED)
            })
            .times(1)
            .returning(move |_, _| Ok(version));

        assert_eq!(mocked(store).checkin("first").unwrap(), version);
    }

    #[test]
    fn test_failed_freeze_writes_no_marker() {
        let mut store = MockNodeStore::new();
        store.expect_node_kind().returning(|_| Ok(NodeKind::Head));
        store.expect_checkout().returning(|_| Ok(()));
        store
            .expect_property()
            .returning(|id, name| Err(StoreError::property_not_found(id, name)));
        store.expect_set_property().never();
        store.expect_save().returning(|| Ok(()));
        store.expect_checkin().times(1).returning(|_, _| {
            Err(StoreError::Backend {
                message: "disk full".to_string(),
                source: None,
            })
        });

        let err = mocked(store).checkin("first").unwrap_err();
        assert_eq!(err.code(), ErrorCode::StoreOperationFailed);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_generator_failure_stops_checkin() {
        let mut store = MockNodeStore::new();
        store.expect_node_kind().returning(|_| Ok(NodeKind::Head));
        store.expect_checkout().returning(|_| Ok(()));
        store
            .expect_property()
            .returning(|_, _| Ok(Property::string("beta")));
        store.expect_set_property().never();
        store.expect_save().never();
        store.expect_checkin().never();

        let err = mocked(store).checkin("first").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValInvalidVersionNumber);
    }
}
