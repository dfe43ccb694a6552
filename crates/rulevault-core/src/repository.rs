//! Repository session: the store and generator every item works through.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::RepositoryConfig;
use crate::error::{ErrorCode, RepositoryError, RepositoryResult, StoreError};
use crate::item::{CategoryItem, VersionableItem, VersionedNode};
use crate::store::InMemoryNodeStore;
use crate::traits::{NodeStore, NodeStoreProvider, VersionNumberGenerator};
use crate::types::{property, NodeId, NodeKind, Property};
use crate::versioning::IncrementingVersionGenerator;

/// Handle on one node store session.
///
/// Cloning shares the same store; every item wrapper holds one.
#[derive(Clone)]
pub struct RulesRepository {
    store: Arc<dyn NodeStore>,
    generator: Arc<dyn VersionNumberGenerator>,
}

impl RulesRepository {
    pub fn new(store: Arc<dyn NodeStore>, generator: Arc<dyn VersionNumberGenerator>) -> Self {
        Self { store, generator }
    }

    /// A repository over a fresh in-memory store with integer markers.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryNodeStore::new()),
            Arc::new(IncrementingVersionGenerator),
        )
    }

    /// A repository over `store` using the configured version scheme.
    pub fn with_config(store: Arc<dyn NodeStore>, config: &RepositoryConfig) -> Self {
        Self::new(store, config.version_scheme.generator())
    }

    /// Build a repository from configuration alone.
    ///
    /// Only the in-memory provider is available here; persistent providers
    /// live in `rulevault-stores`.
    pub fn from_config(config: &RepositoryConfig) -> RepositoryResult<Self> {
        match config.node_store.provider {
            NodeStoreProvider::Memory => {
                Ok(Self::with_config(Arc::new(InMemoryNodeStore::new()), config))
            }
            other => Err(RepositoryError::Configuration(format!(
                "Provider {other:?} requires the rulevault-stores factory"
            ))),
        }
    }

    pub fn store(&self) -> &dyn NodeStore {
        self.store.as_ref()
    }

    pub fn generator(&self) -> &dyn VersionNumberGenerator {
        self.generator.as_ref()
    }

    /// Create a new head item of kind `T`, checked out and saved.
    pub fn create_item<T: VersionableItem>(&self, name: &str) -> RepositoryResult<T> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RepositoryError::validation("Item name must not be empty"));
        }

        let id = self
            .store
            .create_node(NodeKind::Head, name)
            .map_err(|e| RepositoryError::store("creating item", e))?;
        self.store
            .set_property(id, property::FORMAT, Property::string(T::FORMAT.as_str()))
            .and_then(|_| {
                self.store
                    .set_property(id, property::LAST_MODIFIED, Property::date(Utc::now()))
            })
            .map_err(|e| RepositoryError::store("creating item", e))?;
        self.save()?;

        info!(node = %id, name, format = %T::FORMAT, "created item");
        Ok(T::from_versioned_node(VersionedNode::new(self.clone(), id)))
    }

    /// Wrap an existing head or version record as kind `T`.
    pub fn load_item<T: VersionableItem>(&self, id: NodeId) -> RepositoryResult<T> {
        let kind = self
            .store
            .node_kind(id)
            .map_err(|e| RepositoryError::store("loading item", e))?;
        if !matches!(kind, NodeKind::Head | NodeKind::Version) {
            return Err(RepositoryError::store(
                "loading item",
                StoreError::InvalidKind {
                    node: id,
                    kind,
                    operation: "loaded as an item",
                },
            ));
        }

        let node = VersionedNode::new(self.clone(), id);
        if let Some(format) = node.format()? {
            if format != T::FORMAT {
                return Err(RepositoryError::validation_with_suggestion(
                    format!("Item {id} is a {format}, not a {}", T::FORMAT),
                    ErrorCode::ValFormatMismatch,
                    format!("Load it as the item kind for {format}"),
                ));
            }
        }
        Ok(T::from_versioned_node(node))
    }

    /// The category named `name`, created if it does not exist yet.
    ///
    /// Creating a category does not save the session; persistent stores
    /// write new category nodes through on their own.
    pub fn load_category(&self, name: &str) -> RepositoryResult<CategoryItem> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RepositoryError::validation("Category name must not be empty"));
        }

        let existing = self
            .store
            .find_category(name)
            .map_err(|e| RepositoryError::store("looking up category", e))?;
        let id = match existing {
            Some(id) => id,
            None => {
                let id = self
                    .store
                    .create_node(NodeKind::Category, name)
                    .map_err(|e| RepositoryError::store("creating category", e))?;
                debug!(node = %id, name, "created category");
                id
            }
        };
        CategoryItem::load(self.store(), id)
    }

    /// Commit pending writes.
    pub fn save(&self) -> RepositoryResult<()> {
        self.store
            .save()
            .map_err(|e| RepositoryError::store("saving session", e))
    }
}

impl fmt::Debug for RulesRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RulesRepository")
            .field("supports_versioning", &self.store.supports_versioning())
            .finish_non_exhaustive()
    }
}
