//! Category tagging.

use tracing::info;

use crate::error::{RepositoryError, RepositoryResult, StoreError};
use crate::item::VersionedNode;
use crate::traits::NodeStore;
use crate::types::{property, NodeId, NodeKind, Property, Value};

/// A named classification node referenced by items.
#[derive(Debug, Clone)]
pub struct CategoryItem {
    node: NodeId,
    name: String,
}

impl CategoryItem {
    /// Wrap an existing category node.
    pub fn load(store: &dyn NodeStore, node: NodeId) -> RepositoryResult<Self> {
        let kind = store
            .node_kind(node)
            .map_err(|e| RepositoryError::store("loading category", e))?;
        if kind != NodeKind::Category {
            return Err(RepositoryError::store(
                "loading category",
                StoreError::InvalidKind {
                    node,
                    kind,
                    operation: "loaded as a category",
                },
            ));
        }
        let name = store
            .node_name(node)
            .map_err(|e| RepositoryError::store("loading category", e))?;
        Ok(Self { node, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }
}

impl PartialEq for CategoryItem {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl Eq for CategoryItem {}

impl VersionedNode {
    /// Tag the head with `tag`, creating the category if needed.
    ///
    /// References are kept as an ordered list deduplicated by a linear scan,
    /// so each insert is O(n) in the number of tags. Re-adding a tag is a
    /// no-op.
    pub fn add_category(&self, tag: &str) -> RepositoryResult<()> {
        self.check_is_updateable()?;

        let category = self.repository().load_category(tag)?;
        let refs = self.category_ids(self.node_id())?;
        if refs.contains(&category.node_id()) {
            info!(node = %self.node_id(), category = tag, "category already present");
            return Ok(());
        }

        let reference = self
            .store()
            .create_reference(category.node_id())
            .map_err(|e| RepositoryError::store("creating category reference", e))?;
        self.checkout_node()?;

        let mut values: Vec<Value> = refs.into_iter().map(Value::Reference).collect();
        values.push(reference);
        self.write(property::CATEGORY_REFERENCES, Property::Multi(values))
    }

    /// Drop `tag` from the head. Unknown or absent tags are a no-op.
    pub fn remove_category(&self, tag: &str) -> RepositoryResult<()> {
        self.check_is_updateable()?;

        let found = self
            .store()
            .find_category(tag)
            .map_err(|e| RepositoryError::store("looking up category", e))?;
        let Some(category) = found else {
            info!(node = %self.node_id(), category = tag, "no such category");
            return Ok(());
        };

        let refs = self.category_ids(self.node_id())?;
        if !refs.contains(&category) {
            return Ok(());
        }

        self.checkout_node()?;
        let kept = refs.into_iter().filter(|id| *id != category);
        self.write(property::CATEGORY_REFERENCES, Property::references(kept))
    }

    /// Categories referenced by this item's content.
    pub fn categories(&self) -> RepositoryResult<Vec<CategoryItem>> {
        let content = self.resolve_content()?;
        self.category_ids(content)?
            .into_iter()
            .map(|id| CategoryItem::load(self.store(), id))
            .collect()
    }

    fn category_ids(&self, node: NodeId) -> RepositoryResult<Vec<NodeId>> {
        let Some(prop) = self.read_property(node, property::CATEGORY_REFERENCES)? else {
            return Ok(Vec::new());
        };
        prop.as_references().ok_or_else(|| {
            RepositoryError::store(
                "reading category references",
                StoreError::ValueType {
                    node,
                    property: property::CATEGORY_REFERENCES.to_string(),
                    expected: "reference",
                },
            )
        })
    }
}
