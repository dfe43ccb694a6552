//! Node, value and property types shared by every node store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

/// Name of the virtual root version every versionable node starts with.
///
/// It anchors the version graph but is not a real predecessor.
pub const ROOT_VERSION_NAME: &str = "rootVersion";

/// Property names stored on content nodes.
pub mod property {
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const LAST_MODIFIED: &str = "lastModified";
    pub const FORMAT: &str = "format";
    pub const CHECKIN_COMMENT: &str = "checkinComment";
    pub const VERSION_NUMBER: &str = "versionNumber";
    pub const CATEGORY_REFERENCES: &str = "categoryReferences";
    /// SHA-256 of a frozen snapshot's properties, written by the store.
    pub const CONTENT_HASH: &str = "contentHash";
}

/// Stable identifier of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from its string form.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Structural type of a node.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Mutable head of a versionable item.
    Head,
    /// Version record in an item's history.
    Version,
    /// Frozen copy of a head's content, owned by a version record.
    Frozen,
    /// Classification entity referenced by items.
    Category,
}

impl NodeKind {
    /// Version records and frozen snapshots are historical and read-only.
    pub fn is_historical(&self) -> bool {
        matches!(self, NodeKind::Version | NodeKind::Frozen)
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// A single property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    String(String),
    Date(DateTime<Utc>),
    Reference(NodeId),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<NodeId> {
        match self {
            Value::Reference(id) => Some(*id),
            _ => None,
        }
    }
}

/// A property is either single-valued or an ordered list of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Single(Value),
    Multi(Vec<Value>),
}

impl Property {
    pub fn string(value: impl Into<String>) -> Self {
        Property::Single(Value::String(value.into()))
    }

    pub fn date(value: DateTime<Utc>) -> Self {
        Property::Single(Value::Date(value))
    }

    pub fn references(ids: impl IntoIterator<Item = NodeId>) -> Self {
        Property::Multi(ids.into_iter().map(Value::Reference).collect())
    }

    /// All values, a single-valued property yielding one.
    pub fn values(&self) -> &[Value] {
        match self {
            Property::Single(value) => std::slice::from_ref(value),
            Property::Multi(values) => values,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Property::Single(value) => value.as_str(),
            Property::Multi(_) => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Property::Single(value) => value.as_date(),
            Property::Multi(_) => None,
        }
    }

    /// Referenced node ids, or `None` if any value is not a reference.
    pub fn as_references(&self) -> Option<Vec<NodeId>> {
        self.values().iter().map(Value::as_reference).collect()
    }
}

/// Everything a store keeps about one node.
///
/// The version-graph fields are only populated for the kinds they apply to:
/// heads carry `base_version`, version records carry
/// `frozen`, `predecessors` and `successors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Property>,
    #[serde(default)]
    pub checked_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_version: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frozen: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predecessors: Option<Vec<NodeId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successors: Option<Vec<NodeId>>,
}

impl NodeRecord {
    /// Create a bare record with no properties and no version links.
    pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            kind,
            name: name.into(),
            properties: BTreeMap::new(),
            checked_out: false,
            base_version: None,
            frozen: None,
            predecessors: None,
            successors: None,
        }
    }
}
