//! Concrete item kinds.

use std::ops::Deref;

use crate::item::{VersionableItem, VersionedNode};
use crate::types::ItemFormat;

macro_rules! item_kind {
    ($(#[$meta:meta])* $name:ident => $format:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(VersionedNode);

        impl VersionableItem for $name {
            const FORMAT: ItemFormat = $format;

            fn from_versioned_node(node: VersionedNode) -> Self {
                Self(node)
            }

            fn versioned_node(&self) -> &VersionedNode {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = VersionedNode;

            fn deref(&self) -> &VersionedNode {
                &self.0
            }
        }
    };
}

item_kind!(
    /// A single business rule.
    RuleItem => ItemFormat::Rule
);
item_kind!(
    /// A package grouping rules for deployment.
    RulePackageItem => ItemFormat::RulePackage
);
item_kind!(
    /// A helper function callable from rules.
    FunctionItem => ItemFormat::Function
);
item_kind!(
    /// A domain-specific language mapping.
    DslItem => ItemFormat::Dsl
);
