//! Item formats.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Format tag stored on every item's content node.
///
/// The set is closed: the repository only knows how to create these kinds.
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
    EnumIter,
    IntoStaticStr,
)]
pub enum ItemFormat {
    #[strum(serialize = "Rule")]
    #[serde(rename = "Rule")]
    Rule,
    #[strum(serialize = "DSL")]
    #[serde(rename = "DSL")]
    Dsl,
    #[strum(serialize = "Rule Package")]
    #[serde(rename = "Rule Package")]
    RulePackage,
    #[strum(serialize = "Function")]
    #[serde(rename = "Function")]
    Function,
}

impl ItemFormat {
    /// The string stored in the `format` property.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Returns all format names.
    pub fn all_names() -> Vec<&'static str> {
        Self::iter().map(|f| f.into()).collect()
    }
}
