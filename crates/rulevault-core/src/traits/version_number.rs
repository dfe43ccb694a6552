//! Version number generation trait.

use crate::error::RepositoryResult;
use crate::item::VersionedNode;

/// Computes the version marker written at check-in.
///
/// `current` is the marker of the item before this check-in, `None` for an
/// item that was never checked in. Markers are labels, not necessarily numbers.
pub trait VersionNumberGenerator: Send + Sync {
    fn calculate_next_version(
        &self,
        current: Option<&str>,
        item: &VersionedNode,
    ) -> RepositoryResult<String>;
}
