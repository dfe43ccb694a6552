//! Lazy walk over an item's version history.

use std::collections::HashSet;
use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::error::{RepositoryError, RepositoryResult, StoreError};
use crate::item::{VersionableItem, VersionedNode};
use crate::types::NodeId;

/// Which neighbour each step resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationDirection {
    /// Towards older snapshots.
    Predecessor,
    /// Towards newer snapshots.
    Successor,
}

/// Walks the predecessor or successor chain of an item, excluding the item
/// itself and the virtual root version.
///
/// The iterator is forward-only and stops for good after the first `None`
/// or the first error. A node seen twice is reported as corruption instead
/// of looping.
pub struct ItemVersionIterator<T> {
    cursor: Option<VersionedNode>,
    direction: IterationDirection,
    visited: HashSet<NodeId>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: VersionableItem> ItemVersionIterator<T> {
    pub fn new(start: &T, direction: IterationDirection) -> Self {
        let start = start.versioned_node().clone();
        let mut visited = HashSet::new();
        visited.insert(start.node_id());
        Self {
            cursor: Some(start),
            direction,
            visited,
            _kind: PhantomData,
        }
    }

    pub fn direction(&self) -> IterationDirection {
        self.direction
    }

    fn step(&self, from: &VersionedNode) -> RepositoryResult<Option<VersionedNode>> {
        match self.direction {
            IterationDirection::Predecessor => from.preceding_version_node(),
            IterationDirection::Successor => from.succeeding_version_node(),
        }
    }
}

impl<T: VersionableItem> Iterator for ItemVersionIterator<T> {
    type Item = RepositoryResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor.take()?;
        match self.step(&current) {
            Ok(Some(next)) => {
                if !self.visited.insert(next.node_id()) {
                    return Some(Err(RepositoryError::store(
                        "walking version history",
                        StoreError::Corrupted {
                            node: next.node_id(),
                            message: format!("revisited from {}", current.node_id()),
                        },
                    )));
                }
                self.cursor = Some(next.clone());
                Some(Ok(T::from_versioned_node(next)))
            }
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

impl<T: VersionableItem> FusedIterator for ItemVersionIterator<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::RuleItem;
    use crate::repository::RulesRepository;

    fn rule_with_history(checkins: usize) -> RuleItem {
        let repo = RulesRepository::in_memory();
        let rule = repo.create_item::<RuleItem>("history").unwrap();
        for i in 0..checkins {
            rule.update_title(&format!("T{i}")).unwrap();
            rule.checkin(&format!("checkin {i}")).unwrap();
        }
        rule
    }

    #[test]
    fn test_fresh_item_has_no_history() {
        let rule = rule_with_history(0);
        assert_eq!(rule.predecessor_versions_iterator().count(), 0);
        assert_eq!(rule.successor_versions_iterator().count(), 0);
    }

    #[test]
    fn test_predecessors_from_head_skip_root() {
        let rule = rule_with_history(3);
        let titles: Vec<_> = rule
            .predecessor_versions_iterator()
            .map(|v| v.unwrap().title().unwrap())
            .collect();
        assert_eq!(titles, vec![Some("T1".to_string()), Some("T0".to_string())]);
    }

    #[test]
    fn test_successors_from_oldest_snapshot() {
        let rule = rule_with_history(3);
        let oldest = rule.predecessor_versions_iterator().last().unwrap().unwrap();
        let markers: Vec<_> = oldest
            .successor_versions_iterator()
            .map(|v| v.unwrap().version_number().unwrap())
            .collect();
        assert_eq!(markers, vec![Some("2".to_string()), Some("3".to_string())]);
    }

    #[test]
    fn test_iterator_is_fused() {
        let rule = rule_with_history(1);
        let mut iter = rule.predecessor_versions_iterator();
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
        assert_eq!(iter.direction(), IterationDirection::Predecessor);
    }
}
