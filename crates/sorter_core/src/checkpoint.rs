use std::collections::BTreeSet;

use crate::WorkItem;

/// Settled item identifiers: the durable resume point of a run.
///
/// An identifier is in at most one of the two sets; marking it moves it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckpointState {
    processed: BTreeSet<String>,
    failed: BTreeSet<String>,
}

impl CheckpointState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds state from persisted sets. An identifier listed in both is
    /// kept as processed, since the move already happened.
    pub fn from_sets<P, F>(processed: P, failed: F) -> Self
    where
        P: IntoIterator<Item = String>,
        F: IntoIterator<Item = String>,
    {
        let processed: BTreeSet<String> = processed.into_iter().collect();
        let failed = failed
            .into_iter()
            .filter(|id| !processed.contains(id))
            .collect();
        Self { processed, failed }
    }

    pub fn mark_processed(&mut self, id: &str) {
        self.failed.remove(id);
        self.processed.insert(id.to_string());
    }

    pub fn mark_failed(&mut self, id: &str) {
        self.processed.remove(id);
        self.failed.insert(id.to_string());
    }

    /// Forgets every failure so those items are attempted again.
    pub fn clear_failed(&mut self) -> usize {
        let count = self.failed.len();
        self.failed.clear();
        count
    }

    pub fn processed(&self) -> &BTreeSet<String> {
        &self.processed
    }

    pub fn failed(&self) -> &BTreeSet<String> {
        &self.failed
    }

    pub fn is_settled(&self, id: &str) -> bool {
        self.processed.contains(id) || self.failed.contains(id)
    }

    pub fn settled_count(&self) -> usize {
        self.processed.len() + self.failed.len()
    }

    pub fn is_disjoint(&self) -> bool {
        self.processed.is_disjoint(&self.failed)
    }

    /// Items neither processed nor failed, in their original order.
    pub fn remaining<'a>(&self, items: &'a [WorkItem]) -> Vec<&'a WorkItem> {
        items.iter().filter(|item| !self.is_settled(item.id())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marking_moves_between_sets() {
        let mut state = CheckpointState::new();
        state.mark_failed("a.md");
        state.mark_processed("a.md");
        assert!(state.processed().contains("a.md"));
        assert!(state.failed().is_empty());
        state.mark_failed("a.md");
        assert!(state.processed().is_empty());
        assert!(state.is_disjoint());
    }

    #[test]
    fn overlapping_sets_favor_processed() {
        let state = CheckpointState::from_sets(
            vec!["a".to_string(), "b".to_string()],
            vec!["b".to_string(), "c".to_string()],
        );
        assert!(state.is_disjoint());
        assert_eq!(state.settled_count(), 3);
        assert!(state.failed().contains("c"));
    }
}
