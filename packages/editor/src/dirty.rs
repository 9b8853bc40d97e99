//! Per-entity-kind dirty flags with a global aggregate.
//!
//! A flag is set by any successful operation and cleared only by a
//! successful save round-trip for that kind, or by an explicit reset
//! (discard / navigate away).

use std::collections::BTreeSet;

use pagecraft_model::EntityKind;

#[derive(Debug, Default)]
pub struct DirtyTracker {
    dirty: BTreeSet<EntityKind>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dirty(&self, kind: EntityKind) -> bool {
        self.dirty.contains(&kind)
    }

    /// True when any entity kind has unsaved changes.
    pub fn any_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.dirty.iter().copied()
    }

    pub(crate) fn mark(&mut self, kind: EntityKind) {
        self.dirty.insert(kind);
    }

    pub(crate) fn clear(&mut self, kind: EntityKind) {
        self.dirty.remove(&kind);
    }

    pub(crate) fn reset(&mut self) {
        self.dirty.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_aggregates_per_kind_flags() {
        let mut tracker = DirtyTracker::new();
        assert!(!tracker.any_dirty());

        tracker.mark(EntityKind::Theme);
        assert!(tracker.is_dirty(EntityKind::Theme));
        assert!(!tracker.is_dirty(EntityKind::Page));
        assert!(tracker.any_dirty());

        tracker.clear(EntityKind::Theme);
        assert!(!tracker.any_dirty());
    }
}
