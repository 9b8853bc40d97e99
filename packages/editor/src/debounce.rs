//! # Debounced Field Editor
//!
//! Per-field staging table for panels that mutate deeply nested structures
//! through rapid keystrokes (breakpoint-scoped style properties above all).
//!
//! Each staged edit carries the full operation to issue once its idle
//! window elapses. A new edit to the same key replaces the staged value and
//! restarts the window — last write wins, no operation fires for
//! intermediate values. While an edit is pending, `staged_value` provides
//! the local echo so the owning panel's input does not visually revert to
//! the last-committed store value between keystrokes.
//!
//! The table holds deadlines, not timers: the host's event loop polls
//! `take_expired` with its clock. That keeps the whole pipeline
//! single-threaded and makes the idle window deterministic under test.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use pagecraft_model::{EntityId, EntityKind};
use serde_json::Value;

use crate::operations::Operation;
use crate::subscriptions::SubscriberId;

/// Composite key for one debounced field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub kind: EntityKind,
    pub id: EntityId,
    pub path: FieldPath,
}

impl FieldKey {
    pub fn new(kind: EntityKind, id: EntityId, path: FieldPath) -> Self {
        Self { kind, id, path }
    }
}

/// Typed path to the edited value within its entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldPath {
    /// Top-level field.
    Field(String),
    /// Field inside a named nested section.
    Section { section: String, field: String },
    /// Breakpoint-scoped layout property.
    LayoutProperty {
        part: String,
        breakpoint: String,
        property: String,
    },
}

#[derive(Debug)]
struct DebounceEntry {
    issued_by: SubscriberId,
    operation: Operation,
    echo: Value,
    deadline: Instant,
}

/// A staged edit released by the debouncer, ready for dispatch.
#[derive(Debug)]
pub struct StagedEdit {
    pub key: FieldKey,
    pub issued_by: SubscriberId,
    pub operation: Operation,
}

#[derive(Debug)]
pub struct FieldDebouncer {
    window: Duration,
    entries: HashMap<FieldKey, DebounceEntry>,
}

impl FieldDebouncer {
    pub const DEFAULT_WINDOW: Duration = Duration::from_millis(500);

    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Stage an edit under `key`, restarting the idle window.
    ///
    /// At most one entry lives per key; an existing one is replaced.
    pub fn stage(
        &mut self,
        issued_by: &SubscriberId,
        key: FieldKey,
        operation: Operation,
        echo: Value,
        now: Instant,
    ) {
        self.entries.insert(
            key,
            DebounceEntry {
                issued_by: issued_by.clone(),
                operation,
                echo,
                deadline: now + self.window,
            },
        );
    }

    /// Local echo of the in-flight value for `key`, if one is pending.
    pub fn staged_value(&self, key: &FieldKey) -> Option<&Value> {
        self.entries.get(key).map(|entry| &entry.echo)
    }

    pub fn is_pending(&self, key: &FieldKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }

    /// Remove and return the staged edit for `key` (explicit flush path).
    /// The pending deadline is cancelled; nothing fires for it later.
    pub fn take(&mut self, key: &FieldKey) -> Option<StagedEdit> {
        self.entries.remove(key).map(|entry| StagedEdit {
            key: key.clone(),
            issued_by: entry.issued_by,
            operation: entry.operation,
        })
    }

    /// Remove and return every entry whose idle window elapsed by `now`,
    /// oldest deadline first.
    pub fn take_expired(&mut self, now: Instant) -> Vec<StagedEdit> {
        let mut expired: Vec<(FieldKey, Instant)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(key, entry)| (key.clone(), entry.deadline))
            .collect();
        expired.sort_by_key(|(_, deadline)| *deadline);

        expired
            .into_iter()
            .filter_map(|(key, _)| self.take(&key))
            .collect()
    }

    /// Drop every staged edit issued by `subscriber` without flushing.
    /// Used on panel teardown; an abandoned mid-debounce edit is lost.
    pub fn cancel_panel(&mut self, subscriber: &SubscriberId) {
        self.entries.retain(|_, entry| entry.issued_by != *subscriber);
    }

    /// Drop every staged edit targeting one entity (entity removed from the
    /// store mid-session).
    pub fn cancel_entity(&mut self, kind: EntityKind, id: &EntityId) {
        self.entries
            .retain(|key, _| !(key.kind == kind && key.id == *id));
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for FieldDebouncer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW)
    }
}
