//! # Editor Session
//!
//! One editing session over one document graph: owns the entity store, the
//! dirty tracker, the subscription registry, the derived-view table, the
//! field debouncer and the persistence boundary, and sequences every
//! mutation through the fixed pipeline:
//!
//! ```text
//! store mutation → dirty mark → derived recompute → subscriber fan-out
//! ```
//!
//! The pipeline is synchronous and not re-entrant: a subscriber callback
//! runs while the session is mutably borrowed, so cascading operations must
//! be deferred to the next turn by the caller. The only await points are
//! the save round-trip and server-side deletes.
//!
//! ## Lifecycle
//!
//! A session is constructed at editing-session start (`open_page` /
//! `open_theme` load the graph from the boundary before any panel may issue
//! operations) and torn down with [`EditorSession::close`], which clears the
//! store, staged debounce edits, subscriptions and dirty state. Closing does
//! not delete anything server-side.

use std::collections::HashMap;
use std::time::Instant;

use pagecraft_model::{validate, Entity, EntityId, EntityKind};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::debounce::{FieldDebouncer, FieldKey};
use crate::derived::DerivedViewTable;
use crate::dirty::DirtyTracker;
use crate::errors::EditorError;
use crate::operations::{Operation, OperationError};
use crate::persistence::PersistenceBoundary;
use crate::store::EntityStore;
use crate::subscriptions::{
    ChangeCallback, ChangeNotification, SubscriberId, SubscriptionHandle,
    SubscriptionRegistry,
};

/// Opaque token for a pending destructive-removal confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfirmationToken(u64);

/// What a removal request would destroy.
#[derive(Debug, Clone, PartialEq)]
pub enum RemovalTarget {
    /// One breakpoint map of a theme part, including all its properties.
    LayoutBreakpoint {
        theme_id: EntityId,
        part: String,
        breakpoint: String,
    },
    /// A whole theme part, across all breakpoints.
    LayoutPart { theme_id: EntityId, part: String },
    /// A whole entity, in the store and on the server.
    Entity { kind: EntityKind, id: EntityId },
}

/// First phase of a destructive removal: shown to the user before the
/// operation is ever issued. Declining is a no-op.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalTicket {
    pub token: ConfirmationToken,
    pub target: RemovalTarget,
    /// How many stored values the removal would destroy.
    pub affected: usize,
}

/// Result of a successful save round-trip.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    /// The server's authoritative representation, now also in the store.
    pub entity: Entity,
    /// Previous temporary id when a locally-created entity was re-keyed.
    /// Panels holding the old id translate their references on receipt.
    pub rekeyed_from: Option<EntityId>,
}

struct PendingRemoval {
    issued_by: SubscriberId,
    target: RemovalTarget,
}

/// One editing session over one document graph.
pub struct EditorSession<P> {
    store: EntityStore,
    dirty: DirtyTracker,
    subscriptions: SubscriptionRegistry,
    derived: DerivedViewTable,
    debouncer: FieldDebouncer,
    boundary: P,
    pending_removals: HashMap<ConfirmationToken, PendingRemoval>,
    next_token: u64,
    next_local_id: u64,
    closed: bool,
}

impl<P: PersistenceBoundary> EditorSession<P> {
    /// Session over an empty store with the stock derived-view table.
    /// Entities arrive via [`EditorSession::seed`] or `CreateEntity`.
    pub fn new(boundary: P) -> Self {
        Self::with_derived(boundary, DerivedViewTable::standard())
    }

    /// Session with a caller-supplied derivation table.
    pub fn with_derived(boundary: P, derived: DerivedViewTable) -> Self {
        Self {
            store: EntityStore::new(),
            dirty: DirtyTracker::new(),
            subscriptions: SubscriptionRegistry::new(),
            derived,
            debouncer: FieldDebouncer::default(),
            boundary,
            pending_removals: HashMap::new(),
            next_token: 0,
            next_local_id: 0,
            closed: false,
        }
    }

    /// Load a page and one of its versions, then open a session over them.
    pub async fn open_page(
        boundary: P,
        page_id: &EntityId,
        version_id: &EntityId,
    ) -> Result<Self, EditorError> {
        let page = boundary.fetch(EntityKind::Page, page_id).await?;
        let version = boundary.fetch(EntityKind::Version, version_id).await?;

        let mut session = Self::new(boundary);
        session.seed(page);
        session.seed(version);
        info!(page = %page_id, version = %version_id, "page session opened");
        Ok(session)
    }

    /// Load a theme and open a session over it.
    pub async fn open_theme(boundary: P, theme_id: &EntityId) -> Result<Self, EditorError> {
        let theme = boundary.fetch(EntityKind::Theme, theme_id).await?;

        let mut session = Self::new(boundary);
        session.seed(theme);
        info!(theme = %theme_id, "theme session opened");
        Ok(session)
    }

    /// Seed an entity from an already-fetched document. Initial-load path:
    /// does not mark dirty and does not notify.
    pub fn seed(&mut self, mut entity: Entity) {
        self.derived.recompute(&mut entity);
        self.store.insert(entity);
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn boundary(&self) -> &P {
        &self.boundary
    }

    pub fn is_dirty(&self, kind: EntityKind) -> bool {
        self.dirty.is_dirty(kind)
    }

    /// Global "has unsaved changes" flag.
    pub fn any_dirty(&self) -> bool {
        self.dirty.any_dirty()
    }

    /// Discard the dirty flag for one kind without saving (navigate-away).
    pub fn reset_dirty(&mut self, kind: EntityKind) {
        self.dirty.clear(kind);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Register a panel for change notifications.
    pub fn subscribe(
        &self,
        id: SubscriberId,
        callback: ChangeCallback,
    ) -> Result<SubscriptionHandle, EditorError> {
        self.ensure_open()?;
        Ok(self.subscriptions.register(id, callback))
    }

    /// Allocate a temporary id for a locally-created entity.
    pub fn allocate_local_id(&mut self) -> EntityId {
        let id = EntityId::local(self.next_local_id);
        self.next_local_id += 1;
        id
    }

    /// Apply one operation and return the updated entity.
    ///
    /// Side effects run in fixed order: store mutation, dirty mark, derived
    /// recompute, fan-out to every subscriber except `issued_by`. An
    /// operation against an id the store does not hold fails loudly.
    pub fn apply(
        &mut self,
        issued_by: &SubscriberId,
        operation: Operation,
    ) -> Result<Entity, EditorError> {
        self.ensure_open()?;
        let kind = operation.entity_kind();
        let id = operation.entity_id().clone();

        if let Operation::CreateEntity { entity } = &operation {
            if self.store.contains(kind, entity.id()) {
                return Err(OperationError::AlreadyExists(entity.id().clone()).into());
            }
            self.store.insert(entity.clone());
        }

        let entity = self
            .store
            .get_mut(kind, &id)
            .ok_or_else(|| EditorError::UnknownEntity {
                kind,
                id: id.clone(),
            })?;
        operation.apply_to(entity)?;
        self.derived.recompute(entity);
        let updated = entity.clone();

        self.dirty.mark(kind);
        debug!(kind = %kind, id = %id, issued_by = %issued_by, "operation applied");

        let changed = [kind];
        self.subscriptions.notify(
            issued_by,
            &ChangeNotification {
                changed: &changed,
                store: &self.store,
            },
        );
        Ok(updated)
    }

    /// Stage a debounced field edit. With `immediate` the idle window is
    /// bypassed and the operation dispatches synchronously (blur, "done").
    pub fn stage_field(
        &mut self,
        issued_by: &SubscriberId,
        key: FieldKey,
        operation: Operation,
        echo: Value,
        immediate: bool,
        now: Instant,
    ) -> Result<Option<Entity>, EditorError> {
        self.ensure_open()?;
        if immediate {
            // cancel any pending deadline for the key before dispatching
            self.debouncer.take(&key);
            return self.apply(issued_by, operation).map(Some);
        }
        self.debouncer.stage(issued_by, key, operation, echo, now);
        Ok(None)
    }

    /// Forced flush for one key: dispatch the staged edit immediately.
    pub fn flush_field(&mut self, key: &FieldKey) -> Result<Option<Entity>, EditorError> {
        self.ensure_open()?;
        match self.debouncer.take(key) {
            Some(edit) => self.apply(&edit.issued_by, edit.operation).map(Some),
            None => Ok(None),
        }
    }

    /// Dispatch every staged edit whose idle window elapsed by `now`.
    /// The host's event loop calls this with its clock.
    ///
    /// One failing edit (a stale reference, typically) does not stop the
    /// rest: every expired edit is dispatched and the first error is
    /// returned afterwards. Only explicit teardown discards staged input.
    pub fn flush_expired(&mut self, now: Instant) -> Result<usize, EditorError> {
        self.ensure_open()?;
        let mut issued = 0;
        let mut first_error = None;
        for edit in self.debouncer.take_expired(now) {
            match self.apply(&edit.issued_by, edit.operation) {
                Ok(_) => issued += 1,
                Err(error) => {
                    warn!(%error, "staged edit failed on flush");
                    first_error.get_or_insert(error);
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(issued),
        }
    }

    /// Local echo for an in-flight debounced edit of `key`.
    pub fn staged_value(&self, key: &FieldKey) -> Option<&Value> {
        self.debouncer.staged_value(key)
    }

    /// Drop a departing panel's staged edits without flushing them.
    pub fn cancel_panel(&mut self, subscriber: &SubscriberId) {
        self.debouncer.cancel_panel(subscriber);
    }

    /// First phase of a destructive removal: describe what would be
    /// destroyed and hand back a token for the caller's confirmation UI.
    pub fn request_removal(
        &mut self,
        issued_by: &SubscriberId,
        target: RemovalTarget,
    ) -> Result<RemovalTicket, EditorError> {
        self.ensure_open()?;
        let affected = self.count_affected(&target)?;
        let token = ConfirmationToken(self.next_token);
        self.next_token += 1;
        self.pending_removals.insert(
            token,
            PendingRemoval {
                issued_by: issued_by.clone(),
                target: target.clone(),
            },
        );
        Ok(RemovalTicket {
            token,
            target,
            affected,
        })
    }

    /// Decline a pending removal. Not an error; nothing happens.
    pub fn decline_removal(&mut self, token: ConfirmationToken) {
        self.pending_removals.remove(&token);
    }

    /// Second phase: the user confirmed, issue the removal.
    pub async fn confirm_removal(&mut self, token: ConfirmationToken) -> Result<(), EditorError> {
        self.ensure_open()?;
        let pending = self
            .pending_removals
            .remove(&token)
            .ok_or(EditorError::UnknownToken)?;

        match pending.target {
            RemovalTarget::LayoutBreakpoint {
                theme_id,
                part,
                breakpoint,
            } => {
                self.apply(
                    &pending.issued_by,
                    Operation::RemoveLayoutBreakpoint {
                        id: theme_id,
                        part,
                        breakpoint,
                    },
                )?;
            }
            RemovalTarget::LayoutPart { theme_id, part } => {
                self.apply(
                    &pending.issued_by,
                    Operation::RemoveLayoutPart { id: theme_id, part },
                )?;
            }
            RemovalTarget::Entity { kind, id } => {
                // Server delete first; a failure leaves the store copy and
                // the panels' references intact.
                self.boundary.delete(kind, &id).await?;
                self.store
                    .remove(kind, &id)
                    .ok_or_else(|| EditorError::UnknownEntity {
                        kind,
                        id: id.clone(),
                    })?;
                self.debouncer.cancel_entity(kind, &id);
                info!(kind = %kind, id = %id, "entity removed");

                let changed = [kind];
                self.subscriptions.notify(
                    &pending.issued_by,
                    &ChangeNotification {
                        changed: &changed,
                        store: &self.store,
                    },
                );
            }
        }
        Ok(())
    }

    /// Persist one entity: validation gate, boundary round-trip, store
    /// re-seed from the authoritative response.
    ///
    /// On failure the dirty flag and every in-memory edit stay untouched;
    /// the error is returned for user-facing reporting.
    pub async fn save(
        &mut self,
        issued_by: &SubscriberId,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<SaveOutcome, EditorError> {
        self.ensure_open()?;
        let entity = self
            .store
            .get(kind, id)
            .ok_or_else(|| EditorError::UnknownEntity {
                kind,
                id: id.clone(),
            })?
            .clone();

        let issues = validate(&entity);
        if !issues.is_empty() {
            warn!(kind = %kind, id = %id, issues = issues.len(), "save blocked by validation");
            return Err(EditorError::Validation(issues));
        }

        let authoritative = if id.is_local() {
            self.boundary.create(&entity).await?
        } else {
            self.boundary.update(id, &entity).await?
        };
        Ok(self.reseed_after_save(issued_by, kind, id, authoritative))
    }

    /// Persist a binary attachment (e.g. a theme logo) and re-seed from the
    /// returned entity.
    pub async fn save_image(
        &mut self,
        issued_by: &SubscriberId,
        kind: EntityKind,
        id: &EntityId,
        image: &[u8],
    ) -> Result<SaveOutcome, EditorError> {
        self.ensure_open()?;
        if !self.store.contains(kind, id) {
            return Err(EditorError::UnknownEntity {
                kind,
                id: id.clone(),
            });
        }
        let authoritative = self.boundary.update_image(kind, id, image).await?;
        Ok(self.reseed_after_save(issued_by, kind, id, authoritative))
    }

    /// End the editing session. Staged debounce edits are dropped, not
    /// flushed; an edit abandoned mid-debounce is lost. Every later call
    /// that would dispatch, save or subscribe fails with
    /// [`EditorError::SessionClosed`].
    pub fn close(&mut self) {
        self.debouncer.clear();
        self.subscriptions.clear();
        self.store.clear();
        self.dirty.reset();
        self.pending_removals.clear();
        self.closed = true;
        info!("session closed");
    }

    fn reseed_after_save(
        &mut self,
        issued_by: &SubscriberId,
        kind: EntityKind,
        saved_id: &EntityId,
        mut authoritative: Entity,
    ) -> SaveOutcome {
        let rekeyed_from = (authoritative.id() != saved_id).then(|| saved_id.clone());
        if rekeyed_from.is_some() {
            self.store.rekey(kind, saved_id, authoritative.id().clone());
            // edits staged against the temporary id can never dispatch
            self.debouncer.cancel_entity(kind, saved_id);
        }
        self.derived.recompute(&mut authoritative);
        self.store.insert(authoritative.clone());
        self.dirty.clear(kind);
        info!(
            kind = %kind,
            id = %authoritative.id(),
            rekeyed = rekeyed_from.is_some(),
            "entity saved"
        );

        let changed = [kind];
        self.subscriptions.notify(
            issued_by,
            &ChangeNotification {
                changed: &changed,
                store: &self.store,
            },
        );
        SaveOutcome {
            entity: authoritative,
            rekeyed_from,
        }
    }

    fn ensure_open(&self) -> Result<(), EditorError> {
        if self.closed {
            return Err(EditorError::SessionClosed);
        }
        Ok(())
    }

    fn count_affected(&self, target: &RemovalTarget) -> Result<usize, EditorError> {
        match target {
            RemovalTarget::LayoutBreakpoint {
                theme_id,
                part,
                breakpoint,
            } => {
                let theme = self.require_theme(theme_id)?;
                Ok(theme
                    .layout_properties
                    .as_ref()
                    .map_or(0, |layout| layout.property_count(part, breakpoint)))
            }
            RemovalTarget::LayoutPart { theme_id, part } => {
                let theme = self.require_theme(theme_id)?;
                Ok(theme
                    .layout_properties
                    .as_ref()
                    .map_or(0, |layout| layout.part_property_count(part)))
            }
            RemovalTarget::Entity { kind, id } => {
                if self.store.contains(*kind, id) {
                    Ok(1)
                } else {
                    Err(EditorError::UnknownEntity {
                        kind: *kind,
                        id: id.clone(),
                    })
                }
            }
        }
    }

    fn require_theme(&self, id: &EntityId) -> Result<&pagecraft_model::Theme, EditorError> {
        self.store
            .get(EntityKind::Theme, id)
            .and_then(Entity::as_theme)
            .ok_or_else(|| EditorError::UnknownEntity {
                kind: EntityKind::Theme,
                id: id.clone(),
            })
    }
}
