//! # Persistence Boundary
//!
//! The remote API the editing core saves through. The core only requires
//! that `create`/`update`/`update_image` return the full authoritative
//! entity representation: the server owns generated ids, timestamps and
//! computed urls, and its response re-seeds the store after every save.
//!
//! The trait uses plain `async fn`; sessions are generic over the boundary
//! implementation rather than holding it behind `dyn`, in keeping with the
//! single-threaded pipeline.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use chrono::Utc;
use pagecraft_model::{Entity, EntityId, EntityKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("server rejected request ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("not found: {kind} {id}")]
    NotFound { kind: EntityKind, id: EntityId },
}

/// Request/response contract per entity kind.
#[allow(async_fn_in_trait)]
pub trait PersistenceBoundary {
    async fn fetch(&self, kind: EntityKind, id: &EntityId) -> Result<Entity, PersistenceError>;

    async fn create(&self, entity: &Entity) -> Result<Entity, PersistenceError>;

    async fn update(&self, id: &EntityId, entity: &Entity) -> Result<Entity, PersistenceError>;

    async fn delete(&self, kind: EntityKind, id: &EntityId) -> Result<(), PersistenceError>;

    /// Binary-attachment variant for entities carrying an image.
    async fn update_image(
        &self,
        kind: EntityKind,
        id: &EntityId,
        image: &[u8],
    ) -> Result<Entity, PersistenceError>;
}

/// In-memory boundary for tests and headless sessions.
///
/// Behaves like the real API at the contract level: `create` issues a
/// server id and returns the stored representation, `update` stamps
/// `updated_at`, and any call can be scripted to fail once via
/// [`InMemoryBoundary::fail_next`].
#[derive(Default)]
pub struct InMemoryBoundary {
    records: RefCell<BTreeMap<(EntityKind, EntityId), Entity>>,
    next_id: Cell<u64>,
    fail_next: RefCell<Option<PersistenceError>>,
}

impl InMemoryBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load a server-side record.
    pub fn seed(&self, entity: Entity) {
        self.records
            .borrow_mut()
            .insert((entity.kind(), entity.id().clone()), entity);
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&self, error: PersistenceError) {
        *self.fail_next.borrow_mut() = Some(error);
    }

    /// Server-side copy of a record, if present.
    pub fn record(&self, kind: EntityKind, id: &EntityId) -> Option<Entity> {
        self.records.borrow().get(&(kind, id.clone())).cloned()
    }

    fn take_failure(&self) -> Result<(), PersistenceError> {
        match self.fail_next.borrow_mut().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn stamp(entity: &mut Entity) {
        let now = Some(Utc::now());
        match entity {
            Entity::Page(page) => {
                page.updated_at = now;
                page.url = Some(format!("/{}", page.slug));
            }
            Entity::Version(version) => version.updated_at = now,
            Entity::Theme(theme) => theme.updated_at = now,
            Entity::Widget(_) => {}
        }
    }
}

impl PersistenceBoundary for InMemoryBoundary {
    async fn fetch(&self, kind: EntityKind, id: &EntityId) -> Result<Entity, PersistenceError> {
        self.take_failure()?;
        self.record(kind, id).ok_or(PersistenceError::NotFound {
            kind,
            id: id.clone(),
        })
    }

    async fn create(&self, entity: &Entity) -> Result<Entity, PersistenceError> {
        self.take_failure()?;
        let mut stored = entity.clone();
        let n = self.next_id.get();
        self.next_id.set(n + 1);
        stored.set_id(EntityId::new(format!("srv-{n}")));
        Self::stamp(&mut stored);
        self.seed(stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: &EntityId, entity: &Entity) -> Result<Entity, PersistenceError> {
        self.take_failure()?;
        let kind = entity.kind();
        if self.record(kind, id).is_none() {
            return Err(PersistenceError::NotFound {
                kind,
                id: id.clone(),
            });
        }
        let mut stored = entity.clone();
        Self::stamp(&mut stored);
        self.seed(stored.clone());
        Ok(stored)
    }

    async fn delete(&self, kind: EntityKind, id: &EntityId) -> Result<(), PersistenceError> {
        self.take_failure()?;
        self.records
            .borrow_mut()
            .remove(&(kind, id.clone()))
            .map(|_| ())
            .ok_or(PersistenceError::NotFound {
                kind,
                id: id.clone(),
            })
    }

    async fn update_image(
        &self,
        kind: EntityKind,
        id: &EntityId,
        image: &[u8],
    ) -> Result<Entity, PersistenceError> {
        self.take_failure()?;
        let mut stored = self.record(kind, id).ok_or(PersistenceError::NotFound {
            kind,
            id: id.clone(),
        })?;
        if let Entity::Theme(theme) = &mut stored {
            theme.logo_url = Some(format!("https://cdn.pagecraft.local/{id}/logo-{}.png", image.len()));
        }
        Self::stamp(&mut stored);
        self.seed(stored.clone());
        Ok(stored)
    }
}
