//! # Pagecraft Editor
//!
//! Shared data-synchronization core for the Pagecraft editing surface.
//!
//! Every panel (settings form, layout inspector, theme tabs, widget
//! configurators) reads from and writes through this layer, which keeps one
//! consistent in-memory view of the documents being edited.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ panels: read store at render time            │
//! └──────────────────────────────────────────────┘
//!                     ↓ operations (debounced or direct)
//! ┌──────────────────────────────────────────────┐
//! │ session: operation dispatch                  │
//! │  - mutate entity store                       │
//! │  - mark entity kind dirty                    │
//! │  - recompute derived views                   │
//! │  - fan out to subscribers (minus originator) │
//! └──────────────────────────────────────────────┘
//!                     ↓ explicit save
//! ┌──────────────────────────────────────────────┐
//! │ persistence boundary: remote API             │
//! │  (authoritative response re-seeds the store) │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The store is the source of truth**: panels re-derive their local
//!    view from it rather than applying deltas
//! 2. **One operation, one entity**: multi-entity effects are issued as
//!    sequential operations
//! 3. **Self-notification suppression**: a panel is never called back for
//!    its own write
//! 4. **Server authority on save**: the persistence response replaces the
//!    in-memory copy, including generated ids and timestamps
//! 5. **Single-threaded pipeline**: the only asynchrony is debounce
//!    deadlines (polled by the host) and the awaited save round-trip

mod debounce;
mod derived;
mod dirty;
mod errors;
mod operations;
mod persistence;
mod session;
mod store;
mod subscriptions;

pub use debounce::{FieldDebouncer, FieldKey, FieldPath, StagedEdit};
pub use derived::{recompute_theme_selectors, DeriveFn, DerivedViewTable};
pub use dirty::DirtyTracker;
pub use errors::EditorError;
pub use operations::{Operation, OperationError};
pub use persistence::{InMemoryBoundary, PersistenceBoundary, PersistenceError};
pub use session::{
    ConfirmationToken, EditorSession, RemovalTarget, RemovalTicket, SaveOutcome,
};
pub use store::EntityStore;
pub use subscriptions::{
    ChangeCallback, ChangeNotification, SubscriberId, SubscriptionHandle,
    SubscriptionRegistry,
};

// Re-export the model types panels work with
pub use pagecraft_model::{
    validate, Entity, EntityId, EntityKind, JsonMap, LayoutProperties, LayoutValue,
    Page, PageVersion, Theme, Typography, TypographyGroup, ValidationIssue, Widget,
};
