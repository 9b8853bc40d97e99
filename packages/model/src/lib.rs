//! # Pagecraft Model
//!
//! Entity types for the Pagecraft editing surface.
//!
//! Everything a panel can edit lives here: pages, page versions, themes and
//! widgets, plus the sparse layout-property map themes carry and the
//! field-merge and validation rules the editing core applies to them.
//!
//! ## Core Principles
//!
//! 1. **Entities are plain records**: serde-derived, cloneable, no behavior
//!    beyond merges and structural helpers
//! 2. **Nested documents are not addressable**: a theme's typography groups
//!    or a version's page data are always reached through their owner
//! 3. **Merges are atomic**: a field merge either applies fully or leaves
//!    the record untouched
//! 4. **Server-owned fields are immutable locally**: ids, timestamps and
//!    computed urls only change when the server's copy re-seeds the store

mod entity;
mod page;
mod theme;
mod validation;

pub use entity::{Entity, EntityId, EntityKind, JsonMap, MergeError};
pub use page::{Page, PageVersion, Widget};
pub use theme::{LayoutProperties, LayoutValue, Theme, Typography, TypographyGroup};
pub use validation::{validate, ValidationIssue};
