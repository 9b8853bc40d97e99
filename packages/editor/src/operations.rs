//! # Operation Vocabulary
//!
//! The closed set of mutation requests panels may issue against the store.
//!
//! ## Operation Semantics
//!
//! ### Field updates (`Update*Field`)
//! - Shallow merge of `updates` into the entity's top-level fields
//! - Unknown or server-owned field names fail loudly (stale-reference guard)
//!
//! ### Nested-document updates
//! - `UpdateVersionPageData` merges into one named section of `page_data`
//!   without disturbing sibling sections
//! - `UpdateTypographyGroup` / `UpdateComponentStyle` merge into one group
//!   or style object of a theme
//!
//! ### Layout-property writes
//! - `SetLayoutProperty` follows the sparse-map policy in
//!   [`pagecraft_model::LayoutProperties`]; `LayoutValue::Remove` deletes
//!   the key and emptied maps collapse upward
//! - `RemoveLayoutBreakpoint` / `RemoveLayoutPart` drop whole sub-maps;
//!   the destructive-action confirmation happens before the operation is
//!   issued — the dispatcher is unaware of it
//!
//! Invariant: one operation targets exactly one entity. Effects spanning
//! entities (widget creation updating a version's tag list, say) are issued
//! as two sequential operations.

use pagecraft_model::{
    Entity, EntityId, EntityKind, JsonMap, LayoutValue, MergeError, PageVersion, Theme,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A typed mutation request targeting exactly one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    UpdatePageField {
        id: EntityId,
        updates: JsonMap,
    },
    UpdateVersionField {
        id: EntityId,
        updates: JsonMap,
    },
    UpdateVersionPageData {
        id: EntityId,
        section: String,
        updates: JsonMap,
    },
    UpdateThemeField {
        id: EntityId,
        updates: JsonMap,
    },
    UpdateTypographyGroup {
        id: EntityId,
        group: usize,
        updates: JsonMap,
    },
    UpdateComponentStyle {
        id: EntityId,
        component: String,
        updates: JsonMap,
    },
    SetLayoutProperty {
        id: EntityId,
        part: String,
        breakpoint: String,
        property: String,
        value: LayoutValue,
    },
    RemoveLayoutBreakpoint {
        id: EntityId,
        part: String,
        breakpoint: String,
    },
    RemoveLayoutPart {
        id: EntityId,
        part: String,
    },
    UpdateWidgetField {
        id: EntityId,
        updates: JsonMap,
    },
    /// Insert a newly-created entity under its locally-generated id.
    CreateEntity {
        entity: Entity,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    #[error("{0}")]
    Merge(#[from] MergeError),

    #[error("operation targets a {expected} but entity {id} is a {actual}")]
    KindMismatch {
        expected: EntityKind,
        actual: EntityKind,
        id: EntityId,
    },

    #[error("typography group index out of range: {0}")]
    GroupOutOfRange(usize),

    #[error("entity already exists: {0}")]
    AlreadyExists(EntityId),
}

impl Operation {
    /// Kind of the entity this operation targets.
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            Operation::UpdatePageField { .. } => EntityKind::Page,
            Operation::UpdateVersionField { .. }
            | Operation::UpdateVersionPageData { .. } => EntityKind::Version,
            Operation::UpdateThemeField { .. }
            | Operation::UpdateTypographyGroup { .. }
            | Operation::UpdateComponentStyle { .. }
            | Operation::SetLayoutProperty { .. }
            | Operation::RemoveLayoutBreakpoint { .. }
            | Operation::RemoveLayoutPart { .. } => EntityKind::Theme,
            Operation::UpdateWidgetField { .. } => EntityKind::Widget,
            Operation::CreateEntity { entity } => entity.kind(),
        }
    }

    /// Id of the entity this operation targets.
    pub fn entity_id(&self) -> &EntityId {
        match self {
            Operation::UpdatePageField { id, .. }
            | Operation::UpdateVersionField { id, .. }
            | Operation::UpdateVersionPageData { id, .. }
            | Operation::UpdateThemeField { id, .. }
            | Operation::UpdateTypographyGroup { id, .. }
            | Operation::UpdateComponentStyle { id, .. }
            | Operation::SetLayoutProperty { id, .. }
            | Operation::RemoveLayoutBreakpoint { id, .. }
            | Operation::RemoveLayoutPart { id, .. }
            | Operation::UpdateWidgetField { id, .. } => id,
            Operation::CreateEntity { entity } => entity.id(),
        }
    }

    /// Apply this operation to its (already looked-up) target entity.
    ///
    /// `CreateEntity` is handled by the dispatcher before lookup and never
    /// reaches this point with work left to do.
    pub(crate) fn apply_to(&self, entity: &mut Entity) -> Result<(), OperationError> {
        match self {
            Operation::UpdatePageField { updates, .. } => {
                expect_kind(entity, EntityKind::Page)?;
                entity.merge_fields(updates)?;
            }
            Operation::UpdateVersionField { updates, .. } => {
                expect_kind(entity, EntityKind::Version)?;
                entity.merge_fields(updates)?;
            }
            Operation::UpdateVersionPageData {
                section, updates, ..
            } => {
                let version = expect_version(entity)?;
                let section_data = version.page_data.entry(section.clone()).or_default();
                for (key, value) in updates {
                    section_data.insert(key.clone(), value.clone());
                }
            }
            Operation::UpdateThemeField { updates, .. } => {
                expect_kind(entity, EntityKind::Theme)?;
                entity.merge_fields(updates)?;
            }
            Operation::UpdateTypographyGroup { group, updates, .. } => {
                let theme = expect_theme(entity)?;
                let record = theme
                    .typography
                    .groups
                    .get_mut(*group)
                    .ok_or(OperationError::GroupOutOfRange(*group))?;
                record.merge_fields(updates)?;
            }
            Operation::UpdateComponentStyle {
                component, updates, ..
            } => {
                let theme = expect_theme(entity)?;
                let style = theme.component_styles.entry(component.clone()).or_default();
                for (key, value) in updates {
                    style.insert(key.clone(), value.clone());
                }
            }
            Operation::SetLayoutProperty {
                part,
                breakpoint,
                property,
                value,
                ..
            } => {
                let theme = expect_theme(entity)?;
                theme.set_layout_property(part, breakpoint, property, value);
            }
            Operation::RemoveLayoutBreakpoint {
                part, breakpoint, ..
            } => {
                let theme = expect_theme(entity)?;
                theme.remove_layout_breakpoint(part, breakpoint);
            }
            Operation::RemoveLayoutPart { part, .. } => {
                let theme = expect_theme(entity)?;
                theme.remove_layout_part(part);
            }
            Operation::UpdateWidgetField { updates, .. } => {
                expect_kind(entity, EntityKind::Widget)?;
                entity.merge_fields(updates)?;
            }
            Operation::CreateEntity { .. } => {}
        }
        Ok(())
    }
}

fn expect_kind(entity: &Entity, expected: EntityKind) -> Result<(), OperationError> {
    if entity.kind() == expected {
        Ok(())
    } else {
        Err(OperationError::KindMismatch {
            expected,
            actual: entity.kind(),
            id: entity.id().clone(),
        })
    }
}

fn expect_version(entity: &mut Entity) -> Result<&mut PageVersion, OperationError> {
    let actual = entity.kind();
    let id = entity.id().clone();
    entity
        .as_version_mut()
        .ok_or(OperationError::KindMismatch {
            expected: EntityKind::Version,
            actual,
            id,
        })
}

fn expect_theme(entity: &mut Entity) -> Result<&mut Theme, OperationError> {
    let actual = entity.kind();
    let id = entity.id().clone();
    entity.as_theme_mut().ok_or(OperationError::KindMismatch {
        expected: EntityKind::Theme,
        actual,
        id,
    })
}
