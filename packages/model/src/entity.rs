//! Entity identity and the closed set of editable entity kinds.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{Page, PageVersion, Theme, Widget};

/// Shallow-mergeable field payload (`updates` in the operation vocabulary).
pub type JsonMap = serde_json::Map<String, Value>;

/// Stable key for an editable entity.
///
/// Entities created locally carry a `local-{n}` id until the first
/// successful save re-keys them to the server-issued id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Locally-generated temporary id for a not-yet-persisted entity.
    pub fn local(n: u64) -> Self {
        Self(format!("local-{n}"))
    }

    /// True while the entity has never been persisted.
    pub fn is_local(&self) -> bool {
        self.0.starts_with("local-")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed set of editable entity kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Page,
    Version,
    Theme,
    Widget,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Page,
        EntityKind::Version,
        EntityKind::Theme,
        EntityKind::Widget,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Page => "page",
            EntityKind::Version => "version",
            EntityKind::Theme => "theme",
            EntityKind::Widget => "widget",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An addressable editable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Page(Page),
    Version(PageVersion),
    Theme(Theme),
    Widget(Widget),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Page(_) => EntityKind::Page,
            Entity::Version(_) => EntityKind::Version,
            Entity::Theme(_) => EntityKind::Theme,
            Entity::Widget(_) => EntityKind::Widget,
        }
    }

    pub fn id(&self) -> &EntityId {
        match self {
            Entity::Page(page) => &page.id,
            Entity::Version(version) => &version.id,
            Entity::Theme(theme) => &theme.id,
            Entity::Widget(widget) => &widget.id,
        }
    }

    /// Re-key the entity (temporary id → server-issued id after first save).
    pub fn set_id(&mut self, id: EntityId) {
        match self {
            Entity::Page(page) => page.id = id,
            Entity::Version(version) => version.id = id,
            Entity::Theme(theme) => theme.id = id,
            Entity::Widget(widget) => widget.id = id,
        }
    }

    /// Shallow-merge `updates` into the record's top-level fields.
    ///
    /// Unknown field names and server-owned fields are rejected; on error
    /// the record is left untouched.
    pub fn merge_fields(&mut self, updates: &JsonMap) -> Result<(), MergeError> {
        match self {
            Entity::Page(page) => page.merge_fields(updates),
            Entity::Version(version) => version.merge_fields(updates),
            Entity::Theme(theme) => theme.merge_fields(updates),
            Entity::Widget(widget) => widget.merge_fields(updates),
        }
    }

    pub fn as_page(&self) -> Option<&Page> {
        match self {
            Entity::Page(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_version(&self) -> Option<&PageVersion> {
        match self {
            Entity::Version(version) => Some(version),
            _ => None,
        }
    }

    pub fn as_theme(&self) -> Option<&Theme> {
        match self {
            Entity::Theme(theme) => Some(theme),
            _ => None,
        }
    }

    pub fn as_widget(&self) -> Option<&Widget> {
        match self {
            Entity::Widget(widget) => Some(widget),
            _ => None,
        }
    }

    pub fn as_version_mut(&mut self) -> Option<&mut PageVersion> {
        match self {
            Entity::Version(version) => Some(version),
            _ => None,
        }
    }

    pub fn as_theme_mut(&mut self) -> Option<&mut Theme> {
        match self {
            Entity::Theme(theme) => Some(theme),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("field is not editable: {0}")]
    ImmutableField(String),

    #[error("invalid value for field merge: {0}")]
    InvalidValue(String),
}

/// Shallow-merge a JSON object into a record's top-level fields.
///
/// The record is serialized, patched, and deserialized back, so a failing
/// merge never leaves it half-updated. `immutable` names the fields the
/// record owner refuses local writes for (ids, server-computed fields).
pub(crate) fn merge_record<T>(
    record: &mut T,
    updates: &JsonMap,
    immutable: &[&str],
) -> Result<(), MergeError>
where
    T: Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(&*record)
        .map_err(|e| MergeError::InvalidValue(e.to_string()))?;
    let fields = value
        .as_object_mut()
        .ok_or_else(|| MergeError::InvalidValue("record is not an object".to_string()))?;

    for (name, update) in updates {
        if immutable.contains(&name.as_str()) {
            return Err(MergeError::ImmutableField(name.clone()));
        }
        if !fields.contains_key(name) {
            return Err(MergeError::UnknownField(name.clone()));
        }
        fields.insert(name.clone(), update.clone());
    }

    *record = serde_json::from_value(value)
        .map_err(|e| MergeError::InvalidValue(e.to_string()))?;
    Ok(())
}
