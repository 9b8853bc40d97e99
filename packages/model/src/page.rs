//! Page, page version and widget records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{merge_record, EntityId, JsonMap, MergeError};

/// A web page: the routing/metadata shell around its versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: EntityId,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub theme_id: Option<EntityId>,
    /// Server-computed canonical url.
    #[serde(default)]
    pub url: Option<String>,
    /// Server-side modification stamp.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Page {
    const IMMUTABLE: &'static [&'static str] = &["id", "url", "updated_at"];

    pub fn new(id: EntityId, slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id,
            slug: slug.into(),
            title: title.into(),
            description: String::new(),
            keywords: Vec::new(),
            published: false,
            theme_id: None,
            url: None,
            updated_at: None,
        }
    }

    pub fn merge_fields(&mut self, updates: &JsonMap) -> Result<(), MergeError> {
        merge_record(self, updates, Self::IMMUTABLE)
    }
}

/// One editable revision of a page.
///
/// `page_data` holds named sections of freeform widget/layout data; each
/// section is mutated as a unit without disturbing its siblings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageVersion {
    pub id: EntityId,
    pub page_id: EntityId,
    pub name: String,
    #[serde(default)]
    pub page_data: BTreeMap<String, JsonMap>,
    /// Tags of the widgets placed on this version.
    #[serde(default)]
    pub widget_tags: Vec<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PageVersion {
    const IMMUTABLE: &'static [&'static str] = &["id", "updated_at"];

    pub fn new(id: EntityId, page_id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            page_id,
            name: name.into(),
            page_data: BTreeMap::new(),
            widget_tags: Vec::new(),
            updated_at: None,
        }
    }

    pub fn merge_fields(&mut self, updates: &JsonMap) -> Result<(), MergeError> {
        merge_record(self, updates, Self::IMMUTABLE)
    }
}

/// A configurable content widget placed on a page version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: EntityId,
    pub version_id: EntityId,
    pub widget_type: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub config: JsonMap,
}

impl Widget {
    const IMMUTABLE: &'static [&'static str] = &["id"];

    pub fn new(id: EntityId, version_id: EntityId, widget_type: impl Into<String>) -> Self {
        Self {
            id,
            version_id,
            widget_type: widget_type.into(),
            tag: String::new(),
            config: JsonMap::new(),
        }
    }

    pub fn merge_fields(&mut self, updates: &JsonMap) -> Result<(), MergeError> {
        merge_record(self, updates, Self::IMMUTABLE)
    }
}
