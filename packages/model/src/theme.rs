//! Theme records and the sparse layout-property map.
//!
//! Layout customizations follow a three-level sparse-map policy:
//! `part → breakpoint → property`. Removing a value deletes its key, and
//! emptied maps collapse upward — an emptied breakpoint deletes the
//! breakpoint, an emptied part deletes the part, and a fully emptied map
//! leaves the theme with `layout_properties: None` so "no customization"
//! stays a single null check. An empty-string value is a real value: the
//! property exists and renders as an empty input.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{merge_record, EntityId, JsonMap, MergeError};

/// A site theme: typography, per-component style objects, and optional
/// layout-property customizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub typography: Typography,
    #[serde(default)]
    pub component_styles: BTreeMap<String, JsonMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_properties: Option<LayoutProperties>,
    /// Derived CSS selector list. Recomputed on every structural mutation;
    /// never edited directly.
    #[serde(default)]
    pub selectors: Vec<String>,
    /// Server-side url of the uploaded logo image.
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Theme {
    const IMMUTABLE: &'static [&'static str] = &["id", "selectors", "logo_url", "updated_at"];

    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            typography: Typography::default(),
            component_styles: BTreeMap::new(),
            layout_properties: None,
            selectors: Vec::new(),
            logo_url: None,
            updated_at: None,
        }
    }

    pub fn merge_fields(&mut self, updates: &JsonMap) -> Result<(), MergeError> {
        merge_record(self, updates, Self::IMMUTABLE)
    }

    /// Write one layout property, collapsing emptied maps afterward.
    pub fn set_layout_property(
        &mut self,
        part: &str,
        breakpoint: &str,
        property: &str,
        value: &LayoutValue,
    ) {
        let layout = self.layout_properties.get_or_insert_with(Default::default);
        layout.set(part, breakpoint, property, value);
        self.collapse_layout();
    }

    /// Drop a whole breakpoint map for a part.
    pub fn remove_layout_breakpoint(&mut self, part: &str, breakpoint: &str) {
        if let Some(layout) = &mut self.layout_properties {
            layout.remove_breakpoint(part, breakpoint);
        }
        self.collapse_layout();
    }

    /// Drop a whole part map.
    pub fn remove_layout_part(&mut self, part: &str) {
        if let Some(layout) = &mut self.layout_properties {
            layout.remove_part(part);
        }
        self.collapse_layout();
    }

    fn collapse_layout(&mut self) {
        if self
            .layout_properties
            .as_ref()
            .is_some_and(LayoutProperties::is_empty)
        {
            self.layout_properties = None;
        }
    }
}

/// Typography settings, organized as an ordered list of named groups
/// (e.g. "headings", "body") edited one group at a time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Typography {
    #[serde(default)]
    pub groups: Vec<TypographyGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypographyGroup {
    pub name: String,
    #[serde(default)]
    pub font_family: String,
    #[serde(default)]
    pub base_size: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub line_height: Option<String>,
}

impl TypographyGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            font_family: String::new(),
            base_size: None,
            weight: None,
            line_height: None,
        }
    }

    pub fn merge_fields(&mut self, updates: &JsonMap) -> Result<(), MergeError> {
        merge_record(self, updates, &[])
    }
}

/// Value of a layout-property write. `Remove` deletes the key; an empty
/// `Set("")` keeps it (field exists but is empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutValue {
    Set(String),
    Remove,
}

/// Sparse `part → breakpoint → property` customization map.
///
/// Owners store it as `Option<LayoutProperties>` and collapse it to `None`
/// once empty; the map itself is never serialized empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutProperties {
    parts: BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>,
}

impl LayoutProperties {
    pub fn get(&self, part: &str, breakpoint: &str, property: &str) -> Option<&str> {
        self.parts
            .get(part)?
            .get(breakpoint)?
            .get(property)
            .map(String::as_str)
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&String, &BTreeMap<String, BTreeMap<String, String>>)> {
        self.parts.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Number of properties held under one breakpoint of one part.
    pub fn property_count(&self, part: &str, breakpoint: &str) -> usize {
        self.parts
            .get(part)
            .and_then(|breakpoints| breakpoints.get(breakpoint))
            .map_or(0, BTreeMap::len)
    }

    /// Number of properties held anywhere under one part.
    pub fn part_property_count(&self, part: &str) -> usize {
        self.parts
            .get(part)
            .map_or(0, |breakpoints| breakpoints.values().map(BTreeMap::len).sum())
    }

    fn set(&mut self, part: &str, breakpoint: &str, property: &str, value: &LayoutValue) {
        match value {
            LayoutValue::Set(v) => {
                self.parts
                    .entry(part.to_string())
                    .or_default()
                    .entry(breakpoint.to_string())
                    .or_default()
                    .insert(property.to_string(), v.clone());
            }
            LayoutValue::Remove => {
                if let Some(breakpoints) = self.parts.get_mut(part) {
                    if let Some(properties) = breakpoints.get_mut(breakpoint) {
                        properties.remove(property);
                        if properties.is_empty() {
                            breakpoints.remove(breakpoint);
                        }
                    }
                    if breakpoints.is_empty() {
                        self.parts.remove(part);
                    }
                }
            }
        }
    }

    fn remove_breakpoint(&mut self, part: &str, breakpoint: &str) {
        if let Some(breakpoints) = self.parts.get_mut(part) {
            breakpoints.remove(breakpoint);
            if breakpoints.is_empty() {
                self.parts.remove(part);
            }
        }
    }

    fn remove_part(&mut self, part: &str) {
        self.parts.remove(part);
    }
}
