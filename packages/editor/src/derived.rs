//! # Derived-View Recomputation
//!
//! Some entity fields are computed artifacts of structural fields (a
//! theme's CSS selector list, derived from its style groups). Their
//! derivations are registered here as a statically-typed function table,
//! injected into the session at construction, and run synchronously inside
//! operation dispatch — after the store mutation, before the subscriber
//! fan-out — so no subscriber ever observes a structurally-updated entity
//! with stale derived fields.
//!
//! Derivation functions must be pure over their entity and idempotent:
//! running one redundantly is safe and happens (every save re-seed runs the
//! table again over the authoritative copy).

use std::collections::HashMap;

use pagecraft_model::{Entity, EntityKind};

pub type DeriveFn = fn(&mut Entity);

/// Function table keyed by entity kind.
#[derive(Default)]
pub struct DerivedViewTable {
    table: HashMap<EntityKind, DeriveFn>,
}

impl DerivedViewTable {
    /// Empty table: no kind carries derived fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the stock derivations registered.
    pub fn standard() -> Self {
        Self::new().with(EntityKind::Theme, recompute_theme_selectors)
    }

    pub fn with(mut self, kind: EntityKind, derive: DeriveFn) -> Self {
        self.table.insert(kind, derive);
        self
    }

    pub fn has(&self, kind: EntityKind) -> bool {
        self.table.contains_key(&kind)
    }

    pub(crate) fn recompute(&self, entity: &mut Entity) {
        if let Some(derive) = self.table.get(&entity.kind()) {
            derive(entity);
        }
    }
}

/// Rebuild a theme's selector list from its component styles and layout
/// customizations.
pub fn recompute_theme_selectors(entity: &mut Entity) {
    let Some(theme) = entity.as_theme_mut() else {
        return;
    };

    let mut selectors = Vec::new();
    for component in theme.component_styles.keys() {
        selectors.push(format!(".{component}"));
    }
    if let Some(layout) = &theme.layout_properties {
        for (part, breakpoints) in layout.iter() {
            selectors.push(format!(".layout-{part}"));
            for breakpoint in breakpoints.keys() {
                selectors.push(format!(".layout-{part}--{breakpoint}"));
            }
        }
    }
    selectors.sort();
    selectors.dedup();
    theme.selectors = selectors;
}
