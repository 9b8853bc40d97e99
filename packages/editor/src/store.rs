//! # Entity Store
//!
//! Normalized, keyed map of editable entities — the single source of truth
//! for current in-memory state.
//!
//! Panels read from it synchronously at render time and always see the
//! latest committed state; there is no asynchronous write path inside the
//! store. Mutation happens only through the session's operation dispatch —
//! panels that need to modify a returned entity locally clone it first.

use std::collections::BTreeMap;

use pagecraft_model::{Entity, EntityId, EntityKind};

#[derive(Debug, Default)]
pub struct EntityStore {
    entities: BTreeMap<(EntityKind, EntityId), Entity>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: EntityKind, id: &EntityId) -> Option<&Entity> {
        self.entities.get(&(kind, id.clone()))
    }

    pub fn contains(&self, kind: EntityKind, id: &EntityId) -> bool {
        self.entities.contains_key(&(kind, id.clone()))
    }

    /// Ids of every stored entity of one kind.
    pub fn ids(&self, kind: EntityKind) -> Vec<EntityId> {
        self.entities
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, id)| id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub(crate) fn get_mut(&mut self, kind: EntityKind, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&(kind, id.clone()))
    }

    pub(crate) fn insert(&mut self, entity: Entity) -> Option<Entity> {
        self.entities
            .insert((entity.kind(), entity.id().clone()), entity)
    }

    pub(crate) fn remove(&mut self, kind: EntityKind, id: &EntityId) -> Option<Entity> {
        self.entities.remove(&(kind, id.clone()))
    }

    /// Move an entity from a temporary local id to its server-issued id.
    pub(crate) fn rekey(&mut self, kind: EntityKind, old: &EntityId, new: EntityId) -> bool {
        match self.remove(kind, old) {
            Some(mut entity) => {
                entity.set_id(new);
                self.insert(entity);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entities.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft_model::Page;

    fn page(id: &str) -> Entity {
        Entity::Page(Page::new(EntityId::from(id), "home", "Home"))
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = EntityStore::new();
        store.insert(page("page-1"));

        let found = store.get(EntityKind::Page, &EntityId::from("page-1"));
        assert!(found.is_some());
        assert!(store.get(EntityKind::Theme, &EntityId::from("page-1")).is_none());
    }

    #[test]
    fn test_ids_filters_by_kind() {
        let mut store = EntityStore::new();
        store.insert(page("page-1"));
        store.insert(page("page-2"));

        assert_eq!(store.ids(EntityKind::Page).len(), 2);
        assert!(store.ids(EntityKind::Widget).is_empty());
    }

    #[test]
    fn test_rekey_moves_entity() {
        let mut store = EntityStore::new();
        store.insert(Entity::Page(Page::new(EntityId::local(0), "home", "Home")));

        assert!(store.rekey(EntityKind::Page, &EntityId::local(0), EntityId::from("page-7")));
        assert!(store.get(EntityKind::Page, &EntityId::local(0)).is_none());

        let moved = store.get(EntityKind::Page, &EntityId::from("page-7")).unwrap();
        assert_eq!(moved.id().as_str(), "page-7");
    }

    #[test]
    fn test_rekey_missing_entity_is_false() {
        let mut store = EntityStore::new();
        assert!(!store.rekey(EntityKind::Page, &EntityId::local(9), EntityId::from("x")));
    }
}
