//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use pagecraft_editor::{Entity, EntityId, JsonMap, Page, PageVersion, Theme, Widget};

pub fn page(id: &str) -> Entity {
    Entity::Page(Page::new(EntityId::from(id), "home", "Home"))
}

pub fn version(id: &str, page_id: &str) -> Entity {
    Entity::Version(PageVersion::new(
        EntityId::from(id),
        EntityId::from(page_id),
        "Draft",
    ))
}

pub fn theme(id: &str) -> Entity {
    Entity::Theme(Theme::new(EntityId::from(id), "Default"))
}

pub fn widget(id: EntityId, version_id: &str) -> Entity {
    Entity::Widget(Widget::new(id, EntityId::from(version_id), "gallery"))
}

pub fn updates(value: serde_json::Value) -> JsonMap {
    value.as_object().expect("updates must be an object").clone()
}
