//! Operation dispatch: store mutation, dirty marking, derived views and
//! subscriber fan-out, including the debounced editing path.

mod support;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use pagecraft_editor::{
    EditorError, EditorSession, EntityId, EntityKind, FieldKey, FieldPath,
    InMemoryBoundary, LayoutValue, Operation, SubscriberId,
};
use serde_json::json;
use support::{page, theme, updates, version, widget};

fn session_with_page() -> EditorSession<InMemoryBoundary> {
    let mut session = EditorSession::new(InMemoryBoundary::new());
    session.seed(page("page-1"));
    session
}

#[test]
fn test_field_update_reaches_store_and_other_panels() {
    // Scenario A: UPDATE page field, one subscribed non-originator panel
    let mut session = session_with_page();

    let seen_slugs: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen_slugs);
    let _handle = session.subscribe(
        SubscriberId::from("panel-b"),
        Box::new(move |notification| {
            assert!(notification.includes(EntityKind::Page));
            let page = notification
                .store
                .get(EntityKind::Page, &EntityId::from("page-1"))
                .and_then(|e| e.as_page().cloned())
                .expect("page must be readable during notification");
            sink.borrow_mut().push(page.slug);
        }),
    )
    .unwrap();

    assert!(!session.is_dirty(EntityKind::Page));

    let op = Operation::UpdatePageField {
        id: EntityId::from("page-1"),
        updates: updates(json!({ "slug": "404" })),
    };
    let updated = session.apply(&SubscriberId::from("panel-a"), op).unwrap();

    assert_eq!(updated.as_page().unwrap().slug, "404");
    assert_eq!(
        session
            .store()
            .get(EntityKind::Page, &EntityId::from("page-1"))
            .unwrap()
            .as_page()
            .unwrap()
            .slug,
        "404"
    );
    assert!(session.is_dirty(EntityKind::Page));
    assert_eq!(*seen_slugs.borrow(), vec!["404".to_string()]);
}

#[test]
fn test_originator_suppressed_other_panel_notified_once() {
    // Scenario E: panels A and B; A issues the operation
    let mut session = session_with_page();

    let a_calls = Rc::new(RefCell::new(0));
    let b_calls = Rc::new(RefCell::new(0));
    let a_sink = Rc::clone(&a_calls);
    let b_sink = Rc::clone(&b_calls);
    let _a = session
        .subscribe(
            SubscriberId::from("panel-a"),
            Box::new(move |_| *a_sink.borrow_mut() += 1),
        )
        .unwrap();
    let _b = session
        .subscribe(
            SubscriberId::from("panel-b"),
            Box::new(move |_| *b_sink.borrow_mut() += 1),
        )
        .unwrap();

    let op = Operation::UpdatePageField {
        id: EntityId::from("page-1"),
        updates: updates(json!({ "title": "Not Found" })),
    };
    session.apply(&SubscriberId::from("panel-a"), op).unwrap();

    assert_eq!(*a_calls.borrow(), 0);
    assert_eq!(*b_calls.borrow(), 1);
}

#[test]
fn test_widget_creation_is_two_sequential_operations() {
    // One operation per entity: widget creation, then the version tag list
    let mut session = EditorSession::new(InMemoryBoundary::new());
    session.seed(version("v-1", "page-1"));

    let panel = SubscriberId::from("widget-panel");
    let widget_id = session.allocate_local_id();

    session
        .apply(
            &panel,
            Operation::CreateEntity {
                entity: widget(widget_id.clone(), "v-1"),
            },
        )
        .unwrap();
    session
        .apply(
            &panel,
            Operation::UpdateVersionField {
                id: EntityId::from("v-1"),
                updates: updates(json!({ "widget_tags": ["gallery-1"] })),
            },
        )
        .unwrap();

    assert!(session.store().contains(EntityKind::Widget, &widget_id));
    assert_eq!(
        session
            .store()
            .get(EntityKind::Version, &EntityId::from("v-1"))
            .unwrap()
            .as_version()
            .unwrap()
            .widget_tags,
        vec!["gallery-1".to_string()]
    );
    assert!(session.is_dirty(EntityKind::Widget));
    assert!(session.is_dirty(EntityKind::Version));
}

#[test]
fn test_duplicate_create_is_rejected() {
    let mut session = session_with_page();
    let err = session
        .apply(
            &SubscriberId::from("panel-a"),
            Operation::CreateEntity {
                entity: page("page-1"),
            },
        )
        .unwrap_err();
    assert!(err.to_string().contains("already exists"));
}

#[test]
fn test_layout_mutation_recomputes_selectors_before_fanout() {
    let mut session = EditorSession::new(InMemoryBoundary::new());
    session.seed(theme("t-1"));

    let seen: Rc<RefCell<Vec<Vec<String>>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _handle = session.subscribe(
        SubscriberId::from("preview-panel"),
        Box::new(move |notification| {
            let theme = notification
                .store
                .get(EntityKind::Theme, &EntityId::from("t-1"))
                .and_then(|e| e.as_theme().cloned())
                .unwrap();
            sink.borrow_mut().push(theme.selectors);
        }),
    )
    .unwrap();

    session
        .apply(
            &SubscriberId::from("layout-panel"),
            Operation::SetLayoutProperty {
                id: EntityId::from("t-1"),
                part: "content".to_string(),
                breakpoint: "sm".to_string(),
                property: "padding".to_string(),
                value: LayoutValue::Set("8px".to_string()),
            },
        )
        .unwrap();

    // the subscriber already saw the recomputed derived view
    assert_eq!(
        seen.borrow().last().unwrap(),
        &vec![".layout-content".to_string(), ".layout-content--sm".to_string()]
    );
}

#[test]
fn test_debounced_edits_coalesce_through_session() {
    // Scenario C: three keystrokes, one dispatcher call with the last value
    let mut session = EditorSession::new(InMemoryBoundary::new());
    session.seed(theme("t-1"));

    let notifications = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&notifications);
    let _handle = session
        .subscribe(
            SubscriberId::from("preview-panel"),
            Box::new(move |_| *sink.borrow_mut() += 1),
        )
        .unwrap();

    let panel = SubscriberId::from("layout-panel");
    let key = FieldKey::new(
        EntityKind::Theme,
        EntityId::from("t-1"),
        FieldPath::LayoutProperty {
            part: "content".to_string(),
            breakpoint: "sm".to_string(),
            property: "padding".to_string(),
        },
    );
    let set = |value: &str| Operation::SetLayoutProperty {
        id: EntityId::from("t-1"),
        part: "content".to_string(),
        breakpoint: "sm".to_string(),
        property: "padding".to_string(),
        value: LayoutValue::Set(value.to_string()),
    };

    let start = Instant::now();
    for (offset, value) in [(0u64, "a"), (50, "ab"), (100, "abc")] {
        session
            .stage_field(
                &panel,
                key.clone(),
                set(value),
                json!(value),
                false,
                start + Duration::from_millis(offset),
            )
            .unwrap();
    }

    // echo visible, store untouched, nobody notified yet
    assert_eq!(session.staged_value(&key), Some(&json!("abc")));
    assert!(session
        .store()
        .get(EntityKind::Theme, &EntityId::from("t-1"))
        .unwrap()
        .as_theme()
        .unwrap()
        .layout_properties
        .is_none());
    assert_eq!(*notifications.borrow(), 0);

    let issued = session
        .flush_expired(start + Duration::from_millis(650))
        .unwrap();
    assert_eq!(issued, 1);
    assert_eq!(*notifications.borrow(), 1);
    assert_eq!(session.staged_value(&key), None);
    assert_eq!(
        session
            .store()
            .get(EntityKind::Theme, &EntityId::from("t-1"))
            .unwrap()
            .as_theme()
            .unwrap()
            .layout_properties
            .as_ref()
            .unwrap()
            .get("content", "sm", "padding"),
        Some("abc")
    );
}

#[test]
fn test_flush_field_dispatches_immediately_and_cancels_timer() {
    let mut session = EditorSession::new(InMemoryBoundary::new());
    session.seed(page("page-1"));

    let panel = SubscriberId::from("settings-panel");
    let key = FieldKey::new(
        EntityKind::Page,
        EntityId::from("page-1"),
        FieldPath::Field("title".to_string()),
    );
    let op = Operation::UpdatePageField {
        id: EntityId::from("page-1"),
        updates: updates(json!({ "title": "About" })),
    };

    let start = Instant::now();
    session
        .stage_field(&panel, key.clone(), op, json!("About"), false, start)
        .unwrap();

    // blur: forced flush
    let flushed = session.flush_field(&key).unwrap();
    assert_eq!(flushed.unwrap().as_page().unwrap().title, "About");

    // no duplicate fires once the original window elapses
    let issued = session.flush_expired(start + Duration::from_secs(5)).unwrap();
    assert_eq!(issued, 0);
}

#[test]
fn test_panel_teardown_abandons_staged_edit() {
    let mut session = session_with_page();

    let panel = SubscriberId::from("settings-panel");
    let key = FieldKey::new(
        EntityKind::Page,
        EntityId::from("page-1"),
        FieldPath::Field("title".to_string()),
    );
    let op = Operation::UpdatePageField {
        id: EntityId::from("page-1"),
        updates: updates(json!({ "title": "Lost" })),
    };

    let start = Instant::now();
    session
        .stage_field(&panel, key.clone(), op, json!("Lost"), false, start)
        .unwrap();
    session.cancel_panel(&panel);

    let issued = session.flush_expired(start + Duration::from_secs(5)).unwrap();
    assert_eq!(issued, 0);
    assert_eq!(
        session
            .store()
            .get(EntityKind::Page, &EntityId::from("page-1"))
            .unwrap()
            .as_page()
            .unwrap()
            .title,
        "Home"
    );
}

#[test]
fn test_failed_flush_does_not_lose_other_panels_edits() {
    // a stale-reference edit from one panel must not destroy another
    // panel's staged input when both windows expire in the same poll
    let mut session = session_with_page();
    let start = Instant::now();

    let stale_key = FieldKey::new(
        EntityKind::Page,
        EntityId::from("page-404"),
        FieldPath::Field("title".to_string()),
    );
    session
        .stage_field(
            &SubscriberId::from("panel-a"),
            stale_key,
            Operation::UpdatePageField {
                id: EntityId::from("page-404"),
                updates: updates(json!({ "title": "Gone" })),
            },
            json!("Gone"),
            false,
            start,
        )
        .unwrap();

    let valid_key = FieldKey::new(
        EntityKind::Page,
        EntityId::from("page-1"),
        FieldPath::Field("title".to_string()),
    );
    session
        .stage_field(
            &SubscriberId::from("panel-b"),
            valid_key,
            Operation::UpdatePageField {
                id: EntityId::from("page-1"),
                updates: updates(json!({ "title": "Kept" })),
            },
            json!("Kept"),
            false,
            start + Duration::from_millis(10),
        )
        .unwrap();

    // the stale edit expires first and fails; the valid edit still lands
    let err = session
        .flush_expired(start + Duration::from_secs(5))
        .unwrap_err();
    assert!(matches!(err, EditorError::UnknownEntity { .. }));
    assert_eq!(
        session
            .store()
            .get(EntityKind::Page, &EntityId::from("page-1"))
            .unwrap()
            .as_page()
            .unwrap()
            .title,
        "Kept"
    );
}

#[test]
fn test_immediate_stage_bypasses_window() {
    let mut session = session_with_page();

    let panel = SubscriberId::from("settings-panel");
    let key = FieldKey::new(
        EntityKind::Page,
        EntityId::from("page-1"),
        FieldPath::Field("description".to_string()),
    );
    let op = Operation::UpdatePageField {
        id: EntityId::from("page-1"),
        updates: updates(json!({ "description": "landing page" })),
    };

    let applied = session
        .stage_field(&panel, key.clone(), op, json!("landing page"), true, Instant::now())
        .unwrap();

    assert!(applied.is_some());
    assert_eq!(session.staged_value(&key), None);
    assert!(session.is_dirty(EntityKind::Page));
}
