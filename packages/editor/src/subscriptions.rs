//! # Subscription Registry
//!
//! Change fan-out between panels.
//!
//! After a successful operation every registered panel except the
//! originator is invoked with a [`ChangeNotification`]: the changed entity
//! kinds plus a read of the now-current store. No diffs cross this
//! boundary — callbacks re-derive their own view from the snapshot, which
//! trades a little redundant recomputation for the elimination of
//! incremental-patch divergence bugs.
//!
//! `notify` iterates a snapshot of the subscriber list taken up front, so a
//! handle may unregister (any subscriber, including itself) while a
//! notification is in flight. Unregistration is idempotent.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pagecraft_model::EntityKind;

use crate::store::EntityStore;

/// Identity of a registered panel, threaded through every mutation call as
/// `issued_by` so the registry can suppress self-notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SubscriberId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a notified subscriber receives: the changed kinds and a fresh read
/// of the store.
pub struct ChangeNotification<'a> {
    pub changed: &'a [EntityKind],
    pub store: &'a EntityStore,
}

impl ChangeNotification<'_> {
    pub fn includes(&self, kind: EntityKind) -> bool {
        self.changed.contains(&kind)
    }
}

pub type ChangeCallback = Box<dyn FnMut(&ChangeNotification<'_>)>;

struct Subscriber {
    id: SubscriberId,
    active: Cell<bool>,
    callback: RefCell<ChangeCallback>,
}

#[derive(Default)]
pub struct SubscriptionRegistry {
    subscribers: RefCell<Vec<Rc<Subscriber>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: SubscriberId, callback: ChangeCallback) -> SubscriptionHandle {
        let subscriber = Rc::new(Subscriber {
            id,
            active: Cell::new(true),
            callback: RefCell::new(callback),
        });
        self.subscribers.borrow_mut().push(Rc::clone(&subscriber));
        SubscriptionHandle { subscriber }
    }

    /// Invoke every active subscriber except the originator.
    pub fn notify(&self, originator: &SubscriberId, notification: &ChangeNotification<'_>) {
        // Stable snapshot: unregistration during the loop cannot invalidate
        // the iteration, it only flips `active`.
        let snapshot: Vec<Rc<Subscriber>> = self.subscribers.borrow().clone();
        for subscriber in snapshot {
            if !subscriber.active.get() || subscriber.id == *originator {
                continue;
            }
            (subscriber.callback.borrow_mut())(notification);
        }
        self.subscribers.borrow_mut().retain(|s| s.active.get());
    }

    /// Number of active subscribers.
    pub fn len(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|s| s.active.get())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn clear(&self) {
        let mut subscribers = self.subscribers.borrow_mut();
        for subscriber in subscribers.iter() {
            subscriber.active.set(false);
        }
        subscribers.clear();
    }
}

/// Deregistration handle returned by [`SubscriptionRegistry::register`].
pub struct SubscriptionHandle {
    subscriber: Rc<Subscriber>,
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.subscriber.id)
            .field("active", &self.subscriber.active.get())
            .finish()
    }
}

impl SubscriptionHandle {
    /// Stop receiving notifications. Safe to call more than once and safe
    /// to call while a notification is in progress.
    pub fn unregister(&self) {
        self.subscriber.active.set(false);
    }

    pub fn id(&self) -> &SubscriberId {
        &self.subscriber.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn notification_counter(
        registry: &SubscriptionRegistry,
        id: &str,
    ) -> (Rc<Cell<usize>>, SubscriptionHandle) {
        let count = Rc::new(Cell::new(0));
        let inner = Rc::clone(&count);
        let handle = registry.register(
            SubscriberId::from(id),
            Box::new(move |_| inner.set(inner.get() + 1)),
        );
        (count, handle)
    }

    fn notify(registry: &SubscriptionRegistry, originator: &str) {
        let store = EntityStore::new();
        let changed = [EntityKind::Page];
        registry.notify(
            &SubscriberId::from(originator),
            &ChangeNotification {
                changed: &changed,
                store: &store,
            },
        );
    }

    #[test]
    fn test_originator_is_suppressed() {
        let registry = SubscriptionRegistry::new();
        let (count_a, _ha) = notification_counter(&registry, "panel-a");
        let (count_b, _hb) = notification_counter(&registry, "panel-b");

        notify(&registry, "panel-a");

        assert_eq!(count_a.get(), 0);
        assert_eq!(count_b.get(), 1);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = SubscriptionRegistry::new();
        let (count, handle) = notification_counter(&registry, "panel-a");

        handle.unregister();
        handle.unregister();
        notify(&registry, "panel-b");

        assert_eq!(count.get(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_during_notify_is_safe() {
        let registry = SubscriptionRegistry::new();

        // panel-a unregisters itself from inside its own callback
        let handle_slot: Rc<RefCell<Option<SubscriptionHandle>>> =
            Rc::new(RefCell::new(None));
        let slot = Rc::clone(&handle_slot);
        let fired = Rc::new(Cell::new(0));
        let fired_inner = Rc::clone(&fired);
        let handle = registry.register(
            SubscriberId::from("panel-a"),
            Box::new(move |_| {
                fired_inner.set(fired_inner.get() + 1);
                if let Some(handle) = slot.borrow().as_ref() {
                    handle.unregister();
                }
            }),
        );
        *handle_slot.borrow_mut() = Some(handle);

        notify(&registry, "panel-b");
        notify(&registry, "panel-b");

        assert_eq!(fired.get(), 1);
    }
}
