//! In-process publish/subscribe for store changes.
//!
//! Two typed channels: one carries every logged mutation, the other every
//! synthesized notification. Dispatch is synchronous on the publishing
//! thread and happens after the transaction commits. No lock is held while
//! listeners run, so a listener may call back into the store or subscribe
//! and unsubscribe freely.

use std::sync::{Arc, Mutex, Weak};

use log::warn;
use serde::Serialize;
use slotmap::{new_key_type, Key, KeyData, SlotMap};

use crate::local_db_model::{Notification, UpdateEntry};

new_key_type! {
    /// Identifies one registered listener.
    pub struct ListenerKey;
}

impl ListenerKey {
    /// Stable integer form for callers across the C ABI. Never zero.
    pub fn to_raw(self) -> u64 {
        self.data().as_ffi()
    }

    pub fn from_raw(raw: u64) -> Self {
        ListenerKey::from(KeyData::from_ffi(raw))
    }
}

/// Published after a mutation and its update-log entry commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationEvent {
    pub entry: UpdateEntry,
}

/// Published after a notification commits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEvent {
    pub notification: Notification,
}

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Channel<E> {
    listeners: Mutex<SlotMap<ListenerKey, Listener<E>>>,
}

impl<E> Channel<E> {
    fn new() -> Self {
        Channel {
            listeners: Mutex::new(SlotMap::with_key()),
        }
    }

    fn subscribe(&self, listener: Listener<E>) -> ListenerKey {
        match self.listeners.lock() {
            Ok(mut listeners) => listeners.insert(listener),
            Err(poisoned) => poisoned.into_inner().insert(listener),
        }
    }

    fn unsubscribe(&self, key: ListenerKey) -> bool {
        match self.listeners.lock() {
            Ok(mut listeners) => listeners.remove(key).is_some(),
            Err(poisoned) => poisoned.into_inner().remove(key).is_some(),
        }
    }

    fn len(&self) -> usize {
        self.listeners.lock().map(|listeners| listeners.len()).unwrap_or(0)
    }

    fn dispatch(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = match self.listeners.lock() {
            Ok(listeners) => listeners.values().cloned().collect(),
            Err(_) => {
                warn!("Listener registry poisoned; dropping event");
                return;
            }
        };
        for listener in snapshot {
            listener(event);
        }
    }
}

/// Keeps a listener registered until dropped or [`unsubscribe`]d.
///
/// [`unsubscribe`]: Subscription::unsubscribe
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    key: ListenerKey,
    cancel: Option<Box<dyn FnOnce(ListenerKey) + Send + Sync>>,
}

impl Subscription {
    pub fn key(&self) -> ListenerKey {
        self.key
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    /// Leaves the listener registered for the life of the bus.
    pub fn detach(mut self) -> ListenerKey {
        self.cancel = None;
        self.key
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel(self.key);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

pub struct EventBus {
    updates: Arc<Channel<MutationEvent>>,
    notifications: Arc<Channel<NotificationEvent>>,
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        EventBus {
            updates: Arc::new(Channel::new()),
            notifications: Arc::new(Channel::new()),
        }
    }

    pub fn subscribe_to_updates(&self, listener: impl Fn(&MutationEvent) + Send + Sync + 'static) -> Subscription {
        subscribe(&self.updates, Arc::new(listener))
    }

    pub fn subscribe_to_notifications(
        &self,
        listener: impl Fn(&NotificationEvent) + Send + Sync + 'static,
    ) -> Subscription {
        subscribe(&self.notifications, Arc::new(listener))
    }

    pub fn unsubscribe_from_updates(&self, key: ListenerKey) -> bool {
        self.updates.unsubscribe(key)
    }

    pub fn unsubscribe_from_notifications(&self, key: ListenerKey) -> bool {
        self.notifications.unsubscribe(key)
    }

    pub fn update_listener_count(&self) -> usize {
        self.updates.len()
    }

    pub fn notification_listener_count(&self) -> usize {
        self.notifications.len()
    }

    pub(crate) fn publish_update(&self, event: &MutationEvent) {
        self.updates.dispatch(event);
    }

    pub(crate) fn publish_notification(&self, event: &NotificationEvent) {
        self.notifications.dispatch(event);
    }
}

fn subscribe<E: 'static>(channel: &Arc<Channel<E>>, listener: Listener<E>) -> Subscription {
    let key = channel.subscribe(listener);
    let weak: Weak<Channel<E>> = Arc::downgrade(channel);
    Subscription {
        key,
        cancel: Some(Box::new(move |key| {
            if let Some(channel) = weak.upgrade() {
                channel.unsubscribe(key);
            }
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::local_db_model::UpdateAction;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn entry() -> MutationEvent {
        MutationEvent {
            entry: UpdateEntry {
                id: Some(1),
                timestamp: "2025-01-01T00:00:00.000Z".into(),
                store_name: Collection::Events,
                action: UpdateAction::Delete,
                data: serde_json::json!({"id": "event-1"}),
            },
        }
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let subscription = bus.subscribe_to_updates(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        bus.publish_update(&entry());
        drop(subscription);
        bus.publish_update(&entry());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.update_listener_count(), 0);
    }

    #[test]
    fn test_detached_listener_stays_until_removed_by_key() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let key = bus
            .subscribe_to_updates(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .detach();
        bus.publish_update(&entry());
        bus.publish_update(&entry());
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        let raw = key.to_raw();
        assert_ne!(raw, 0);
        assert!(bus.unsubscribe_from_updates(ListenerKey::from_raw(raw)));
        assert!(!bus.unsubscribe_from_updates(key));
        bus.publish_update(&entry());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_listener_may_unsubscribe_during_dispatch() {
        let bus = Arc::new(EventBus::new());
        let slot: Arc<Mutex<Option<ListenerKey>>> = Arc::new(Mutex::new(None));
        let (bus_ref, slot_ref) = (Arc::downgrade(&bus), slot.clone());
        let key = bus
            .subscribe_to_updates(move |_| {
                if let (Some(bus), Some(key)) = (bus_ref.upgrade(), *slot_ref.lock().unwrap()) {
                    bus.unsubscribe_from_updates(key);
                }
            })
            .detach();
        *slot.lock().unwrap() = Some(key);
        bus.publish_update(&entry());
        assert_eq!(bus.update_listener_count(), 0);
    }

    #[test]
    fn test_channels_are_independent() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _subscription = bus.subscribe_to_notifications(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        bus.publish_update(&entry());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(bus.notification_listener_count(), 1);
    }
}
