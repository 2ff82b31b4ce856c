//! Synchronous publish/subscribe primitive
//!
//! `notify` delivers an event to every current watcher before it returns.
//! Callbacks run outside the internal lock, so a watcher may subscribe,
//! unsubscribe or query the emitting object from inside its callback.

use crate::event::Event;
use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};
use std::sync::Arc;

new_key_type! {
    /// Identifies a subscription so it can be removed again
    pub struct WatchId;
}

type WatchCallback<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Watcher<E> {
    /// `None` watches every event
    filter: Option<&'static str>,
    callback: WatchCallback<E>,
}

/// Set of callbacks interested in events of type `E`
pub struct Watchable<E: Event> {
    watchers: Mutex<SlotMap<WatchId, Watcher<E>>>,
}

impl<E: Event> Watchable<E> {
    pub fn new() -> Self {
        Self {
            watchers: Mutex::new(SlotMap::with_key()),
        }
    }

    /// Subscribe to events whose `event_name()` equals `name`
    pub fn watch<F>(&self, name: &'static str, callback: F) -> WatchId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.insert(Some(name), Arc::new(callback))
    }

    /// Subscribe to all events
    pub fn watch_all<F>(&self, callback: F) -> WatchId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.insert(None, Arc::new(callback))
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unwatch(&self, id: WatchId) -> bool {
        self.watchers.lock().remove(id).is_some()
    }

    /// Deliver `event` to current subscribers
    pub fn notify(&self, event: &E) {
        let name = event.event_name();
        let callbacks: Vec<WatchCallback<E>> = self
            .watchers
            .lock()
            .values()
            .filter(|watcher| watcher.filter.map_or(true, |filter| filter == name))
            .map(|watcher| Arc::clone(&watcher.callback))
            .collect();

        for callback in callbacks {
            callback(event);
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.lock().len()
    }

    /// Remove all subscriptions
    pub fn clear(&self) {
        self.watchers.lock().clear();
    }

    fn insert(&self, filter: Option<&'static str>, callback: WatchCallback<E>) -> WatchId {
        self.watchers.lock().insert(Watcher { filter, callback })
    }
}

impl<E: Event> Default for Watchable<E> {
    fn default() -> Self {
        Self::new()
    }
}
