//! Listener registry for engine events.
//!
//! Listeners are keyed by [`EventKind`] (or registered for every kind) and
//! removed by dropping the [`Subscription`] returned at registration.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::types::{EngineEvent, EventKind};

type Listener = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Option<EventKind>, Listener)>,
}

/// Fan-out of engine events to any number of listeners per event kind.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `listener` for every event of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> Subscription
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        self.insert(Some(kind), Arc::new(listener))
    }

    /// Call `listener` for every event.
    pub fn subscribe_all<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        self.insert(None, Arc::new(listener))
    }

    fn insert(&self, kind: Option<EventKind>, listener: Listener) -> Subscription {
        let mut reg = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = reg.next_id;
        reg.next_id += 1;
        reg.listeners.push((id, kind, listener));
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    pub fn emit(&self, event: &EngineEvent) {
        let kind = event.kind();
        // Call outside the lock so listeners may subscribe or unsubscribe.
        let targets: Vec<Listener> = {
            let reg = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            reg.listeners
                .iter()
                .filter(|(_, k, _)| k.is_none_or(|k| k == kind))
                .map(|(_, _, l)| Arc::clone(l))
                .collect()
        };
        for listener in targets {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }
}

/// Disposer for a registered listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}

    /// Keep the listener registered for as long as the bus lives.
    pub fn detach(mut self) {
        self.registry = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut reg = registry.lock().unwrap_or_else(PoisonError::into_inner);
            reg.listeners.retain(|(id, _, _)| *id != self.id);
        }
    }
}
