// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous, ordered fan-out of progress [`Event`]s to any number of
//! observers.
//!
//! This is deliberately not a write-ahead log: there is no buffering, no
//! backpressure, and nothing here is ever replayed (the durable source of
//! truth is [`ralph_core::Session`] via `ralph-storage`). Delivery happens
//! in the producer's execution context, in emission order; an observer
//! that panics is isolated and never brings down the engine or blocks its
//! siblings.

use parking_lot::Mutex;
use ralph_core::Event;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type ObserverFn = dyn Fn(&Event) + Send + Sync;

/// Handle returned by [`EventBus::subscribe`], used to [`EventBus::unsubscribe`] later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

struct Entry {
    id: u64,
    observer: Arc<ObserverFn>,
}

/// Single-producer, multi-consumer fan-out for [`Event`]s.
#[derive(Clone, Default)]
pub struct EventBus {
    observers: Arc<Mutex<Vec<Entry>>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Returns an id for later [`Self::unsubscribe`].
    pub fn subscribe(&self, observer: impl Fn(&Event) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers.lock().push(Entry { id, observer: Arc::new(observer) });
        SubscriptionId(id)
    }

    /// Remove a previously registered observer. Idempotent: unsubscribing
    /// an id that isn't (or is no longer) registered is not an error.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.observers.lock().retain(|e| e.id != id.0);
    }

    /// Emit one event to every currently registered observer, in
    /// registration order. Observers are snapshotted before the fan-out so
    /// an observer that subscribes or unsubscribes from within its own
    /// callback never deadlocks or mutates the set mid-delivery.
    pub fn emit(&self, event: &Event) {
        let snapshot: Vec<Arc<ObserverFn>> =
            self.observers.lock().iter().map(|e| e.observer.clone()).collect();
        for observer in snapshot {
            if catch_unwind(AssertUnwindSafe(|| observer(event))).is_err() {
                tracing::warn!(event = event.name(), "event bus observer panicked; isolated");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PMutex;

    #[test]
    fn delivers_events_in_order_to_all_observers() {
        let bus = EventBus::new();
        let seen_a = Arc::new(PMutex::new(Vec::new()));
        let seen_b = Arc::new(PMutex::new(Vec::new()));

        let a = seen_a.clone();
        bus.subscribe(move |e| a.lock().push(e.name().to_string()));
        let b = seen_b.clone();
        bus.subscribe(move |e| b.lock().push(e.name().to_string()));

        bus.emit(&Event::EngineStarted { total_tasks: 3 });
        bus.emit(&Event::EngineStopped {
            reason: ralph_core::TerminationReason::Idle,
            total_iterations: 0,
            tasks_completed: 0,
        });

        assert_eq!(*seen_a.lock(), vec!["engine:started", "engine:stopped"]);
        assert_eq!(*seen_b.lock(), vec!["engine:started", "engine:stopped"]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let seen = Arc::new(PMutex::new(Vec::new()));
        let handle = seen.clone();
        let id = bus.subscribe(move |e| handle.lock().push(e.name().to_string()));

        bus.emit(&Event::EngineStarted { total_tasks: 1 });
        bus.unsubscribe(id);
        bus.emit(&Event::EngineStarted { total_tasks: 2 });

        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn unsubscribing_twice_is_not_an_error() {
        let bus = EventBus::new();
        let id = bus.subscribe(|_| {});
        bus.unsubscribe(id);
        bus.unsubscribe(id);
    }

    #[test]
    fn panicking_observer_does_not_stop_delivery_to_others() {
        let bus = EventBus::new();
        bus.subscribe(|_| panic!("boom"));
        let seen = Arc::new(PMutex::new(false));
        let handle = seen.clone();
        bus.subscribe(move |_| *handle.lock() = true);

        bus.emit(&Event::EngineStarted { total_tasks: 1 });

        assert!(*seen.lock());
    }
}
