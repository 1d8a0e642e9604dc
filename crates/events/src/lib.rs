//! Synchronous in-process event bus.
//!
//! Subscribers run on the publisher's thread, in registration order, before
//! `publish` returns. That mirrors the write path the application needs:
//! side effects of a record creation (the welcome mail) happen as part of
//! the creating request.

use std::sync::RwLock;

type Subscriber<E> = Box<dyn Fn(&E) + Send + Sync>;

pub struct EventBus<E> {
    subscribers: RwLock<Vec<Subscriber<E>>>,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Register a handler for every subsequent publish.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribers
            .write()
            .expect("event bus lock poisoned")
            .push(Box::new(handler));
    }

    /// Deliver `event` to every subscriber, in registration order.
    pub fn publish(&self, event: &E) {
        let subscribers = self.subscribers.read().expect("event bus lock poisoned");
        tracing::trace!(count = subscribers.len(), "publishing event");
        for subscriber in subscribers.iter() {
            subscriber(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .expect("event bus lock poisoned")
            .len()
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}
