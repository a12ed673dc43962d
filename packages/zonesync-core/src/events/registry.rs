//! Ordered-handler event channels.
//!
//! Each named channel owns a list of handlers; firing a channel invokes
//! every handler in registration order, synchronously, on whichever task
//! produced the event. A handler must not block indefinitely or it stalls
//! that task's remaining zones for the tick.

use parking_lot::RwLock;

/// Handler signature for one channel payload type.
type Handler<T> = Box<dyn Fn(&T) + Send + Sync>;

/// One named event channel with zero or more registered handlers.
pub struct EventChannel<T> {
    name: &'static str,
    handlers: RwLock<Vec<Handler<T>>>,
}

impl<T> EventChannel<T> {
    /// Creates an empty channel.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// The channel's name, as used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Registers a handler. Handlers fire in registration order.
    pub fn observe(&self, handler: impl Fn(&T) + Send + Sync + 'static) {
        self.handlers.write().push(Box::new(handler));
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Fires the channel, invoking every handler in order.
    pub fn emit(&self, payload: &T) {
        tracing::debug!(channel = self.name, "event");
        for handler in self.handlers.read().iter() {
            handler(payload);
        }
    }
}

impl<T> std::fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("name", &self.name)
            .field("handlers", &self.handler_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn handlers_fire_in_registration_order() {
        let channel: EventChannel<u32> = EventChannel::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            channel.observe(move |value: &u32| seen.lock().push((tag, *value)));
        }

        channel.emit(&7);

        assert_eq!(
            *seen.lock(),
            vec![("first", 7), ("second", 7), ("third", 7)]
        );
    }

    #[test]
    fn channel_without_handlers_is_silent() {
        let channel: EventChannel<String> = EventChannel::new("empty");
        assert_eq!(channel.handler_count(), 0);
        channel.emit(&"nobody listens".to_string());
    }
}
