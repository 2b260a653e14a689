//! Synchronous in-process event bus

use std::fmt;

use super::event::{EventKind, TraceEvent};

type Handler = Box<dyn Fn(&TraceEvent<'_>, &EventBus) + Send + Sync>;

/// Publish/subscribe channel between the engine and its observers.
///
/// Consumers are registered before the run starts. `publish` calls every
/// consumer registered for the event's kind, in registration order, and
/// returns only once they are all done. Consumers get the bus back so they
/// can publish follow-up events.
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<(EventKind, Handler)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a consumer for one event kind
    pub fn on<F>(&mut self, kind: EventKind, handler: F)
    where
        F: Fn(&TraceEvent<'_>, &EventBus) + Send + Sync + 'static,
    {
        self.handlers.push((kind, Box::new(handler)));
    }

    /// Deliver an event to its consumers
    pub fn publish(&self, event: &TraceEvent<'_>) {
        let kind = event.kind();
        tracing::trace!(channel = kind.channel(), vu = %event.vu, "publish");
        for (_, handler) in self.handlers.iter().filter(|(k, _)| *k == kind) {
            handler(event, self);
        }
    }

    /// Number of consumers registered for a kind
    pub fn subscribers(&self, kind: EventKind) -> usize {
        self.handlers.iter().filter(|(k, _)| *k == kind).count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::Payload;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    #[test]
    fn test_delivery_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            bus.on(EventKind::Error, move |_, _| seen.lock().unwrap().push(tag));
        }

        bus.publish(&TraceEvent {
            vu: Uuid::new_v4(),
            payload: Payload::Error { message: "boom" },
        });

        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_only_matching_kind_is_delivered() {
        let count = Arc::new(Mutex::new(0));
        let mut bus = EventBus::new();
        {
            let count = count.clone();
            bus.on(EventKind::HttpCapture, move |_, _| *count.lock().unwrap() += 1);
        }

        bus.publish(&TraceEvent {
            vu: Uuid::new_v4(),
            payload: Payload::Error { message: "ignored" },
        });
        assert_eq!(*count.lock().unwrap(), 0);
        assert_eq!(bus.subscribers(EventKind::HttpCapture), 1);
        assert_eq!(bus.subscribers(EventKind::Error), 0);
    }

    #[test]
    fn test_consumer_can_republish() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        bus.on(EventKind::HttpCapture, |event, bus| {
            if let Payload::HttpCapture { name, .. } = event.payload {
                let message = format!("captured {}", name);
                bus.publish(&TraceEvent {
                    vu: event.vu,
                    payload: Payload::Error { message: &message },
                });
            }
        });
        {
            let messages = messages.clone();
            bus.on(EventKind::Error, move |event, _| {
                if let Payload::Error { message } = event.payload {
                    messages.lock().unwrap().push(message.to_string());
                }
            });
        }

        let value = serde_json::json!(7);
        bus.publish(&TraceEvent {
            vu: Uuid::new_v4(),
            payload: Payload::HttpCapture {
                step: 0,
                name: "id",
                value: &value,
            },
        });

        assert_eq!(*messages.lock().unwrap(), vec!["captured id".to_string()]);
    }

    #[test]
    fn test_channel_names() {
        assert_eq!(EventKind::HttpRequest.channel(), "trace:http:request");
        assert_eq!(EventKind::Expectations.channel(), "plugin:expect:expectations");
    }
}
