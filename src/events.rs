//! In-process publish/subscribe for indexing progress and entity-change
//! notifications.
//!
//! Topics are dotted strings (`index.indexing`, `count.photos`, ...) and
//! payloads are shallow JSON maps. Publishing never blocks: subscribers get
//! an unbounded channel and are dropped once their receiver is gone.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use serde_json::Value;

pub type Data = serde_json::Map<String, Value>;

#[derive(Debug, Clone)]
pub struct Event {
    pub topic: String,
    pub data: Data,
}

struct Subscriber {
    prefix: String,
    tx: Sender<Event>,
}

#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to all topics starting with `prefix`. An empty prefix
    /// matches everything.
    pub fn subscribe(&self, prefix: &str) -> Receiver<Event> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().unwrap().push(Subscriber {
            prefix: prefix.to_string(),
            tx,
        });
        rx
    }

    /// Publish `data` under `topic`. Non-object payloads are wrapped into a
    /// map under the key `value`.
    pub fn publish(&self, topic: &str, data: Value) {
        let data = match data {
            Value::Object(map) => map,
            other => {
                let mut map = Data::new();
                map.insert("value".to_string(), other);
                map
            }
        };

        let event = Event {
            topic: topic.to_string(),
            data,
        };

        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|s| {
            if !topic.starts_with(&s.prefix) {
                return true;
            }
            s.tx.send(event.clone()).is_ok()
        });
    }

    /// Notify about newly created entities: published as `<kind>.created`.
    pub fn entities_created(&self, kind: &str, data: Value) {
        self.publish(&format!("{kind}.created"), data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_publish_reaches_matching_subscribers() {
        let bus = EventBus::new();
        let counts = bus.subscribe("count.");
        let all = bus.subscribe("");

        bus.publish("count.photos", json!({"count": 1}));
        bus.publish("index.indexing", json!({"fileName": "a.jpg"}));

        let event = counts.recv().unwrap();
        assert_eq!(event.topic, "count.photos");
        assert_eq!(event.data.get("count"), Some(&json!(1)));
        assert!(counts.try_recv().is_err());

        assert_eq!(all.recv().unwrap().topic, "count.photos");
        assert_eq!(all.recv().unwrap().topic, "index.indexing");
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let bus = EventBus::new();
        drop(bus.subscribe("count."));

        bus.publish("count.labels", json!({"count": 1}));
        assert!(bus.subscribers.lock().unwrap().is_empty());
    }

    #[test]
    fn test_entities_created_topic() {
        let bus = EventBus::new();
        let rx = bus.subscribe("photos.");

        bus.entities_created("photos", json!({"count": 1}));
        assert_eq!(rx.recv().unwrap().topic, "photos.created");
    }
}
