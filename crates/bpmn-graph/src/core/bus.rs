//! Synchronous command bus
//!
//! Components never hold references to each other. They exchange requests
//! and notifications through a [`CommandBus`] keyed by topic strings:
//!
//! - `request` has exactly one answering handler per topic and returns its
//!   reply, or `None` for unknown topics.
//! - `notify` is fire-and-forget to every listener on the topic.
//!
//! Handlers are invoked after the subscription lock is released, so a handler
//! may itself issue bus calls.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, trace, warn};

use super::error::{ModelError, Result};

/// Payload carried by requests, replies and notifications
pub type Payload = Value;

type RequestHandler = Arc<dyn Fn(Option<Payload>) -> Option<Payload> + Send + Sync>;
type Listener = Arc<dyn Fn(&Payload) + Send + Sync>;

/// Topic names forming the wire contract between components
pub mod topics {
    /// All elements (no payload) or one element by id
    pub const ELEMENT_GET: &str = "element.get";
    /// Allocate an element from a descriptor
    pub const ELEMENT_CREATE: &str = "element.create";
    /// Swap a stored element for an updated value
    pub const ELEMENT_REPLACE: &str = "element.replace";
    /// The root process
    pub const PROCESS_GET: &str = "process.get";
    /// Swap the stored process for an updated value
    pub const PROCESS_REPLACE: &str = "process.replace";
    /// Flow ids touching a node
    pub const CONNECTIONS_GET: &str = "connections.get";
    /// Attach shape and plane to an element and register it
    pub const SHAPE_CREATE: &str = "shape.create";
    /// Re-render request for a node
    pub const SHAPE_RENDER: &str = "shape.render";
    /// Build a model object such as `dc:Bounds`
    pub const MODEL_CREATE: &str = "model.create";
    /// Parse a serialized diagram
    pub const MODEL_IMPORT: &str = "model.import";
    /// Serialize the current definitions
    pub const MODEL_EXPORT: &str = "model.export";
    /// Drop keyboard state on teardown
    pub const KEY_CLEAR: &str = "key.clear";
}

#[derive(Default)]
struct Subscriptions {
    handlers: HashMap<String, RequestHandler>,
    listeners: HashMap<String, Vec<Listener>>,
}

/// Process-wide request/response and notification mediator
#[derive(Default)]
pub struct CommandBus {
    subscriptions: RwLock<Subscriptions>,
    destroyed: AtomicBool,
}

impl CommandBus {
    /// Create a new bus with no subscriptions
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new bus ready to be shared between components
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register the request handler for a topic
    ///
    /// Each topic has at most one handler. Subscribing on a destroyed bus is
    /// ignored.
    pub fn subscribe<F>(&self, topic: &str, handler: F) -> Result<()>
    where
        F: Fn(Option<Payload>) -> Option<Payload> + Send + Sync + 'static,
    {
        if self.is_destroyed() {
            debug!(topic, "Ignoring subscription on destroyed bus");
            return Ok(());
        }
        let mut subscriptions = self
            .subscriptions
            .write()
            .map_err(|_| ModelError::store("bus subscription lock poisoned"))?;
        if subscriptions.handlers.contains_key(topic) {
            return Err(ModelError::DuplicateSubscriber {
                topic: topic.to_string(),
            });
        }
        subscriptions
            .handlers
            .insert(topic.to_string(), Arc::new(handler));
        trace!(topic, "Request handler registered");
        Ok(())
    }

    /// Remove the request handler for a topic, returning whether one existed
    pub fn unsubscribe(&self, topic: &str) -> bool {
        match self.subscriptions.write() {
            Ok(mut subscriptions) => subscriptions.handlers.remove(topic).is_some(),
            Err(_) => false,
        }
    }

    /// Register a notification listener for a topic
    pub fn on<F>(&self, topic: &str, listener: F)
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        if self.is_destroyed() {
            debug!(topic, "Ignoring listener on destroyed bus");
            return;
        }
        if let Ok(mut subscriptions) = self.subscriptions.write() {
            subscriptions
                .listeners
                .entry(topic.to_string())
                .or_default()
                .push(Arc::new(listener));
            trace!(topic, "Listener registered");
        }
    }

    /// Whether a request handler is registered for a topic
    pub fn has_handler(&self, topic: &str) -> bool {
        self.subscriptions
            .read()
            .map(|s| s.handlers.contains_key(topic))
            .unwrap_or(false)
    }

    /// Issue a request and block until its handler returns
    ///
    /// Unknown topics and destroyed buses yield `None`.
    pub fn request(&self, topic: &str, payload: Option<Payload>) -> Option<Payload> {
        if self.is_destroyed() {
            trace!(topic, "Request on destroyed bus");
            return None;
        }
        let handler = match self.subscriptions.read() {
            Ok(subscriptions) => subscriptions.handlers.get(topic).cloned(),
            Err(_) => {
                warn!(topic, "Bus subscription lock poisoned");
                None
            }
        };
        match handler {
            Some(handler) => {
                trace!(topic, "Dispatching request");
                handler(payload)
            }
            None => {
                debug!(topic, "No handler for topic");
                None
            }
        }
    }

    /// Notify every listener of a topic, returning how many were reached
    pub fn notify(&self, topic: &str, payload: Payload) -> usize {
        if self.is_destroyed() {
            trace!(topic, "Notification on destroyed bus");
            return 0;
        }
        let listeners = match self.subscriptions.read() {
            Ok(subscriptions) => subscriptions
                .listeners
                .get(topic)
                .cloned()
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        };
        for listener in &listeners {
            listener(&payload);
        }
        trace!(topic, listeners = listeners.len(), "Notification delivered");
        listeners.len()
    }

    /// Release every subscription; later calls become no-ops
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        if let Ok(mut subscriptions) = self.subscriptions.write() {
            subscriptions.handlers.clear();
            subscriptions.listeners.clear();
        }
        debug!("Command bus destroyed");
    }

    /// Whether [`destroy`](Self::destroy) has been called
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for CommandBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (handlers, listeners) = self
            .subscriptions
            .read()
            .map(|s| (s.handlers.len(), s.listeners.len()))
            .unwrap_or((0, 0));
        f.debug_struct("CommandBus")
            .field("handlers", &handlers)
            .field("listener_topics", &listeners)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_request_reply() {
        let bus = CommandBus::new();
        bus.subscribe("echo", |payload| payload).unwrap();
        assert_eq!(bus.request("echo", Some(json!(42))), Some(json!(42)));
        assert_eq!(bus.request("echo", None), None);
    }

    #[test]
    fn test_unknown_topic_is_empty() {
        let bus = CommandBus::new();
        assert_eq!(bus.request("nobody.home", Some(json!({}))), None);
        assert_eq!(bus.notify("nobody.home", json!({})), 0);
    }

    #[test]
    fn test_duplicate_subscriber() {
        let bus = CommandBus::new();
        bus.subscribe("topic", |_| None).unwrap();
        let result = bus.subscribe("topic", |_| None);
        assert!(matches!(result, Err(ModelError::DuplicateSubscriber { .. })));
        assert!(bus.unsubscribe("topic"));
        assert!(bus.subscribe("topic", |_| None).is_ok());
    }

    #[test]
    fn test_notify_reaches_all_listeners() {
        let bus = CommandBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            bus.on("ping", move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(bus.notify("ping", Value::Null), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_handler_may_reenter_bus() {
        let bus = CommandBus::shared();
        bus.subscribe("inner", |_| Some(json!("inner"))).unwrap();
        let weak = Arc::downgrade(&bus);
        bus.subscribe("outer", move |_| weak.upgrade()?.request("inner", None))
            .unwrap();
        assert_eq!(bus.request("outer", None), Some(json!("inner")));
    }

    #[test]
    fn test_destroy_releases_everything() {
        let bus = CommandBus::new();
        bus.subscribe("echo", |payload| payload).unwrap();
        bus.on("ping", |_| {});
        bus.destroy();

        assert!(bus.is_destroyed());
        assert!(!bus.has_handler("echo"));
        assert_eq!(bus.request("echo", Some(json!(1))), None);
        assert_eq!(bus.notify("ping", Value::Null), 0);

        // Subscribing after teardown is silently ignored
        bus.subscribe("echo", |payload| payload).unwrap();
        assert_eq!(bus.request("echo", Some(json!(1))), None);
    }
}
