//! Event system
//!
//! Every entity, plugin and scene holds an [`EventEmitter`]. Publishing goes
//! through the scene (`Scene::publish`, `Scene::publish_entity`,
//! `Scene::publish_plugin`) so handlers can receive `&mut Scene`. The scene
//! stamps the [`EventSource`] on the way out.
//!
//! - Named events with key-value arguments (no order dependency)
//! - Handlers run synchronously, in subscription order
//! - Subscribing or unsubscribing from inside a handler is allowed

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::ecs::Scene;
use crate::foundation::collections::{EntityId, SceneId};

/// Variant for type-safe event arguments
#[derive(Debug, Clone, PartialEq)]
pub enum EventArg {
    /// Entity reference
    Entity(EntityId),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Flag
    Bool(bool),
    /// Free-form text
    Text(String),
}

/// Who published an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    /// The scene's own emitter
    Scene(SceneId),
    /// An entity's emitter
    Entity(EntityId),
    /// A plugin's emitter, identified by its type name
    Plugin(&'static str),
}

/// Event with a name, its source and key-value arguments
#[derive(Debug, Clone)]
pub struct Event {
    /// Event name handlers subscribed to
    pub name: String,
    /// Emitter the event was published on, `None` until published
    pub source: Option<EventSource>,
    args: HashMap<&'static str, EventArg>,
}

impl Event {
    /// Create a new event
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            args: HashMap::new(),
        }
    }

    /// Add an argument to the event (builder pattern)
    pub fn with_arg(mut self, key: &'static str, value: EventArg) -> Self {
        self.args.insert(key, value);
        self
    }

    /// Get an argument by key
    pub fn get_arg(&self, key: &str) -> Option<&EventArg> {
        self.args.get(key)
    }

    /// Get an entity argument if present
    pub fn get_entity(&self, key: &str) -> Option<EntityId> {
        if let Some(EventArg::Entity(id)) = self.get_arg(key) {
            Some(*id)
        } else {
            None
        }
    }

    /// Get an integer argument if present
    pub fn get_int(&self, key: &str) -> Option<i64> {
        if let Some(EventArg::Int(value)) = self.get_arg(key) {
            Some(*value)
        } else {
            None
        }
    }

    /// Get a float argument if present
    pub fn get_float(&self, key: &str) -> Option<f64> {
        if let Some(EventArg::Float(value)) = self.get_arg(key) {
            Some(*value)
        } else {
            None
        }
    }

    /// Get a text argument if present
    pub fn get_text(&self, key: &str) -> Option<&str> {
        if let Some(EventArg::Text(value)) = self.get_arg(key) {
            Some(value)
        } else {
            None
        }
    }
}

/// Event handler
///
/// Receives the scene so it can look things up, publish further events or
/// mutate the graph.
pub type Handler = Box<dyn FnMut(&mut Scene, &Event)>;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

pub(crate) type HandlerList = Vec<(SubscriptionId, Handler)>;

/// Subject half of publish/subscribe
///
/// Holds handlers by event name. Dispatch is driven by the scene, which
/// takes a handler list out for the duration of a publish and restores it
/// afterwards. A publish of an event whose list is out is queued by the
/// scene and delivered once the running dispatch finishes.
#[derive(Default)]
pub struct EventEmitter {
    handlers: HashMap<String, HandlerList>,
    /// Handlers whose list is taken out for dispatch
    in_flight: HashSet<SubscriptionId>,
    /// Unsubscribed while their list was taken out for dispatch
    cancelled: HashSet<SubscriptionId>,
    /// Events whose handler list is currently taken out
    dispatching: HashSet<String>,
}

impl EventEmitter {
    /// Create an emitter with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `event`
    pub fn subscribe<F>(&mut self, event: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: FnMut(&mut Scene, &Event) + 'static,
    {
        let id = SubscriptionId::next();
        self.handlers
            .entry(event.into())
            .or_default()
            .push((id, Box::new(handler)));
        id
    }

    /// Remove a handler; returns false if it was not subscribed here
    ///
    /// A handler removed while its event is being dispatched is skipped for
    /// the rest of that dispatch.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for list in self.handlers.values_mut() {
            if let Some(index) = list.iter().position(|(sub, _)| *sub == id) {
                drop(list.remove(index));
                return true;
            }
        }
        if self.in_flight.contains(&id) {
            self.cancelled.insert(id);
            return true;
        }
        false
    }

    /// Drop every handler
    pub fn clear(&mut self) {
        self.handlers.clear();
        self.cancelled.extend(self.in_flight.iter().copied());
    }

    /// Number of handlers subscribed to `event`
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, Vec::len)
    }

    /// Whether any handler is subscribed to `event`
    pub fn has_subscribers(&self, event: &str) -> bool {
        self.subscriber_count(event) > 0
    }

    pub(crate) fn is_cancelled(&self, id: SubscriptionId) -> bool {
        self.cancelled.contains(&id)
    }

    /// Whether `event` is being dispatched from this emitter right now
    pub fn is_dispatching(&self, event: &str) -> bool {
        self.dispatching.contains(event)
    }

    pub(crate) fn take(&mut self, event: &str) -> Option<HandlerList> {
        let list = self.handlers.remove(event)?;
        self.in_flight.extend(list.iter().map(|(id, _)| *id));
        self.dispatching.insert(event.to_string());
        Some(list)
    }

    /// Put a taken list back, in front of anything subscribed meanwhile
    pub(crate) fn restore(&mut self, event: &str, mut list: HandlerList) {
        self.dispatching.remove(event);
        for (id, _) in &list {
            self.in_flight.remove(id);
        }
        list.retain(|(id, _)| !self.cancelled.remove(id));
        if let Some(added) = self.handlers.remove(event) {
            list.extend(added);
        }
        if !list.is_empty() {
            self.handlers.insert(event.to_string(), list);
        }
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<_> = self
            .handlers
            .iter()
            .map(|(name, list)| (name.as_str(), list.len()))
            .collect();
        counts.sort_unstable();
        f.debug_struct("EventEmitter").field("handlers", &counts).finish()
    }
}
