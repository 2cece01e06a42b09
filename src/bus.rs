//! Typed publish/subscribe bus for normalized keyboard output
//!
//! Every publication belongs to exactly one [`Topic`] and carries the
//! payload type fixed for that topic by [`BusEvent`]. Delivery is
//! synchronous, in subscription order, with no persistence.

use crate::keyboard::LogicalKeyEvent;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Kinds of events carried by the bus
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// A key classified as a typing character
    Typing,
    /// Raw keydown passthrough
    KeyDown,
    /// Raw keyup passthrough
    KeyUp,
    /// A named shortcut action
    Shortcut(String),
}

impl Topic {
    pub fn shortcut(action: impl Into<String>) -> Self {
        Self::Shortcut(action.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Typing => "typing",
            Self::KeyDown => "keydown",
            Self::KeyUp => "keyup",
            Self::Shortcut(action) => action,
        }
    }
}

/// A publication and its payload
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    Typing(LogicalKeyEvent),
    KeyDown(LogicalKeyEvent),
    KeyUp(LogicalKeyEvent),
    Shortcut { action: String, event: LogicalKeyEvent },
}

impl BusEvent {
    pub fn topic(&self) -> Topic {
        match self {
            Self::Typing(_) => Topic::Typing,
            Self::KeyDown(_) => Topic::KeyDown,
            Self::KeyUp(_) => Topic::KeyUp,
            Self::Shortcut { action, .. } => Topic::Shortcut(action.clone()),
        }
    }

    /// The key event behind the publication
    pub fn key_event(&self) -> &LogicalKeyEvent {
        match self {
            Self::Typing(event) | Self::KeyDown(event) | Self::KeyUp(event) => event,
            Self::Shortcut { event, .. } => event,
        }
    }
}

/// Identifies a subscription for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Subscriber callback
pub type BusHandler = Rc<dyn Fn(&BusEvent)>;

/// Observer registry keyed by [`Topic`]
#[derive(Default)]
pub struct EventBus {
    handlers: RefCell<HashMap<Topic, Vec<(SubscriptionId, BusHandler)>>>,
    /// Called for every publication, after the topic's subscribers
    observers: RefCell<Vec<(SubscriptionId, BusHandler)>>,
    next_id: Cell<u64>,
    published: Cell<u64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `topic`
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&BusEvent) + 'static,
    {
        let id = self.next_subscription();
        self.handlers
            .borrow_mut()
            .entry(topic)
            .or_default()
            .push((id, Rc::new(handler)));
        id
    }

    /// Observe every publication regardless of topic
    pub fn observe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&BusEvent) + 'static,
    {
        let id = self.next_subscription();
        self.observers.borrow_mut().push((id, Rc::new(handler)));
        id
    }

    pub fn unobserve(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        observers.len() != before
    }

    fn next_subscription(&self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        id
    }

    /// Remove a subscription. Returns false if it was not registered.
    pub fn unsubscribe(&self, topic: &Topic, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let Some(list) = handlers.get_mut(topic) else {
            return false;
        };
        let before = list.len();
        list.retain(|(handler_id, _)| *handler_id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(topic);
        }
        removed
    }

    /// Deliver `event` to every current subscriber of its topic.
    ///
    /// Handlers may subscribe or unsubscribe while being called; changes take
    /// effect from the next publication.
    pub fn publish(&self, event: BusEvent) {
        let topic = event.topic();
        let mut snapshot: Vec<BusHandler> = self
            .handlers
            .borrow()
            .get(&topic)
            .map(|list| list.iter().map(|(_, handler)| Rc::clone(handler)).collect())
            .unwrap_or_default();
        snapshot.extend(self.observers.borrow().iter().map(|(_, handler)| Rc::clone(handler)));

        self.published.set(self.published.get() + 1);
        log::trace!("publish {} to {} subscriber(s)", topic.name(), snapshot.len());
        for handler in snapshot {
            handler(&event);
        }
    }

    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.handlers.borrow().get(topic).map_or(0, Vec::len)
    }

    /// Total publications since creation
    pub fn published_count(&self) -> u64 {
        self.published.get()
    }
}
