//! In-process publish/subscribe registry.
//!
//! Handlers are registered per event kind and called synchronously, in
//! subscription order, on the thread that emits the event.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// An event that can be routed by its kind
pub trait Event {
    type Kind: Copy + Eq + Hash + fmt::Debug;

    fn kind(&self) -> Self::Kind;
}

/// Token returned by [`EventBus::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription<K> {
    kind: K,
    id: u64,
}

impl<K: Copy> Subscription<K> {
    pub fn kind(&self) -> K {
        self.kind
    }
}

type Callback<E> = Box<dyn FnMut(&E) + Send>;

struct Handler<E> {
    id: u64,
    once: bool,
    callback: Callback<E>,
}

pub struct EventBus<E: Event> {
    handlers: HashMap<E::Kind, Vec<Handler<E>>>,
    next_id: u64,
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&E::Kind, usize> =
            self.handlers.iter().map(|(k, v)| (k, v.len())).collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

impl<E: Event> EventBus<E> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn subscribe<F>(&mut self, kind: E::Kind, callback: F) -> Subscription<E::Kind>
    where
        F: FnMut(&E) + Send + 'static,
    {
        self.register(kind, false, Box::new(callback))
    }

    /// Like [`subscribe`](Self::subscribe), but the handler is dropped after its first call
    pub fn once<F>(&mut self, kind: E::Kind, callback: F) -> Subscription<E::Kind>
    where
        F: FnMut(&E) + Send + 'static,
    {
        self.register(kind, true, Box::new(callback))
    }

    /// Returns false if the subscription was already removed
    pub fn unsubscribe(&mut self, subscription: Subscription<E::Kind>) -> bool {
        let Some(handlers) = self.handlers.get_mut(&subscription.kind) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|h| h.id != subscription.id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            self.handlers.remove(&subscription.kind);
        }
        removed
    }

    pub fn clear(&mut self, kind: E::Kind) {
        self.handlers.remove(&kind);
    }

    pub fn clear_all(&mut self) {
        self.handlers.clear();
    }

    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Delivers `event` to every handler of its kind and returns how many ran
    pub fn emit(&mut self, event: &E) -> usize {
        let kind = event.kind();
        let Some(handlers) = self.handlers.get_mut(&kind) else {
            return 0;
        };

        for handler in handlers.iter_mut() {
            (handler.callback)(event);
        }
        let delivered = handlers.len();

        handlers.retain(|h| !h.once);
        if handlers.is_empty() {
            self.handlers.remove(&kind);
        }
        delivered
    }

    fn register(&mut self, kind: E::Kind, once: bool, callback: Callback<E>) -> Subscription<E::Kind> {
        let id = self.next_id;
        self.next_id += 1;
        self.handlers.entry(kind).or_default().push(Handler { id, once, callback });
        Subscription { kind, id }
    }
}
