// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Publish/subscribe for coordinator events.
//!
//! Listeners subscribe per [`EventKind`] and get a [`ListenerId`] back;
//! unsubscribing with that id is idempotent. Handlers run synchronously on
//! the emitting task, outside the listener lock, so a handler may itself
//! subscribe or unsubscribe.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use cache_tiers::events::{CacheEvent, EventBus, EventKind};
//!
//! let bus = EventBus::new();
//! let misses = Arc::new(AtomicUsize::new(0));
//! let counter = misses.clone();
//! let id = bus.on(EventKind::Miss, move |_| { counter.fetch_add(1, Ordering::Relaxed); });
//!
//! bus.emit(&CacheEvent::Miss { key: "k".into(), timestamp: 0 });
//! assert!(bus.off(EventKind::Miss, id));
//! assert!(!bus.off(EventKind::Miss, id));
//! assert_eq!(misses.load(Ordering::Relaxed), 1);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::coordinator::OptimizationReport;
use crate::entry::Tier;

/// Event names, matching the `cache:*` strings used by subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Hit,
    Miss,
    Set,
    Delete,
    Promote,
    Demote,
    Evict,
    Clear,
    Optimize,
}

impl EventKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "cache:hit",
            Self::Miss => "cache:miss",
            Self::Set => "cache:set",
            Self::Delete => "cache:delete",
            Self::Promote => "cache:promote",
            Self::Demote => "cache:demote",
            Self::Evict => "cache:evict",
            Self::Clear => "cache:clear",
            Self::Optimize => "cache:optimize",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cache:hit" => Ok(Self::Hit),
            "cache:miss" => Ok(Self::Miss),
            "cache:set" => Ok(Self::Set),
            "cache:delete" => Ok(Self::Delete),
            "cache:promote" => Ok(Self::Promote),
            "cache:demote" => Ok(Self::Demote),
            "cache:evict" => Ok(Self::Evict),
            "cache:clear" => Ok(Self::Clear),
            "cache:optimize" => Ok(Self::Optimize),
            other => Err(format!("unknown cache event `{}`", other)),
        }
    }
}

/// Why an entry was removed by the coordinator rather than by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictReason {
    Expired,
    Capacity,
}

/// Payload delivered to listeners. Timestamps are epoch millis.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    Hit { key: String, tier: Tier, timestamp: u64 },
    Miss { key: String, timestamp: u64 },
    Set { key: String, tier: Tier, size_bytes: u64, timestamp: u64 },
    Delete { key: String, tier: Tier, timestamp: u64 },
    Promote { key: String, from: Tier, to: Tier, timestamp: u64 },
    Demote { key: String, from: Tier, to: Tier, timestamp: u64 },
    Evict { key: String, tier: Tier, reason: EvictReason, timestamp: u64 },
    Clear { timestamp: u64 },
    Optimize { report: OptimizationReport, timestamp: u64 },
}

impl CacheEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Hit { .. } => EventKind::Hit,
            Self::Miss { .. } => EventKind::Miss,
            Self::Set { .. } => EventKind::Set,
            Self::Delete { .. } => EventKind::Delete,
            Self::Promote { .. } => EventKind::Promote,
            Self::Demote { .. } => EventKind::Demote,
            Self::Evict { .. } => EventKind::Evict,
            Self::Clear { .. } => EventKind::Clear,
            Self::Optimize { .. } => EventKind::Optimize,
        }
    }
}

/// Handle returned by [`EventBus::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

/// Listener registry keyed by event kind.
pub struct EventBus {
    listeners: RwLock<HashMap<EventKind, Vec<(ListenerId, Handler)>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Subscribe to one kind of event.
    ///
    /// After [`close`](Self::close) the handler is dropped immediately and
    /// will never run.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if self.is_closed() {
            return id;
        }
        self.listeners
            .write()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Unsubscribe. Returns `false` if the listener was not registered.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let Some(handlers) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            listeners.remove(&kind);
        }
        removed
    }

    /// Deliver an event to its listeners, in subscription order.
    pub fn emit(&self, event: &CacheEvent) {
        if self.is_closed() {
            return;
        }
        let handlers: Vec<Handler> = match self.listeners.read().get(&event.kind()) {
            Some(handlers) => handlers.iter().map(|(_, h)| h.clone()).collect(),
            None => return,
        };
        for handler in handlers {
            handler(event);
        }
    }

    /// Number of listeners for a kind.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.read().get(&kind).map_or(0, Vec::len)
    }

    /// Drop every listener and turn `emit` into a no-op.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.listeners.write().clear();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
