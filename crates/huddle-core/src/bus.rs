//! Event bus for Huddle.
//!
//! [`EventBus`] is an in-process publish/subscribe registry keyed by event
//! name. Host code registers [`Listener`]s at setup time and application
//! logic later calls [`EventBus::emit`] to drive them.
//!
//! # Rules
//!
//! - **Multi-name registration**: `on`, `once` and `off` accept one or more
//!   names separated by single spaces. Each name gets its own record, so a
//!   `once` listener registered under two names fires once per name, and
//!   `off` on one name leaves the other registrations alone.
//! - **Ordering**: listeners run in registration order, synchronously, on
//!   the emitting thread.
//! - **No deduplication**: registering the same listener twice under the same
//!   name makes it run twice per emit. `off` removes one registration at a
//!   time, oldest first.
//! - **Snapshot dispatch**: `emit` copies the listener list before invoking
//!   anything. Listeners added during an emit first run on the next emit;
//!   listeners removed during an emit still run in the current one. `once`
//!   records leave the registry when the snapshot is taken, so a re-entrant
//!   emit cannot fire them a second time.
//! - **Failure isolation**: a listener that returns an error does not stop
//!   the remaining listeners. The failure is logged and re-emitted as
//!   [`ERROR_EVENT`] with arguments `[event-name, message]`. Failures of
//!   `"error"` listeners themselves are only logged.
//!
//! # Example
//!
//! ```
//! use huddle_core::{EventBus, Listener};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let bus = EventBus::new();
//! let calls = Arc::new(AtomicUsize::new(0));
//!
//! let counter = calls.clone();
//! let listener = Listener::new(move |_| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! bus.on("ready close", &listener).unwrap();
//! bus.emit("ready", &[]);
//! bus.emit("close", &[]);
//! assert_eq!(calls.load(Ordering::SeqCst), 2);
//! ```

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;
use slotmap::{SlotMap, new_key_type};

use crate::callback::Listener;
use crate::error::{Error, Result};
use crate::logging::{span_names, targets};

/// Name of the event that carries isolated listener failures.
pub const ERROR_EVENT: &str = "error";

new_key_type! {
    /// A unique identifier for a single listener registration.
    ///
    /// Returned by [`EventBus::connect`] and accepted by
    /// [`EventBus::disconnect`].
    pub struct ListenerId;
}

/// A single registration of a listener under one event name.
struct ListenerRecord {
    event: String,
    listener: Listener,
    once: bool,
}

#[derive(Default)]
struct Registry {
    records: SlotMap<ListenerId, ListenerRecord>,
    /// Registration order per event name. Never holds an empty list.
    by_name: HashMap<String, Vec<ListenerId>>,
}

impl Registry {
    fn insert(&mut self, event: &str, listener: Listener, once: bool) -> ListenerId {
        let id = self.records.insert(ListenerRecord {
            event: event.to_owned(),
            listener,
            once,
        });
        self.by_name.entry(event.to_owned()).or_default().push(id);
        id
    }

    fn remove(&mut self, id: ListenerId) -> Option<ListenerRecord> {
        let record = self.records.remove(id)?;
        if let Some(ids) = self.by_name.get_mut(&record.event) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_name.remove(&record.event);
            }
        }
        Some(record)
    }

    fn find(&self, event: &str, listener: &Listener) -> Option<ListenerId> {
        self.by_name.get(event)?.iter().copied().find(|id| {
            self.records
                .get(*id)
                .is_some_and(|record| record.listener.ptr_eq(listener))
        })
    }

    /// Copy the listeners for `event`, dropping `once` records as they are taken.
    fn snapshot(&mut self, event: &str) -> Vec<Listener> {
        let Some(ids) = self.by_name.get(event).cloned() else {
            return Vec::new();
        };

        let mut listeners = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(record) = self.records.get(id) else {
                continue;
            };
            let once = record.once;
            listeners.push(record.listener.clone());
            if once {
                self.remove(id);
            }
        }
        listeners
    }
}

/// A process-wide publish/subscribe registry keyed by event name.
///
/// `EventBus` is `Send + Sync`; the registry sits behind a single lock that
/// is never held while a listener runs, so listeners may freely call back
/// into the bus.
pub struct EventBus {
    registry: Mutex<Registry>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Register `listener` under every name in `names`.
    ///
    /// Fails with [`Error::InvalidArgument`] if `names` is empty or contains
    /// an empty segment (leading, trailing or doubled spaces). Nothing is
    /// registered when validation fails.
    pub fn on(&self, names: &str, listener: &Listener) -> Result<()> {
        self.register(names, listener, false)
    }

    /// Register `listener` under every name in `names`, removing each
    /// registration after its first invocation.
    pub fn once(&self, names: &str, listener: &Listener) -> Result<()> {
        self.register(names, listener, true)
    }

    /// Remove one registration of `listener` under every name in `names`.
    ///
    /// Names under which `listener` is not registered are skipped.
    pub fn off(&self, names: &str, listener: &Listener) -> Result<()> {
        let names = parse_names(names)?;
        let mut registry = self.registry.lock();
        for name in names {
            if let Some(id) = registry.find(name, listener) {
                registry.remove(id);
                tracing::trace!(target: targets::BUS, event = name, "listener removed");
            }
        }
        Ok(())
    }

    /// Register `listener` under a single event name and return a handle
    /// for [`disconnect`](Self::disconnect).
    pub fn connect(&self, name: &str, listener: Listener) -> Result<ListenerId> {
        let names = parse_names(name)?;
        if names.len() != 1 {
            return Err(Error::invalid_argument(format!(
                "connect expects a single event name, got '{name}'"
            )));
        }
        Ok(self.registry.lock().insert(name, listener, false))
    }

    /// Remove the registration identified by `id`.
    ///
    /// Returns `true` if the registration was still present.
    pub fn disconnect(&self, id: ListenerId) -> bool {
        self.registry.lock().remove(id).is_some()
    }

    /// Number of registrations currently held for `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.registry
            .lock()
            .by_name
            .get(name)
            .map_or(0, Vec::len)
    }

    /// Names that currently have at least one listener.
    pub fn event_names(&self) -> Vec<String> {
        self.registry.lock().by_name.keys().cloned().collect()
    }

    /// Remove every registration.
    pub fn clear(&self) {
        let mut registry = self.registry.lock();
        registry.records.clear();
        registry.by_name.clear();
    }

    /// Invoke every listener registered for `name`, in registration order.
    ///
    /// Listener failures are isolated; see the module documentation.
    pub fn emit(&self, name: &str, args: &[Value]) {
        let span = tracing::trace_span!(target: targets::BUS, span_names::EMIT, event = name);
        let _enter = span.enter();

        let listeners = self.registry.lock().snapshot(name);
        tracing::trace!(
            target: targets::BUS,
            listener_count = listeners.len(),
            "emitting event"
        );

        for listener in listeners {
            if let Err(err) = listener.call(args) {
                tracing::warn!(
                    target: targets::BUS,
                    event = name,
                    error = %err,
                    "listener failed"
                );
                if name != ERROR_EVENT {
                    self.emit(
                        ERROR_EVENT,
                        &[Value::from(name), Value::from(err.message())],
                    );
                }
            }
        }
    }

    fn register(&self, names: &str, listener: &Listener, once: bool) -> Result<()> {
        let names = parse_names(names)?;
        let mut registry = self.registry.lock();
        for name in names {
            registry.insert(name, listener.clone(), once);
            tracing::trace!(target: targets::BUS, event = name, once, "listener registered");
        }
        Ok(())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.lock();
        f.debug_struct("EventBus")
            .field("events", &registry.by_name.len())
            .field("listeners", &registry.records.len())
            .finish()
    }
}

static_assertions::assert_impl_all!(EventBus: Send, Sync);

/// Split a space-separated list of event names.
fn parse_names(names: &str) -> Result<Vec<&str>> {
    if names.is_empty() {
        return Err(Error::invalid_argument("event name list is empty"));
    }
    let parsed: Vec<&str> = names.split(' ').collect();
    if parsed.iter().any(|name| name.is_empty()) {
        return Err(Error::invalid_argument(format!(
            "event names must be separated by single spaces: '{names}'"
        )));
    }
    Ok(parsed)
}
