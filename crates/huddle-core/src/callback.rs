//! Callback handles shared by the event bus and the configuration store.
//!
//! A [`Listener`] receives the arguments passed to `emit`; a [`Tracker`]
//! receives the new value of a configuration key. Both are cheap to clone and
//! compare by identity: two handles are "the same callback" exactly when one
//! was cloned from the other. That identity is what `off` and `untrack` match
//! against, so keep the handle you registered if you intend to remove it.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::CallbackError;

/// Outcome of a single callback invocation.
pub type CallbackResult = std::result::Result<(), CallbackError>;

type ListenerFn = dyn Fn(&[Value]) -> CallbackResult + Send + Sync;
type TrackerFn = dyn Fn(&Value) -> CallbackResult + Send + Sync;

/// An event bus callback.
///
/// # Example
///
/// ```
/// use huddle_core::{EventBus, Listener};
///
/// let bus = EventBus::new();
/// let listener = Listener::new(|args| println!("ready: {args:?}"));
/// bus.on("ready", &listener).unwrap();
/// bus.emit("ready", &[]);
/// bus.off("ready", &listener).unwrap();
/// ```
#[derive(Clone)]
pub struct Listener {
    func: Arc<ListenerFn>,
}

impl Listener {
    /// Wrap an infallible closure.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        Self::fallible(move |args| {
            func(args);
            Ok(())
        })
    }

    /// Wrap a closure that may report a failure.
    ///
    /// A failure does not stop delivery to the remaining listeners.
    pub fn fallible<F>(func: F) -> Self
    where
        F: Fn(&[Value]) -> CallbackResult + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// Invoke the callback.
    pub fn call(&self, args: &[Value]) -> CallbackResult {
        (self.func)(args)
    }

    /// Whether both handles refer to the same registered callback.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("ptr", &Arc::as_ptr(&self.func).cast::<()>())
            .finish()
    }
}

/// A configuration tracker callback.
#[derive(Clone)]
pub struct Tracker {
    func: Arc<TrackerFn>,
}

impl Tracker {
    /// Wrap an infallible closure.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        Self::fallible(move |value| {
            func(value);
            Ok(())
        })
    }

    /// Wrap a closure that may report a failure.
    pub fn fallible<F>(func: F) -> Self
    where
        F: Fn(&Value) -> CallbackResult + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// Invoke the callback.
    pub fn call(&self, value: &Value) -> CallbackResult {
        (self.func)(value)
    }

    /// Whether both handles refer to the same registered callback.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("ptr", &Arc::as_ptr(&self.func).cast::<()>())
            .finish()
    }
}

static_assertions::assert_impl_all!(Listener: Send, Sync, Clone);
static_assertions::assert_impl_all!(Tracker: Send, Sync, Clone);
