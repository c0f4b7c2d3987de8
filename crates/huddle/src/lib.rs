//! Huddle: an embeddable real-time collaboration widget.
//!
//! This crate is the host-facing side of the widget. It owns the session
//! lifecycle and wires the primitives from [`huddle_core`] together:
//!
//! - [`Huddle`] exposes `start`/`stop`/`toggle`, event registration,
//!   configuration with trackers and locking, and application messaging
//! - [`HuddleBuilder`] sets up the configuration key-set, initial values,
//!   the session [`Transport`] and the activation shortcut
//!
//! # Example
//!
//! ```
//! use huddle::{Huddle, KeyEvent, Key, KeyboardModifiers, key_channel};
//! use serde_json::json;
//!
//! let (keys, key_events) = key_channel();
//! let huddle = Huddle::builder()
//!     .config("enable_shortcut", json!(true))
//!     .key_events(key_events)
//!     .build()
//!     .unwrap();
//!
//! assert!(huddle.is_listening_for_shortcut());
//! # let _ = keys.send(KeyEvent::press(Key::T, KeyboardModifiers::ALT));
//! huddle.remove_shortcut();
//! ```

mod error;
pub mod transport;
mod widget;

pub use error::{HuddleError, Result};
pub use transport::{ChannelTransport, Transport, TransportError};
pub use widget::{
    APP_MESSAGE_PREFIX, CLOSE_EVENT, CONFIG_CHANGED_EVENT, Huddle, HuddleBuilder, READY_EVENT,
    REFRESH_USER_DATA_EVENT, REINITIALIZE_EVENT, SESSION_LOCKED_KEYS,
};

pub use huddle_core::{
    CallbackError, CallbackResult, ConfigDefaults, ConfigUpdate, ERROR_EVENT, Error as CoreError,
    Key, KeyCombination, KeyEvent, KeyEventKind, KeySource, KeyboardModifiers, Listener,
    ShortcutConfig, Tracker, Value, config::keys, key_channel,
};
