//! Core control-plane primitives for the Huddle collaboration widget.
//!
//! This crate provides the three stateful building blocks every other part of
//! the widget sits on:
//!
//! - **Event Bus**: publish/subscribe keyed by event name, with multi-name
//!   registration, one-shot listeners and removal by identity
//! - **Configuration Store**: a closed key-set of JSON values with trackers
//!   and per-key locking
//! - **Shortcut Detector**: a small state machine recognizing the two-press
//!   activation gesture (Alt+T, Alt+T by default)
//!
//! All three are plain instances with no global state; create them where
//! the host sets up the widget and share them by reference or `Arc`.
//!
//! # Example
//!
//! ```
//! use huddle_core::{ConfigStore, EventBus, Listener, Tracker};
//! use serde_json::json;
//!
//! let bus = EventBus::new();
//! let config = ConfigStore::default();
//!
//! bus.on("ready", &Listener::new(|_| println!("widget ready"))).unwrap();
//! config
//!     .track("dont_show_clicks", Tracker::new(|value| println!("clicks hidden: {value}")))
//!     .unwrap();
//!
//! config.set_one("dont_show_clicks", json!(true)).unwrap();
//! bus.emit("ready", &[]);
//! ```

pub mod bus;
mod callback;
pub mod config;
mod error;
pub mod keyboard;
pub mod logging;
pub mod shortcut;

pub use bus::{ERROR_EVENT, EventBus, ListenerId};
pub use callback::{CallbackResult, Listener, Tracker};
pub use config::{ConfigDefaults, ConfigStore, ConfigUpdate};
pub use error::{CallbackError, Error, Result};
pub use keyboard::{Key, KeyCombination, KeyEvent, KeyEventKind, KeyboardModifiers};
pub use shortcut::{
    GestureOutcome, GestureState, KeySource, ShortcutConfig, ShortcutDetector, ShortcutListener,
    key_channel,
};

// Re-export the value type used for event arguments and configuration.
pub use serde_json::Value;
