//! The widget object hosts interact with.
//!
//! [`Huddle`] ties together one [`EventBus`], one [`ConfigStore`] and an
//! optional shortcut listener, and tracks whether a collaboration session is
//! running. It is always handed out as `Arc<Huddle>`, built by
//! [`HuddleBuilder`].
//!
//! # Lifecycle events
//!
//! | Event               | Arguments        | When                                  |
//! |---------------------|------------------|---------------------------------------|
//! | `ready`             | none             | after [`Huddle::start`]               |
//! | `close`             | none             | after [`Huddle::stop`]                |
//! | `config-changed`    | `[key, value]`   | after each key written via `config`   |
//! | `reinitialize`      | none             | [`Huddle::reinitialize`] while running |
//! | `refresh-user-data` | none             | [`Huddle::refresh_user_data`] while running |
//!
//! # Example
//!
//! ```
//! use huddle::{Huddle, Listener};
//! use serde_json::json;
//!
//! let huddle = Huddle::builder()
//!     .config("site_name", json!("Docs"))
//!     .build()
//!     .unwrap();
//!
//! huddle.on("ready", &Listener::new(|_| println!("session started"))).unwrap();
//! assert!(!huddle.running());
//!
//! huddle.start().unwrap();
//! assert!(huddle.running());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use huddle_core::config::keys;
use huddle_core::logging::targets;
use huddle_core::{
    ConfigDefaults, ConfigStore, ConfigUpdate, Error, EventBus, KeyEvent, Listener,
    ShortcutConfig, ShortcutDetector, ShortcutListener, Tracker, Value,
};
use parking_lot::Mutex;
use serde_json::Map;

use crate::error::{HuddleError, Result};
use crate::transport::Transport;

/// Emitted once a session has started.
pub const READY_EVENT: &str = "ready";
/// Emitted once a session has stopped.
pub const CLOSE_EVENT: &str = "close";
/// Emitted for every configuration key written through the widget.
pub const CONFIG_CHANGED_EVENT: &str = "config-changed";
/// Emitted when the host asks the session to re-read the page.
pub const REINITIALIZE_EVENT: &str = "reinitialize";
/// Emitted when the host's user identity changed.
pub const REFRESH_USER_DATA_EVENT: &str = "refresh-user-data";

/// Configuration keys locked when a session starts.
pub const SESSION_LOCKED_KEYS: [&str; 4] = [
    keys::HUB_BASE,
    keys::STORAGE_PREFIX,
    keys::INCLUDE_HASH_IN_URL,
    keys::DISABLE_WEBRTC,
];

/// Prefix added to the type of every message passed to [`Huddle::send`].
pub const APP_MESSAGE_PREFIX: &str = "app.";

/// Builder for [`Huddle`].
pub struct HuddleBuilder {
    defaults: ConfigDefaults,
    initial: Map<String, Value>,
    transport: Option<Arc<dyn Transport>>,
    shortcut: ShortcutConfig,
    key_events: Option<Receiver<KeyEvent>>,
}

impl Default for HuddleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HuddleBuilder {
    /// Start from the standard widget configuration.
    pub fn new() -> Self {
        Self {
            defaults: ConfigDefaults::widget(),
            initial: Map::new(),
            transport: None,
            shortcut: ShortcutConfig::default(),
            key_events: None,
        }
    }

    /// Extend the key-set with `key`, or change an existing key's default.
    pub fn default_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(key, value);
        self
    }

    /// Set an initial value for an existing key.
    ///
    /// Unknown keys make [`build`](Self::build) fail.
    pub fn config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.initial.insert(key.into(), value.into());
        self
    }

    /// Attach the session transport used by [`Huddle::send`].
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Configure the activation gesture.
    pub fn shortcut(mut self, config: ShortcutConfig) -> Self {
        self.shortcut = config;
        self
    }

    /// Key notifications to watch when `enable_shortcut` is true.
    pub fn key_events(mut self, events: Receiver<KeyEvent>) -> Self {
        self.key_events = Some(events);
        self
    }

    /// Build the widget.
    pub fn build(self) -> Result<Arc<Huddle>> {
        let config = ConfigStore::new(self.defaults);
        config.set_many(self.initial)?;

        let shortcut_config = self.shortcut;
        let transport = self.transport;
        let huddle = Arc::new_cyclic(|weak| Huddle {
            bus: EventBus::new(),
            config,
            running: AtomicBool::new(false),
            page_loaded: Utc::now(),
            transport,
            shortcut_config,
            shortcut: Mutex::new(None),
            weak_self: weak.clone(),
        });

        if huddle.config.get(keys::ENABLE_SHORTCUT)? == Value::Bool(true) {
            match self.key_events {
                Some(events) => huddle.listen_for_shortcut(events)?,
                None => tracing::warn!(
                    target: targets::WIDGET,
                    "enable_shortcut is set but no key event source was provided"
                ),
            }
        }

        tracing::debug!(target: targets::WIDGET, version = Huddle::version(), "widget built");
        Ok(huddle)
    }
}

/// The embeddable collaboration widget.
pub struct Huddle {
    bus: EventBus,
    config: ConfigStore,
    running: AtomicBool,
    page_loaded: DateTime<Utc>,
    transport: Option<Arc<dyn Transport>>,
    shortcut_config: ShortcutConfig,
    shortcut: Mutex<Option<ShortcutListener>>,
    weak_self: Weak<Huddle>,
}

impl Huddle {
    /// Create a builder.
    pub fn builder() -> HuddleBuilder {
        HuddleBuilder::new()
    }

    /// Build a widget with the standard configuration and no transport.
    pub fn new() -> Result<Arc<Self>> {
        HuddleBuilder::new().build()
    }

    /// The build-stamped version, or `"unknown"` for unstamped builds.
    pub fn version() -> &'static str {
        option_env!("HUDDLE_VERSION").unwrap_or("unknown")
    }

    /// When the widget was created.
    pub fn page_loaded(&self) -> DateTime<Utc> {
        self.page_loaded
    }

    /// Whether a session is running.
    pub fn running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// The widget's event bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The widget's configuration store.
    pub fn config_store(&self) -> &ConfigStore {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Session lifecycle
    // -------------------------------------------------------------------------

    /// Start a session.
    ///
    /// Locks [`SESSION_LOCKED_KEYS`], marks the widget running and emits
    /// `ready`. Returns `false` if a session is already running. If a key
    /// cannot be locked the widget stays stopped.
    pub fn start(&self) -> Result<bool> {
        if self.running() {
            tracing::debug!(target: targets::WIDGET, "start ignored, already running");
            return Ok(false);
        }

        for key in SESSION_LOCKED_KEYS {
            self.config.close(key)?;
        }
        if self.running.swap(true, Ordering::AcqRel) {
            tracing::debug!(target: targets::WIDGET, "start ignored, already running");
            return Ok(false);
        }
        tracing::info!(target: targets::WIDGET, "session started");
        self.bus.emit(READY_EVENT, &[]);
        Ok(true)
    }

    /// Stop the running session and emit `close`.
    ///
    /// Returns `false` if no session was running. Keys closed by
    /// [`start`](Self::start) stay closed.
    pub fn stop(&self) -> bool {
        if !self.running.swap(false, Ordering::AcqRel) {
            return false;
        }
        tracing::info!(target: targets::WIDGET, "session stopped");
        self.bus.emit(CLOSE_EVENT, &[]);
        true
    }

    /// Start the session if stopped, stop it if running.
    pub fn toggle(&self) -> Result<()> {
        if self.running() {
            self.stop();
        } else {
            self.start()?;
        }
        Ok(())
    }

    /// Ask the running session to re-read the page.
    ///
    /// Returns `false` when no session is running.
    pub fn reinitialize(&self) -> bool {
        self.emit_if_running(REINITIALIZE_EVENT)
    }

    /// Tell the running session that the host's user identity changed.
    ///
    /// Returns `false` when no session is running.
    pub fn refresh_user_data(&self) -> bool {
        self.emit_if_running(REFRESH_USER_DATA_EVENT)
    }

    fn emit_if_running(&self, event: &str) -> bool {
        if !self.running() {
            return false;
        }
        self.bus.emit(event, &[]);
        true
    }

    /// Send an application message to every peer.
    ///
    /// `message` must be a JSON object with a string `"type"`; the type is
    /// prefixed with `app.` before the message reaches the transport.
    pub fn send(&self, message: Value) -> Result<()> {
        if !self.running() {
            return Err(HuddleError::NotRunning);
        }

        let Value::Object(mut message) = message else {
            return Err(Error::invalid_argument("messages must be JSON objects").into());
        };
        let kind = match message.get("type") {
            Some(Value::String(kind)) => format!("{APP_MESSAGE_PREFIX}{kind}"),
            _ => {
                return Err(Error::invalid_argument("messages need a string \"type\"").into());
            }
        };
        message.insert("type".to_owned(), Value::String(kind));

        let transport = self.transport.as_ref().ok_or(HuddleError::NoTransport)?;
        transport.app_send(Value::Object(message))?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Event bus
    // -------------------------------------------------------------------------

    /// See [`EventBus::on`].
    pub fn on(&self, names: &str, listener: &Listener) -> Result<()> {
        Ok(self.bus.on(names, listener)?)
    }

    /// See [`EventBus::once`].
    pub fn once(&self, names: &str, listener: &Listener) -> Result<()> {
        Ok(self.bus.once(names, listener)?)
    }

    /// See [`EventBus::off`].
    pub fn off(&self, names: &str, listener: &Listener) -> Result<()> {
        Ok(self.bus.off(names, listener)?)
    }

    /// See [`EventBus::emit`].
    pub fn emit(&self, name: &str, args: &[Value]) {
        self.bus.emit(name, args);
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    /// Set configuration from a `(key, value)` pair or a single object.
    ///
    /// Any other shape fails with [`Error::InvalidArgument`].
    pub fn config(&self, first: Value, second: Option<Value>) -> Result<()> {
        self.configure(ConfigUpdate::from_args(first, second)?)
    }

    /// Apply a configuration update and emit `config-changed` per key.
    pub fn configure(&self, update: ConfigUpdate) -> Result<()> {
        for (key, value) in self.config.apply(update)? {
            self.bus
                .emit(CONFIG_CHANGED_EVENT, &[Value::String(key), value]);
        }
        Ok(())
    }

    /// Current value of a configuration key.
    pub fn config_get(&self, key: &str) -> Result<Value> {
        Ok(self.config.get(key)?)
    }

    /// See [`ConfigStore::track`].
    pub fn track(&self, key: &str, tracker: Tracker) -> Result<Tracker> {
        Ok(self.config.track(key, tracker)?)
    }

    /// See [`ConfigStore::untrack`].
    pub fn untrack(&self, key: &str, tracker: &Tracker) -> Result<bool> {
        Ok(self.config.untrack(key, tracker)?)
    }

    /// See [`ConfigStore::close`].
    pub fn close(&self, key: &str) -> Result<()> {
        Ok(self.config.close(key)?)
    }

    // -------------------------------------------------------------------------
    // Shortcut
    // -------------------------------------------------------------------------

    /// Watch `events` for the activation gesture, toggling the session each
    /// time it is recognized.
    ///
    /// Replaces any listener installed earlier.
    pub fn listen_for_shortcut(&self, events: Receiver<KeyEvent>) -> Result<()> {
        self.remove_shortcut();

        let weak = self.weak_self.clone();
        let detector = ShortcutDetector::new(self.shortcut_config, move || {
            let Some(huddle) = weak.upgrade() else {
                return;
            };
            if let Err(err) = huddle.toggle() {
                tracing::warn!(target: targets::WIDGET, error = %err, "shortcut activation failed");
            }
        });
        let listener = detector.listen(events)?;
        *self.shortcut.lock() = Some(listener);

        tracing::debug!(
            target: targets::WIDGET,
            trigger = %self.shortcut_config.trigger,
            "listening for shortcut"
        );
        Ok(())
    }

    /// Stop watching for the activation gesture. Idempotent.
    pub fn remove_shortcut(&self) {
        let listener = self.shortcut.lock().take();
        if let Some(listener) = listener {
            listener.detach();
            tracing::debug!(target: targets::WIDGET, "shortcut removed");
        }
    }

    /// Whether a shortcut listener is installed.
    pub fn is_listening_for_shortcut(&self) -> bool {
        self.shortcut.lock().is_some()
    }
}

impl fmt::Display for Huddle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Huddle")
    }
}

impl fmt::Debug for Huddle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Huddle")
            .field("running", &self.running())
            .field("page_loaded", &self.page_loaded)
            .field("has_transport", &self.transport.is_some())
            .field("bus", &self.bus)
            .finish()
    }
}

static_assertions::assert_impl_all!(Huddle: Send, Sync);
