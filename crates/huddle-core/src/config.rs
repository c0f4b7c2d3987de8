//! Validated configuration store with change tracking and key locking.
//!
//! [`ConfigStore`] holds the widget's configuration as JSON values over a
//! closed key-set fixed at construction by [`ConfigDefaults`]. Reading,
//! writing, tracking or closing any other key fails with
//! [`Error::UnknownKey`], so a typo'd option name is reported at the call
//! site instead of silently creating configuration nothing reads.
//!
//! # Trackers
//!
//! [`ConfigStore::track`] attaches a [`Tracker`] to a key. The tracker runs
//! once immediately with the current value, then again after every `set` of
//! that key, whether or not the value changed. Trackers run synchronously on
//! the setting thread with the store unlocked, in registration order.
//!
//! # Closing keys
//!
//! [`ConfigStore::close`] locks a key for the rest of the store's life. Any
//! later `set` of that key fails with [`Error::KeyClosed`]. The store does
//! not decide when to close keys; the widget closes its session-relevant
//! keys when it starts.
//!
//! # Example
//!
//! ```
//! use huddle_core::{ConfigDefaults, ConfigStore, Error, Tracker};
//! use serde_json::json;
//!
//! let store = ConfigStore::new(ConfigDefaults::new().with("dont_show_clicks", false));
//!
//! let tracker = store
//!     .track("dont_show_clicks", Tracker::new(|value| println!("now {value}")))
//!     .unwrap();
//! store.set_one("dont_show_clicks", json!(true)).unwrap();
//! assert_eq!(store.get("dont_show_clicks").unwrap(), json!(true));
//!
//! store.close("dont_show_clicks").unwrap();
//! assert!(matches!(
//!     store.set_one("dont_show_clicks", json!(false)),
//!     Err(Error::KeyClosed { .. })
//! ));
//! # let _ = tracker;
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use parking_lot::RwLock;
use serde_json::{Map, Value, json};

use crate::callback::Tracker;
use crate::error::{Error, Result};
use crate::logging::{span_names, targets};

/// Keys of the standard widget configuration.
pub mod keys {
    /// Hide click indicators from other participants.
    pub const DONT_SHOW_CLICKS: &str = "dont_show_clicks";
    /// Replay clicks from other participants locally.
    pub const CLONE_CLICKS: &str = "clone_clicks";
    /// Report usage analytics.
    pub const ENABLE_ANALYTICS: &str = "enable_analytics";
    /// Base URL of the message hub.
    pub const HUB_BASE: &str = "hub_base";
    /// Base URL the widget's assets are served from.
    pub const BASE_URL: &str = "base_url";
    /// Human-readable name of the hosting site.
    pub const SITE_NAME: &str = "site_name";
    /// Name the widget presents itself under.
    pub const TOOL_NAME: &str = "tool_name";
    /// Install the keyboard activation gesture.
    pub const ENABLE_SHORTCUT: &str = "enable_shortcut";
    /// Start automatically when a session is already in progress.
    pub const AUTO_START: &str = "auto_start";
    /// Join without asking for confirmation.
    pub const SUPPRESS_JOIN_CONFIRMATION: &str = "suppress_join_confirmation";
    /// Do not show the invite dialog on start.
    pub const SUPPRESS_INVITE: &str = "suppress_invite";
    /// Prefix for locally stored session data.
    pub const STORAGE_PREFIX: &str = "storage_prefix";
    /// Treat URLs differing only in their fragment as different pages.
    pub const INCLUDE_HASH_IN_URL: &str = "include_hash_in_url";
    /// Disable peer-to-peer audio.
    pub const DISABLE_WEBRTC: &str = "disable_webrtc";
    /// Synchronize embedded video players.
    pub const YOUTUBE: &str = "youtube";
    /// Message types that are not logged.
    pub const IGNORE_MESSAGES: &str = "ignore_messages";
    /// Form selectors that are never synchronized.
    pub const IGNORE_FORMS: &str = "ignore_forms";
    /// Interface language, or null to detect.
    pub const LANG: &str = "lang";
    /// Language used when detection fails.
    pub const FALLBACK_LANG: &str = "fallback_lang";
    /// Append a cache-busting token to asset URLs.
    pub const CACHE_BUST: &str = "cache_bust";
}

/// The closed key-set of a [`ConfigStore`] and each key's initial value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDefaults {
    values: BTreeMap<String, Value>,
}

impl ConfigDefaults {
    /// An empty key-set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard widget configuration.
    pub fn widget() -> Self {
        Self::new()
            .with(keys::DONT_SHOW_CLICKS, false)
            .with(keys::CLONE_CLICKS, false)
            .with(keys::ENABLE_ANALYTICS, false)
            .with(keys::HUB_BASE, Value::Null)
            .with(keys::BASE_URL, Value::Null)
            .with(keys::SITE_NAME, Value::Null)
            .with(keys::TOOL_NAME, Value::Null)
            .with(keys::ENABLE_SHORTCUT, false)
            .with(keys::AUTO_START, false)
            .with(keys::SUPPRESS_JOIN_CONFIRMATION, false)
            .with(keys::SUPPRESS_INVITE, false)
            .with(keys::STORAGE_PREFIX, "huddle")
            .with(keys::INCLUDE_HASH_IN_URL, false)
            .with(keys::DISABLE_WEBRTC, false)
            .with(keys::YOUTUBE, true)
            .with(
                keys::IGNORE_MESSAGES,
                json!(["cursor-update", "keydown", "scroll-update"]),
            )
            .with(keys::IGNORE_FORMS, json!([":password"]))
            .with(keys::LANG, Value::Null)
            .with(keys::FALLBACK_LANG, "en-US")
            .with(keys::CACHE_BUST, true)
    }

    /// Add or replace a key, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add or replace a key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Whether `key` belongs to the key-set.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Default value of `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// All keys, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the key-set is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ConfigDefaults {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// A write request for [`ConfigStore::apply`].
///
/// Mirrors the two accepted call shapes: a single `(key, value)` pair, or a
/// mapping of keys to values.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigUpdate {
    /// Set one key.
    One {
        /// The key to set.
        key: String,
        /// The new value.
        value: Value,
    },
    /// Set every key of the mapping.
    Many(Map<String, Value>),
}

impl ConfigUpdate {
    /// A single-key update.
    pub fn one(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::One {
            key: key.into(),
            value: value.into(),
        }
    }

    /// A multi-key update.
    pub fn many(values: Map<String, Value>) -> Self {
        Self::Many(values)
    }

    /// Interpret a dynamically shaped call: `(key, value)` or `(object)`.
    ///
    /// Any other shape, including a key without a value, fails with
    /// [`Error::InvalidArgument`].
    pub fn from_args(first: Value, second: Option<Value>) -> Result<Self> {
        match (first, second) {
            (Value::String(key), Some(value)) => Ok(Self::One { key, value }),
            (Value::Object(values), None) => Ok(Self::Many(values)),
            (Value::String(key), None) => Err(Error::invalid_argument(format!(
                "configuration key '{key}' given without a value"
            ))),
            (Value::Object(_), Some(_)) => Err(Error::invalid_argument(
                "a configuration object takes no separate value",
            )),
            (other, _) => Err(Error::invalid_argument(format!(
                "expected a configuration key or object, got {other}"
            ))),
        }
    }

    fn into_entries(self) -> Vec<(String, Value)> {
        match self {
            Self::One { key, value } => vec![(key, value)],
            Self::Many(values) => values.into_iter().collect(),
        }
    }
}

#[derive(Default)]
struct StoreState {
    values: HashMap<String, Value>,
    trackers: HashMap<String, Vec<Tracker>>,
    closed: HashSet<String>,
}

/// A validated key/value store with trackers and per-key locking.
///
/// `ConfigStore` is `Send + Sync`; all state sits behind one lock that is
/// released before any tracker runs.
pub struct ConfigStore {
    defaults: ConfigDefaults,
    state: RwLock<StoreState>,
}

impl ConfigStore {
    /// Create a store whose key-set and initial values are `defaults`.
    pub fn new(defaults: ConfigDefaults) -> Self {
        let values = defaults
            .values
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self {
            defaults,
            state: RwLock::new(StoreState {
                values,
                ..Default::default()
            }),
        }
    }

    /// The key-set and default values this store was created with.
    pub fn defaults(&self) -> &ConfigDefaults {
        &self.defaults
    }

    /// All keys accepted by this store.
    pub fn keys(&self) -> Vec<&str> {
        self.defaults.keys().collect()
    }

    /// Current value of `key`.
    pub fn get(&self, key: &str) -> Result<Value> {
        self.check_key(key)?;
        Ok(self
            .state
            .read()
            .values
            .get(key)
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Current values of every key.
    pub fn snapshot(&self) -> Map<String, Value> {
        let state = self.state.read();
        self.defaults
            .keys()
            .map(|key| {
                let value = state.values.get(key).cloned().unwrap_or(Value::Null);
                (key.to_owned(), value)
            })
            .collect()
    }

    /// Set a single key.
    pub fn set_one(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        self.apply(ConfigUpdate::one(key, value)).map(|_| ())
    }

    /// Set every key of `values`.
    ///
    /// All keys are validated before any is written: if one key is unknown
    /// or closed, nothing changes.
    pub fn set_many(&self, values: Map<String, Value>) -> Result<()> {
        self.apply(ConfigUpdate::many(values)).map(|_| ())
    }

    /// Apply an update and return the entries written, in order.
    ///
    /// Validation is all-or-nothing. Every value is stored before the first
    /// tracker runs, so trackers observe the whole batch.
    pub fn apply(&self, update: ConfigUpdate) -> Result<Vec<(String, Value)>> {
        let span = tracing::trace_span!(target: targets::CONFIG, span_names::CONFIG_SET);
        let _enter = span.enter();

        let entries = update.into_entries();
        let notifications = {
            let mut state = self.state.write();

            for (key, _) in &entries {
                self.check_key(key)?;
                if state.closed.contains(key) {
                    return Err(Error::key_closed(key.as_str()));
                }
            }

            let mut notifications = Vec::with_capacity(entries.len());
            for (key, value) in &entries {
                state.values.insert(key.clone(), value.clone());
                let trackers = state.trackers.get(key).cloned().unwrap_or_default();
                notifications.push((key.as_str(), value, trackers));
            }
            notifications
        };

        for (key, value, trackers) in notifications {
            tracing::debug!(target: targets::CONFIG, key, %value, "configuration set");
            for tracker in trackers {
                run_tracker(key, &tracker, value);
            }
        }

        Ok(entries)
    }

    /// Attach `tracker` to `key`, call it once with the current value, and
    /// hand the same tracker back.
    pub fn track(&self, key: &str, tracker: Tracker) -> Result<Tracker> {
        self.check_key(key)?;

        let current = {
            let mut state = self.state.write();
            state
                .trackers
                .entry(key.to_owned())
                .or_default()
                .push(tracker.clone());
            state.values.get(key).cloned().unwrap_or(Value::Null)
        };
        tracing::trace!(target: targets::CONFIG, key, "tracker attached");

        run_tracker(key, &tracker, &current);
        Ok(tracker)
    }

    /// Detach one registration of `tracker` from `key`.
    ///
    /// Returns `true` if a registration was removed.
    pub fn untrack(&self, key: &str, tracker: &Tracker) -> Result<bool> {
        self.check_key(key)?;

        let mut state = self.state.write();
        let Some(trackers) = state.trackers.get_mut(key) else {
            return Ok(false);
        };
        let Some(index) = trackers.iter().position(|t| t.ptr_eq(tracker)) else {
            return Ok(false);
        };
        trackers.remove(index);
        if trackers.is_empty() {
            state.trackers.remove(key);
        }
        Ok(true)
    }

    /// Number of trackers attached to `key`.
    pub fn tracker_count(&self, key: &str) -> Result<usize> {
        self.check_key(key)?;
        Ok(self.state.read().trackers.get(key).map_or(0, Vec::len))
    }

    /// Lock `key` against further writes. Idempotent.
    pub fn close(&self, key: &str) -> Result<()> {
        self.check_key(key)?;
        if self.state.write().closed.insert(key.to_owned()) {
            tracing::debug!(target: targets::CONFIG, key, "configuration key closed");
        }
        Ok(())
    }

    /// Whether `key` has been closed.
    pub fn is_closed(&self, key: &str) -> Result<bool> {
        self.check_key(key)?;
        Ok(self.state.read().closed.contains(key))
    }

    fn check_key(&self, key: &str) -> Result<()> {
        if self.defaults.contains(key) {
            Ok(())
        } else {
            Err(Error::unknown_key(key))
        }
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(ConfigDefaults::widget())
    }
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("ConfigStore")
            .field("values", &state.values)
            .field("closed", &state.closed)
            .finish()
    }
}

static_assertions::assert_impl_all!(ConfigStore: Send, Sync);

fn run_tracker(key: &str, tracker: &Tracker, value: &Value) {
    if let Err(err) = tracker.call(value) {
        tracing::warn!(target: targets::CONFIG, key, error = %err, "tracker failed");
    }
}
