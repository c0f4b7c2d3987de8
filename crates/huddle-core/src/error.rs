//! Error types for the Huddle control plane.

/// Result type alias for control-plane operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported synchronously by the event bus and the configuration store.
///
/// Every variant signals a programming error in the caller: a malformed
/// argument, a typo'd configuration key, or a write to a locked key. None of
/// them are retried or recovered from internally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An argument had the wrong shape.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The configuration key is not part of the store's closed key-set.
    #[error("Unknown configuration key '{key}'")]
    UnknownKey { key: String },

    /// The configuration key was locked with `close` and can no longer be set.
    #[error("Configuration key '{key}' is closed and cannot be changed")]
    KeyClosed { key: String },
}

impl Error {
    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create an unknown-key error.
    pub fn unknown_key(key: impl Into<String>) -> Self {
        Self::UnknownKey { key: key.into() }
    }

    /// Create a closed-key error.
    pub fn key_closed(key: impl Into<String>) -> Self {
        Self::KeyClosed { key: key.into() }
    }
}

/// Failure reported by a listener or tracker callback.
///
/// Callback failures never propagate to the caller of `emit` or `set`; they
/// are logged and, on the event bus, re-emitted as an `"error"` event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CallbackError {
    message: String,
}

impl CallbackError {
    /// Create a callback error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for CallbackError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for CallbackError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}
