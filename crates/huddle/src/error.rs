//! Error types for the widget facade.

use crate::transport::TransportError;

/// Result type alias for widget operations.
pub type Result<T> = std::result::Result<T, HuddleError>;

/// Errors that can occur while driving the widget.
#[derive(Debug, thiserror::Error)]
pub enum HuddleError {
    /// An event bus or configuration contract was violated.
    #[error(transparent)]
    Core(#[from] huddle_core::Error),

    /// The operation needs a running session.
    #[error("Huddle is not running")]
    NotRunning,

    /// `send` was called but no transport was attached.
    #[error("No transport attached")]
    NoTransport,

    /// The transport refused the message.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The shortcut listener thread could not be started.
    #[error("Failed to start shortcut listener: {0}")]
    Spawn(#[from] std::io::Error),
}

impl HuddleError {
    /// The underlying control-plane error, if any.
    pub fn as_core(&self) -> Option<&huddle_core::Error> {
        match self {
            Self::Core(err) => Some(err),
            _ => None,
        }
    }
}
