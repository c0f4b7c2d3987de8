//! The seam between the widget and the session transport.
//!
//! The widget never talks to the network itself. Whatever carries messages
//! to remote peers is injected as a [`Transport`] when the widget is built.

use crossbeam_channel::Sender;
use serde_json::Value;

/// Failure reported by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(String);

impl TransportError {
    /// Create a transport error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Delivers application messages to remote peers.
pub trait Transport: Send + Sync {
    /// Send one application message.
    ///
    /// The message is a JSON object whose `"type"` already carries the
    /// `app.` prefix.
    fn app_send(&self, message: Value) -> Result<(), TransportError>;
}

/// A transport that forwards messages into a channel.
///
/// Useful for hosts that run their session on another thread, and in tests.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    sender: Sender<Value>,
}

impl ChannelTransport {
    /// Forward messages into `sender`.
    pub fn new(sender: Sender<Value>) -> Self {
        Self { sender }
    }
}

impl Transport for ChannelTransport {
    fn app_send(&self, message: Value) -> Result<(), TransportError> {
        self.sender
            .send(message)
            .map_err(|_| TransportError::new("session channel closed"))
    }
}
