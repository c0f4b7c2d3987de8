//! Logging facilities for Huddle.
//!
//! Huddle uses the `tracing` crate for instrumentation. Nothing is printed
//! unless the host installs a subscriber:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("huddle_core::bus=trace,huddle_core::config=debug")
//!     .init();
//! ```
//!
//! Listener and tracker failures are always reported at `warn` level on the
//! target of the subsystem that isolated them.

/// Span names used throughout Huddle for tracing.
pub mod span_names {
    /// Event bus emission span.
    pub const EMIT: &str = "huddle::emit";
    /// Configuration change span.
    pub const CONFIG_SET: &str = "huddle::config_set";
    /// Shortcut listener thread span.
    pub const SHORTCUT_LISTENER: &str = "huddle::shortcut_listener";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Event bus target.
    pub const BUS: &str = "huddle_core::bus";
    /// Configuration store target.
    pub const CONFIG: &str = "huddle_core::config";
    /// Shortcut detector target.
    pub const SHORTCUT: &str = "huddle_core::shortcut";
    /// Widget facade target.
    pub const WIDGET: &str = "huddle::widget";
}
