//! Two-press keyboard gesture that activates the widget.
//!
//! [`ShortcutDetector`] recognizes "press the trigger combination twice, with
//! no other key pressed in between" and invokes its activation callback
//! exactly once per recognized gesture. The default trigger is Alt+T.
//!
//! # State machine
//!
//! ```text
//!            trigger press                   trigger press
//!   Idle ───────────────────► ArmedOnA ──────────────────► Idle + activate
//!    ▲                          │
//!    └──── other key press ─────┘
//! ```
//!
//! - Release notifications never cause a transition.
//! - A press qualifies when it is the trigger key with every modifier the
//!   trigger requires held. Extra modifiers such as Shift do not matter.
//! - Any other press while armed disarms the detector, including a press of
//!   a bare modifier key. The near miss does not count toward a later attempt.
//! - With a bounded [`ShortcutConfig::window`], an armed state older than the
//!   window is forgotten and the next trigger press arms afresh.
//!
//! # Driving the detector
//!
//! Single-threaded hosts call [`ShortcutDetector::handle`] from their input
//! callback, or [`ShortcutDetector::pump`] to drain a channel. Hosts with a
//! dedicated input thread hand a receiver to [`ShortcutDetector::listen`] and
//! later call [`ShortcutListener::detach`].
//!
//! ```
//! use huddle_core::{Key, KeyEvent, KeyboardModifiers, ShortcutConfig, ShortcutDetector};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let started = Arc::new(AtomicUsize::new(0));
//! let counter = started.clone();
//! let mut detector = ShortcutDetector::new(ShortcutConfig::default(), move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! detector.handle(&KeyEvent::press(Key::T, KeyboardModifiers::ALT));
//! detector.handle(&KeyEvent::press(Key::T, KeyboardModifiers::ALT));
//! assert_eq!(started.load(Ordering::SeqCst), 1);
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::keyboard::{Key, KeyCombination, KeyEvent};
use crate::logging::{span_names, targets};

/// Name given to listener threads.
pub const LISTENER_THREAD_NAME: &str = "huddle-shortcut";

/// The host side of a key notification channel.
pub type KeySource = Sender<KeyEvent>;

/// Create a channel for feeding key notifications to a detector.
pub fn key_channel() -> (KeySource, Receiver<KeyEvent>) {
    crossbeam_channel::unbounded()
}

/// Configuration for a [`ShortcutDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortcutConfig {
    /// The combination that must be pressed twice.
    pub trigger: KeyCombination,
    /// Maximum time between the two presses, or `None` for no limit.
    pub window: Option<Duration>,
}

impl Default for ShortcutConfig {
    fn default() -> Self {
        Self {
            trigger: KeyCombination::alt(Key::T),
            window: None,
        }
    }
}

impl ShortcutConfig {
    /// Configuration with a custom trigger and no time limit.
    pub fn new(trigger: KeyCombination) -> Self {
        Self {
            trigger,
            window: None,
        }
    }

    /// Bound the time allowed between the two presses.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }
}

/// Current state of the gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    /// Waiting for the first trigger press.
    Idle,
    /// The first trigger press was seen.
    ArmedOnA {
        /// When the first press arrived.
        armed_at: Instant,
    },
}

/// What a single notification did to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// No transition.
    Ignored,
    /// First trigger press recorded.
    Armed,
    /// An armed gesture was disqualified.
    Disarmed,
    /// The gesture completed and the activation callback ran.
    Activated,
}

type ActivationFn = dyn Fn() + Send + Sync;

/// Recognizes the two-press activation gesture.
pub struct ShortcutDetector {
    config: ShortcutConfig,
    state: GestureState,
    on_activate: Arc<ActivationFn>,
    detached: bool,
}

impl ShortcutDetector {
    /// Create a detector that calls `on_activate` on every recognized gesture.
    pub fn new<F>(config: ShortcutConfig, on_activate: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            config,
            state: GestureState::Idle,
            on_activate: Arc::new(on_activate),
            detached: false,
        }
    }

    /// The detector's configuration.
    pub fn config(&self) -> &ShortcutConfig {
        &self.config
    }

    /// The current gesture state.
    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Whether the first trigger press has been seen.
    pub fn is_armed(&self) -> bool {
        matches!(self.state, GestureState::ArmedOnA { .. })
    }

    /// Whether [`detach`](Self::detach) has been called.
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Forget any partial gesture.
    pub fn reset(&mut self) {
        self.state = GestureState::Idle;
    }

    /// Stop reacting to input. Idempotent.
    pub fn detach(&mut self) {
        if !self.detached {
            tracing::debug!(target: targets::SHORTCUT, "shortcut detector detached");
        }
        self.detached = true;
        self.state = GestureState::Idle;
    }

    /// Feed one notification, timestamped now.
    pub fn handle(&mut self, event: &KeyEvent) -> GestureOutcome {
        self.handle_at(event, Instant::now())
    }

    /// Feed one notification with an explicit timestamp.
    pub fn handle_at(&mut self, event: &KeyEvent, now: Instant) -> GestureOutcome {
        if self.detached || !event.is_press() {
            return GestureOutcome::Ignored;
        }

        if let GestureState::ArmedOnA { armed_at } = self.state {
            let expired = self
                .config
                .window
                .is_some_and(|window| now.saturating_duration_since(armed_at) > window);
            if expired {
                tracing::trace!(target: targets::SHORTCUT, "armed gesture expired");
                self.state = GestureState::Idle;
            }
        }

        let qualifying = self.config.trigger.matches_held(event.key, event.modifiers);

        match (self.state, qualifying) {
            (GestureState::Idle, true) => {
                self.state = GestureState::ArmedOnA { armed_at: now };
                tracing::trace!(target: targets::SHORTCUT, trigger = %self.config.trigger, "armed");
                GestureOutcome::Armed
            }
            (GestureState::Idle, false) => GestureOutcome::Ignored,
            (GestureState::ArmedOnA { .. }, true) => {
                self.state = GestureState::Idle;
                tracing::debug!(target: targets::SHORTCUT, trigger = %self.config.trigger, "shortcut activated");
                (self.on_activate)();
                GestureOutcome::Activated
            }
            (GestureState::ArmedOnA { .. }, false) => {
                self.state = GestureState::Idle;
                tracing::trace!(target: targets::SHORTCUT, key = %event.key, "disarmed");
                GestureOutcome::Disarmed
            }
        }
    }

    /// Handle every notification currently queued on `events` without blocking.
    ///
    /// Returns the number of activations.
    pub fn pump(&mut self, events: &Receiver<KeyEvent>) -> usize {
        events
            .try_iter()
            .filter(|event| self.handle(event) == GestureOutcome::Activated)
            .count()
    }

    /// Move the detector onto its own thread, reading from `events`.
    ///
    /// The thread ends when the listener is detached or every sender of
    /// `events` is dropped.
    pub fn listen(self, events: Receiver<KeyEvent>) -> std::io::Result<ShortcutListener> {
        let detached = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

        let thread_detached = detached.clone();
        let handle = thread::Builder::new()
            .name(LISTENER_THREAD_NAME.to_owned())
            .spawn(move || listener_loop(self, events, stop_rx, thread_detached))?;

        Ok(ShortcutListener {
            detached,
            stop_tx,
            thread_id: handle.thread().id(),
            handle: Mutex::new(Some(handle)),
        })
    }
}

impl fmt::Debug for ShortcutDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortcutDetector")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("detached", &self.detached)
            .finish()
    }
}

fn listener_loop(
    mut detector: ShortcutDetector,
    events: Receiver<KeyEvent>,
    stop: Receiver<()>,
    detached: Arc<AtomicBool>,
) {
    let span = tracing::debug_span!(target: targets::SHORTCUT, span_names::SHORTCUT_LISTENER);
    let _enter = span.enter();
    tracing::debug!(target: targets::SHORTCUT, "shortcut listener started");

    loop {
        crossbeam_channel::select! {
            recv(events) -> event => match event {
                Ok(event) => {
                    if detached.load(Ordering::Acquire) {
                        break;
                    }
                    detector.handle(&event);
                }
                Err(_) => break,
            },
            recv(stop) -> _ => break,
        }
    }

    detector.detach();
    tracing::debug!(target: targets::SHORTCUT, "shortcut listener stopped");
}

/// A detector running on its own thread.
///
/// Dropping the listener detaches it.
pub struct ShortcutListener {
    detached: Arc<AtomicBool>,
    stop_tx: Sender<()>,
    thread_id: ThreadId,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ShortcutListener {
    /// Stop the listener thread and discard the detector's state.
    ///
    /// Once this returns no further activation happens, whatever arrives on
    /// the input channel. Idempotent. When called from inside the activation
    /// callback the thread is signalled but not joined; it exits as soon as
    /// the callback returns.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
        let _ = self.stop_tx.try_send(());

        if thread::current().id() == self.thread_id {
            return;
        }
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                tracing::warn!(target: targets::SHORTCUT, "shortcut listener thread panicked");
            }
        }
    }

    /// Whether [`detach`](Self::detach) has been called.
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }
}

impl Drop for ShortcutListener {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for ShortcutListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortcutListener")
            .field("detached", &self.is_detached())
            .finish()
    }
}

static_assertions::assert_impl_all!(ShortcutDetector: Send);
static_assertions::assert_impl_all!(ShortcutListener: Send, Sync);
