//! Tests for the keyboard activation gesture wired into the widget.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use huddle::{
    CLOSE_EVENT, Huddle, Key, KeyCombination, KeyEvent, KeySource, KeyboardModifiers,
    Listener, ShortcutConfig, key_channel,
};
use serde_json::json;

const WAIT: Duration = Duration::from_secs(2);

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn alt_t() -> KeyEvent {
    KeyEvent::press(Key::T, KeyboardModifiers::ALT)
}

fn listening_widget() -> (Arc<Huddle>, KeySource) {
    let (keys, key_events) = key_channel();
    let huddle = Huddle::new().unwrap();
    huddle.listen_for_shortcut(key_events).unwrap();
    (huddle, keys)
}

#[test]
fn test_double_alt_t_starts_widget() {
    let (huddle, keys) = listening_widget();

    keys.send(alt_t()).unwrap();
    keys.send(alt_t()).unwrap();

    assert!(wait_until(|| huddle.running()));
}

#[test]
fn test_second_gesture_stops_widget() {
    let (huddle, keys) = listening_widget();

    keys.send(alt_t()).unwrap();
    keys.send(alt_t()).unwrap();
    assert!(wait_until(|| huddle.running()));

    keys.send(alt_t()).unwrap();
    keys.send(alt_t()).unwrap();
    assert!(wait_until(|| !huddle.running()));
}

#[test]
fn test_interrupted_gesture_rearms() {
    let (huddle, keys) = listening_widget();
    let (closed, close_count) = {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        (
            Listener::new(move |_| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }),
            count,
        )
    };
    huddle.on(CLOSE_EVENT, &closed).unwrap();

    // Armed, disarmed by A, activated once, then left armed.
    keys.send(alt_t()).unwrap();
    keys.send(KeyEvent::press(Key::A, KeyboardModifiers::NONE))
        .unwrap();
    keys.send(alt_t()).unwrap();
    keys.send(alt_t()).unwrap();
    keys.send(alt_t()).unwrap();

    assert!(wait_until(|| huddle.running()));
    std::thread::sleep(Duration::from_millis(50));
    assert!(huddle.running());
    assert_eq!(close_count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_remove_shortcut_stops_listening() {
    let (huddle, keys) = listening_widget();

    huddle.remove_shortcut();
    assert!(!huddle.is_listening_for_shortcut());

    let _ = keys.send(alt_t());
    let _ = keys.send(alt_t());
    std::thread::sleep(Duration::from_millis(50));

    assert!(!huddle.running());
}

#[test]
fn test_remove_shortcut_is_idempotent() {
    let (huddle, _keys) = listening_widget();

    huddle.remove_shortcut();
    huddle.remove_shortcut();

    assert!(!huddle.is_listening_for_shortcut());
}

#[test]
fn test_enable_shortcut_wires_listener_on_build() {
    let (keys, key_events) = key_channel();
    let huddle = Huddle::builder()
        .config("enable_shortcut", json!(true))
        .key_events(key_events)
        .build()
        .unwrap();

    assert!(huddle.is_listening_for_shortcut());
    keys.send(alt_t()).unwrap();
    keys.send(alt_t()).unwrap();
    assert!(wait_until(|| huddle.running()));
}

#[test]
fn test_shortcut_disabled_by_default() {
    let (_keys, key_events) = key_channel();
    let huddle = Huddle::builder().key_events(key_events).build().unwrap();

    assert!(!huddle.is_listening_for_shortcut());
}

#[test]
fn test_custom_trigger() {
    let (keys, key_events) = key_channel();
    let huddle = Huddle::builder()
        .shortcut(ShortcutConfig::new(KeyCombination::ctrl(Key::H)))
        .build()
        .unwrap();
    huddle.listen_for_shortcut(key_events).unwrap();

    let ctrl_h = KeyEvent::press(Key::H, KeyboardModifiers::CTRL);
    keys.send(ctrl_h).unwrap();
    keys.send(ctrl_h).unwrap();

    assert!(wait_until(|| huddle.running()));
}

#[test]
fn test_dropping_widget_stops_listener() {
    let (huddle, keys) = listening_widget();
    drop(huddle);

    // The listener thread is gone once the widget is dropped, so the channel
    // eventually has no receiver.
    assert!(wait_until(|| keys.send(alt_t()).is_err()));
}
