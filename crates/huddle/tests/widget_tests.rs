//! Tests for the widget facade: properties, events, configuration and messaging.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use huddle::{
    ChannelTransport, CoreError, ERROR_EVENT, Huddle, HuddleError, Listener, READY_EVENT,
    SESSION_LOCKED_KEYS, Tracker, Value, keys,
};
use parking_lot::Mutex;
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn spy() -> (Listener, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let listener = Listener::new(move |_| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });
    (listener, calls)
}

fn tracker_spy() -> (Tracker, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let tracker = Tracker::new(move |value| seen_clone.lock().push(value.clone()));
    (tracker, seen)
}

// =========================================================================
// Properties
// =========================================================================

#[test]
fn test_page_loaded_not_in_future() {
    let huddle = Huddle::new().unwrap();
    assert!(huddle.page_loaded() <= Utc::now());
}

#[test]
fn test_not_running_on_load() {
    let huddle = Huddle::new().unwrap();
    assert!(!huddle.running());
}

#[test]
fn test_running_inside_ready_listener() {
    let huddle = Huddle::new().unwrap();
    let observed = Arc::new(Mutex::new(None));

    let observed_clone = observed.clone();
    let weak = Arc::downgrade(&huddle);
    huddle
        .on(
            READY_EVENT,
            &Listener::new(move |_| {
                if let Some(huddle) = weak.upgrade() {
                    *observed_clone.lock() = Some(huddle.running());
                }
            }),
        )
        .unwrap();

    huddle.start().unwrap();
    assert_eq!(*observed.lock(), Some(true));
}

#[test]
fn test_display_name() {
    let huddle = Huddle::new().unwrap();
    assert_eq!(format!("{huddle}"), "Huddle");
}

// =========================================================================
// Event handling
// =========================================================================

#[test]
fn test_on_triggers_repeatedly() {
    let huddle = Huddle::new().unwrap();
    let (callback, calls) = spy();

    huddle.on("testEvent", &callback).unwrap();
    huddle.emit("testEvent", &[]);
    huddle.emit("testEvent", &[]);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_on_multiple_events() {
    let huddle = Huddle::new().unwrap();
    let (callback, calls) = spy();

    huddle.on("testEvent secondTestEvent", &callback).unwrap();
    huddle.emit("testEvent", &[]);
    huddle.emit("secondTestEvent", &[]);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_on_rejects_blank_names() {
    let huddle = Huddle::new().unwrap();
    let (callback, _) = spy();

    let err = huddle.on("", &callback).unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::InvalidArgument(_))));
}

#[test]
fn test_once_triggers_once() {
    let huddle = Huddle::new().unwrap();
    let (callback, calls) = spy();

    huddle.once("testEvent", &callback).unwrap();
    huddle.emit("testEvent", &[]);
    huddle.emit("testEvent", &[]);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_off_removes_callback() {
    let huddle = Huddle::new().unwrap();
    let (callback, calls) = spy();

    huddle.on("testEvent", &callback).unwrap();
    huddle.emit("testEvent", &[]);
    huddle.off("testEvent", &callback).unwrap();
    huddle.emit("testEvent", &[]);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_off_multiple_events() {
    let huddle = Huddle::new().unwrap();
    let (callback, calls) = spy();

    huddle.on("testEvent secondTestEvent", &callback).unwrap();
    huddle.emit("testEvent", &[]);
    huddle.emit("secondTestEvent", &[]);
    huddle.off("testEvent secondTestEvent", &callback).unwrap();
    huddle.emit("testEvent", &[]);
    huddle.emit("secondTestEvent", &[]);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_off_one_of_several_events() {
    let huddle = Huddle::new().unwrap();
    let (callback, calls) = spy();

    huddle.on("testEvent secondTestEvent", &callback).unwrap();
    huddle.emit("testEvent", &[]);
    huddle.emit("secondTestEvent", &[]);
    huddle.off("testEvent", &callback).unwrap();
    huddle.emit("testEvent", &[]);
    huddle.emit("secondTestEvent", &[]);

    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_listener_failure_reported_as_error_event() {
    init_tracing();
    let huddle = Huddle::new().unwrap();
    let errors = Arc::new(Mutex::new(Vec::new()));

    let errors_clone = errors.clone();
    huddle
        .on(
            ERROR_EVENT,
            &Listener::new(move |args| errors_clone.lock().push(args.to_vec())),
        )
        .unwrap();
    huddle
        .on("testEvent", &Listener::fallible(|_| Err("boom".into())))
        .unwrap();
    let (after, calls) = spy();
    huddle.on("testEvent", &after).unwrap();

    huddle.emit("testEvent", &[]);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*errors.lock(), vec![vec![json!("testEvent"), json!("boom")]]);
}

// =========================================================================
// Configuration
// =========================================================================

#[test]
fn test_config_set_pair() {
    let huddle = Huddle::new().unwrap();

    huddle
        .config(json!(keys::SITE_NAME), Some(json!("testValue")))
        .unwrap();

    assert_eq!(huddle.config_get(keys::SITE_NAME).unwrap(), json!("testValue"));
}

#[test]
fn test_config_set_object() {
    let huddle = Huddle::new().unwrap();

    huddle
        .config(json!({ "site_name": "testValue", "youtube": false }), None)
        .unwrap();

    assert_eq!(huddle.config_get(keys::SITE_NAME).unwrap(), json!("testValue"));
    assert_eq!(huddle.config_get(keys::YOUTUBE).unwrap(), json!(false));
}

#[test]
fn test_config_single_non_object_argument() {
    let huddle = Huddle::new().unwrap();

    let err = huddle.config(json!("site_name"), None).unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::InvalidArgument(_))));
}

#[test]
fn test_config_unknown_key() {
    let huddle = Huddle::new().unwrap();

    let err = huddle.config(json!("testConfig"), Some(json!(1))).unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::UnknownKey { .. })));
    assert!(huddle.config_get("testConfig").is_err());
}

#[test]
fn test_track_calls_immediately() {
    let huddle = Huddle::new().unwrap();
    let (tracker, seen) = tracker_spy();

    huddle.track(keys::DONT_SHOW_CLICKS, tracker).unwrap();

    assert_eq!(*seen.lock(), vec![json!(false)]);
}

#[test]
fn test_track_called_on_change() {
    let huddle = Huddle::new().unwrap();
    let (tracker, seen) = tracker_spy();

    huddle.track(keys::DONT_SHOW_CLICKS, tracker).unwrap();
    huddle
        .config(json!(keys::DONT_SHOW_CLICKS), Some(json!(true)))
        .unwrap();

    assert_eq!(*seen.lock(), vec![json!(false), json!(true)]);
}

#[test]
fn test_track_unknown_key() {
    let huddle = Huddle::new().unwrap();
    let (tracker, seen) = tracker_spy();

    let err = huddle.track("fakeParam", tracker).unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::UnknownKey { .. })));
    assert!(seen.lock().is_empty());
}

#[test]
fn test_untrack() {
    let huddle = Huddle::new().unwrap();
    let (tracker, seen) = tracker_spy();

    let handle = huddle.track(keys::CLONE_CLICKS, tracker).unwrap();
    assert!(huddle.untrack(keys::CLONE_CLICKS, &handle).unwrap());
    huddle
        .config(json!(keys::CLONE_CLICKS), Some(json!(true)))
        .unwrap();

    assert_eq!(seen.lock().len(), 1);
}

#[test]
fn test_close_blocks_later_sets() {
    let huddle = Huddle::new().unwrap();

    huddle.close(keys::CACHE_BUST).unwrap();

    let err = huddle
        .config(json!(keys::CACHE_BUST), Some(json!(false)))
        .unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::KeyClosed { .. })));
    assert_eq!(huddle.config_get(keys::CACHE_BUST).unwrap(), json!(true));
}

#[test]
fn test_close_unknown_key() {
    let huddle = Huddle::new().unwrap();

    let err = huddle.close("fakeParam").unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::UnknownKey { .. })));
}

#[test]
fn test_start_closes_session_keys() {
    let huddle = Huddle::new().unwrap();
    huddle.start().unwrap();

    for key in SESSION_LOCKED_KEYS {
        assert!(huddle.config_store().is_closed(key).unwrap());
    }
    assert!(!huddle.config_store().is_closed(keys::SITE_NAME).unwrap());
}

// =========================================================================
// Messaging
// =========================================================================

#[test]
fn test_send_reaches_transport() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let huddle = Huddle::builder()
        .transport(ChannelTransport::new(tx))
        .build()
        .unwrap();
    huddle.start().unwrap();

    huddle
        .send(json!({ "type": "cursor", "x": 10, "y": 20 }))
        .unwrap();

    assert_eq!(
        rx.try_recv().unwrap(),
        json!({ "type": "app.cursor", "x": 10, "y": 20 })
    );
}

#[test]
fn test_send_when_stopped() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let huddle = Huddle::builder()
        .transport(ChannelTransport::new(tx))
        .build()
        .unwrap();

    assert!(matches!(
        huddle.send(json!({ "type": "cursor" })),
        Err(HuddleError::NotRunning)
    ));
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_send_after_session_channel_closed() {
    let (tx, rx) = crossbeam_channel::unbounded();
    drop(rx);
    let huddle = Huddle::builder()
        .transport(ChannelTransport::new(tx))
        .build()
        .unwrap();
    huddle.start().unwrap();

    assert!(matches!(
        huddle.send(json!({ "type": "cursor" })),
        Err(HuddleError::Transport(_))
    ));
}
