//! Error handling and edge case tests.

use barometer_watch::{
    Barometer, BarometerConfig, BarometerError, BridgeCall, BridgeError, RecordingBridge, WatchId,
};
use futures::executor::block_on;

fn test_barometer(bridge: RecordingBridge) -> Barometer<RecordingBridge> {
    let barometer = Barometer::new(bridge, BarometerConfig::default()).unwrap();
    barometer.bridge().clear_calls();
    barometer
}

// --- Lenient clears ---

#[test]
fn test_clear_unknown_id_is_noop() {
    let barometer = test_barometer(RecordingBridge::new());
    barometer.watch(|_| {}).unwrap();

    barometer.clear_watch(WatchId(42));
    barometer.clear_watch(WatchId(u64::MAX));

    assert!(barometer.is_observing());
    assert_eq!(barometer.subscriber_count(), 1);
    assert_eq!(barometer.bridge().stop_count(), 0);
}

#[test]
fn test_clear_when_idle_is_noop() {
    let barometer = test_barometer(RecordingBridge::new());

    barometer.clear_watch(WatchId(0));

    assert!(!barometer.is_observing());
    assert!(barometer.bridge().calls().is_empty());
}

#[test]
fn test_double_clear_stops_once() {
    let barometer = test_barometer(RecordingBridge::new());
    let id = barometer.watch(|_| {}).unwrap();

    barometer.clear_watch(id);
    barometer.clear_watch(id);

    assert_eq!(barometer.bridge().stop_count(), 1);
    assert!(!barometer.is_observing());
}

#[test]
fn test_clear_stale_id_after_stop() {
    let barometer = test_barometer(RecordingBridge::new());
    barometer.watch(|_| {}).unwrap();
    let stale = barometer.watch(|_| {}).unwrap();
    barometer.stop_observing();

    let fresh = barometer.watch(|_| {}).unwrap();
    barometer.clear_watch(stale);

    assert_eq!(barometer.watch_ids(), vec![fresh]);
    assert!(barometer.is_observing());
}

// --- Unsupported platform ---

#[test]
fn test_is_supported() {
    let supported = test_barometer(RecordingBridge::new());
    assert!(block_on(supported.is_supported()).unwrap());

    let unsupported = test_barometer(RecordingBridge::unsupported());
    assert!(!block_on(unsupported.is_supported()).unwrap());
}

#[test]
fn test_watch_on_unsupported_platform() {
    let barometer = test_barometer(RecordingBridge::unsupported());

    let result = barometer.watch(|_| {});

    assert!(matches!(result, Err(BarometerError::Unsupported)));
    assert!(!barometer.is_observing());
    assert_eq!(barometer.subscriber_count(), 0);
}

// --- Native failures ---

#[test]
fn test_start_failure_registers_nothing() {
    let barometer = test_barometer(RecordingBridge::new());
    barometer.bridge().set_fail_start(true);

    let result = barometer.watch_channel();
    match result {
        Err(BarometerError::Bridge { operation, source }) => {
            assert_eq!(operation, "start_observing");
            assert!(matches!(source, BridgeError::Failed(_)));
        }
        Err(e) => panic!("Expected Bridge error, got {:?}", e),
        Ok(_) => panic!("Expected Bridge error, got a watch"),
    }
    assert!(!barometer.is_observing());

    // No id was consumed by the failed attempt.
    barometer.bridge().set_fail_start(false);
    assert_eq!(barometer.watch(|_| {}).unwrap(), WatchId(0));
}

#[test]
fn test_restart_failure_keeps_watches() {
    let barometer = test_barometer(RecordingBridge::new());
    let id = barometer.watch(|_| {}).unwrap();
    barometer.bridge().set_fail_start(true);

    let result = barometer.set_interval(50);

    assert!(matches!(result, Err(BarometerError::Bridge { .. })));
    assert_eq!(barometer.watch_ids(), vec![id]);
    assert_eq!(barometer.bridge().interval_ms(), 50);
}

#[test]
fn test_failed_restart_recovers_on_resume() {
    let barometer = test_barometer(RecordingBridge::new());
    barometer.watch(|_| {}).unwrap();
    barometer.bridge().set_fail_start(true);
    assert!(barometer.set_interval(50).is_err());

    // Watches remain but the session is down.
    assert!(barometer.is_observing());
    assert!(!barometer.is_sampling());
    assert!(!barometer.bridge().is_running());

    barometer.bridge().set_fail_start(false);
    barometer.resume().unwrap();

    assert!(barometer.bridge().is_running());
    assert_eq!(barometer.is_sampling(), barometer.bridge().is_running());
    assert_eq!(barometer.bridge().start_count(), 3);
    assert_eq!(barometer.bridge().stop_count(), 1);
}

#[test]
fn test_failed_restart_recovers_on_watch() {
    let barometer = test_barometer(RecordingBridge::new());
    let first = barometer.watch(|_| {}).unwrap();
    barometer.bridge().set_fail_start(true);
    assert!(barometer.set_interval(50).is_err());

    // Still failing: the new watch is refused, the old one kept.
    assert!(barometer.watch(|_| {}).is_err());
    assert_eq!(barometer.watch_ids(), vec![first]);
    assert!(barometer.is_observing());

    barometer.bridge().set_fail_start(false);
    let second = barometer.watch(|_| {}).unwrap();

    assert_eq!(barometer.watch_ids(), vec![first, second]);
    assert!(barometer.bridge().is_running());
    assert!(barometer.is_sampling());
}

#[test]
fn test_failed_restart_recovers_on_set_interval() {
    let barometer = test_barometer(RecordingBridge::new());
    barometer.watch(|_| {}).unwrap();
    barometer.bridge().set_fail_start(true);
    assert!(barometer.set_interval(50).is_err());
    barometer.bridge().set_fail_start(false);
    barometer.bridge().clear_calls();

    barometer.set_interval(75).unwrap();

    // No stop: the session was already down.
    assert_eq!(
        barometer.bridge().calls(),
        vec![BridgeCall::SetInterval(75), BridgeCall::Start]
    );
    assert!(barometer.is_sampling());
}

#[test]
fn test_resume_failure_stays_suspended() {
    let barometer = test_barometer(RecordingBridge::new());
    barometer.watch(|_| {}).unwrap();
    barometer.suspend();
    barometer.bridge().set_fail_start(true);

    assert!(barometer.resume().is_err());
    assert!(barometer.is_suspended());

    barometer.bridge().set_fail_start(false);
    barometer.resume().unwrap();
    assert!(barometer.is_sampling());
}

// --- Argument validation ---

#[test]
fn test_invalid_local_pressure_rejected() {
    let barometer = test_barometer(RecordingBridge::new());

    for bad in [0.0, -1013.25, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            barometer.set_local_pressure(bad),
            Err(BarometerError::InvalidArgument(_))
        ));
    }
    assert!(barometer.bridge().calls().is_empty());
}

#[test]
fn test_smoothing_factor() {
    let barometer = test_barometer(RecordingBridge::new());
    assert_eq!(block_on(barometer.smoothing_factor()).unwrap(), 0.3);

    assert!(matches!(
        barometer.set_smoothing_factor(1.2),
        Err(BarometerError::InvalidArgument(_))
    ));
    barometer.set_smoothing_factor(0.8).unwrap();

    assert_eq!(barometer.bridge().calls(), vec![BridgeCall::SetSmoothingFactor(0.8)]);
    assert_eq!(block_on(barometer.smoothing_factor()).unwrap(), 0.8);
}

#[test]
fn test_invalid_config_rejected_before_bridge() {
    let bridge = RecordingBridge::new();
    let config = BarometerConfig {
        subscriber_buffer: 0,
        ..Default::default()
    };

    let result = Barometer::new(bridge, config);
    assert!(matches!(result, Err(BarometerError::InvalidArgument(_))));
}
