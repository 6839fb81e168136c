//! In-memory bridge that records every call made to it.
//!
//! Used by tests and by headless hosts that feed samples from elsewhere
//! (replayed logs, simulators).

use super::{PayloadSink, SensorBridge};
use crate::error::{BridgeError, BridgeResult};
use crate::types::Payload;
use async_trait::async_trait;
use parking_lot::Mutex;

/// Default sampling interval of the native drivers (ms).
const DEFAULT_INTERVAL_MS: u32 = 200;

/// Default low-pass factor of the native drivers.
const DEFAULT_SMOOTHING_FACTOR: f64 = 0.3;

/// A call observed by [`RecordingBridge`].
#[derive(Clone, Debug, PartialEq)]
pub enum BridgeCall {
    Start,
    Stop,
    SetInterval(u32),
    SetLocalPressure(f64),
    SetSmoothingFactor(f64),
}

struct RecordingState {
    calls: Vec<BridgeCall>,
    running: bool,
    supported: bool,
    fail_start: bool,
    interval_ms: u32,
    local_pressure: Option<f64>,
    smoothing_factor: f64,
}

/// Bridge double with observable call history.
pub struct RecordingBridge {
    state: Mutex<RecordingState>,
    sink: Mutex<Option<PayloadSink>>,
}

impl RecordingBridge {
    /// A supported bridge with driver defaults.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RecordingState {
                calls: Vec::new(),
                running: false,
                supported: true,
                fail_start: false,
                interval_ms: DEFAULT_INTERVAL_MS,
                local_pressure: None,
                smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
            }),
            sink: Mutex::new(None),
        }
    }

    /// A bridge on a device without a pressure sensor.
    pub fn unsupported() -> Self {
        let bridge = Self::new();
        bridge.state.lock().supported = false;
        bridge
    }

    /// Make subsequent starts fail with a native error.
    pub fn set_fail_start(&self, fail: bool) {
        self.state.lock().fail_start = fail;
    }

    /// Push a sample into the attached sink, as the native driver would.
    ///
    /// Returns false if no sink is attached or the sample was dropped.
    pub fn emit(&self, payload: Payload) -> bool {
        match self.sink.lock().as_ref() {
            Some(sink) => sink.emit(payload),
            None => false,
        }
    }

    /// All calls in the order they were made.
    pub fn calls(&self) -> Vec<BridgeCall> {
        self.state.lock().calls.clone()
    }

    /// Forget the call history (state is kept).
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn start_count(&self) -> usize {
        self.count(|c| matches!(c, BridgeCall::Start))
    }

    pub fn stop_count(&self) -> usize {
        self.count(|c| matches!(c, BridgeCall::Stop))
    }

    /// Whether the sensor session is currently running.
    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn interval_ms(&self) -> u32 {
        self.state.lock().interval_ms
    }

    pub fn local_pressure(&self) -> Option<f64> {
        self.state.lock().local_pressure
    }

    pub fn is_attached(&self) -> bool {
        self.sink.lock().is_some()
    }

    fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&BridgeCall) -> bool,
    {
        self.state.lock().calls.iter().filter(|c| predicate(c)).count()
    }
}

impl Default for RecordingBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorBridge for RecordingBridge {
    fn attach(&self, sink: PayloadSink) {
        *self.sink.lock() = Some(sink);
    }

    fn start_observing(&self) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.calls.push(BridgeCall::Start);
        if !state.supported {
            return Err(BridgeError::Unsupported);
        }
        if state.fail_start {
            return Err(BridgeError::Failed("sensor listener registration refused".to_string()));
        }
        state.running = true;
        Ok(())
    }

    fn stop_observing(&self) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.calls.push(BridgeCall::Stop);
        state.running = false;
        Ok(())
    }

    async fn is_supported(&self) -> BridgeResult<bool> {
        Ok(self.state.lock().supported)
    }

    fn set_interval(&self, millis: u32) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.calls.push(BridgeCall::SetInterval(millis));
        state.interval_ms = millis;
        Ok(())
    }

    fn set_local_pressure(&self, hectopascals: f64) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.calls.push(BridgeCall::SetLocalPressure(hectopascals));
        state.local_pressure = Some(hectopascals);
        Ok(())
    }

    fn set_smoothing_factor(&self, factor: f64) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.calls.push(BridgeCall::SetSmoothingFactor(factor));
        state.smoothing_factor = factor;
        Ok(())
    }

    async fn smoothing_factor(&self) -> BridgeResult<f64> {
        Ok(self.state.lock().smoothing_factor)
    }
}
