//! Main Barometer struct tying the bridge and subscriptions together.

use crate::bridge::{PayloadSink, SensorBridge};
use crate::error::{BarometerError, BridgeError, Result};
use crate::subscriptions::{SubscriptionManager, WatchHandle, DEFAULT_BUFFER_SIZE};
use crate::types::{Payload, WatchId};
use crossbeam_channel::{bounded, Receiver};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Barometer configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BarometerConfig {
    /// Sampling interval pushed to the bridge (ms).
    pub interval_ms: u32,

    /// Local sea-level pressure pushed to the bridge (hPa).
    pub local_pressure_hpa: f64,

    /// Pressure low-pass factor; None keeps the driver's own default.
    pub smoothing_factor: Option<f64>,

    /// Samples the bridge may queue before dispatch drops new ones.
    pub sink_capacity: usize,

    /// Buffered events per channel watch before it is dropped.
    pub subscriber_buffer: usize,
}

impl Default for BarometerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 200,
            local_pressure_hpa: 1013.25, // standard atmosphere
            smoothing_factor: None,
            sink_capacity: 1024,
            subscriber_buffer: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl BarometerConfig {
    /// Parse a configuration from host-supplied JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: BarometerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field is usable.
    pub fn validate(&self) -> Result<()> {
        validate_pressure(self.local_pressure_hpa)?;
        if let Some(factor) = self.smoothing_factor {
            validate_smoothing_factor(factor)?;
        }
        if self.sink_capacity == 0 {
            return Err(BarometerError::InvalidArgument(
                "sink capacity must be at least 1".to_string(),
            ));
        }
        if self.subscriber_buffer == 0 {
            return Err(BarometerError::InvalidArgument(
                "subscriber buffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_pressure(hectopascals: f64) -> Result<()> {
    if !hectopascals.is_finite() || hectopascals <= 0.0 {
        return Err(BarometerError::InvalidArgument(format!(
            "local pressure must be a positive number of hPa, got {hectopascals}"
        )));
    }
    Ok(())
}

fn validate_smoothing_factor(factor: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&factor) {
        return Err(BarometerError::InvalidArgument(format!(
            "smoothing factor must be within 0..=1, got {factor}"
        )));
    }
    Ok(())
}

/// Session state guarded by the lifecycle lock.
struct Lifecycle {
    /// True iff at least one watch is registered.
    observing: bool,
    /// Host is paused; the bridge session is held down.
    suspended: bool,
    /// The bridge session was started and not stopped since.
    running: bool,
    /// Interval last pushed to the bridge.
    interval_ms: u32,
}

/// Barometer session manager.
///
/// Multiplexes the bridge's single payload stream to any number of watches
/// and keeps the native sensor running only while at least one watch exists.
///
/// - `watch` starts the bridge for the first subscriber
/// - `clear_watch` stops it when the last one leaves
/// - `stop_observing` tears everything down and restarts ids at zero
///
/// Payloads pushed by the bridge are queued and delivered by the host calling
/// one of the `dispatch` methods from its event loop.
pub struct Barometer<B: SensorBridge> {
    bridge: B,

    config: BarometerConfig,

    subscriptions: SubscriptionManager,

    /// Serializes lifecycle transitions. Never held while callbacks run.
    lifecycle: Mutex<Lifecycle>,

    /// Bridge-facing end of the payload stream.
    sink: PayloadSink,

    /// The single internal listener on the payload stream.
    receiver: Receiver<Payload>,
}

impl<B: SensorBridge> Barometer<B> {
    /// Attach to a bridge and push the configured settings to it.
    pub fn new(bridge: B, config: BarometerConfig) -> Result<Self> {
        config.validate()?;

        let (sender, receiver) = bounded(config.sink_capacity);
        let sink = PayloadSink::new(sender);
        bridge.attach(sink.clone());

        bridge
            .set_interval(config.interval_ms)
            .map_err(|e| BarometerError::bridge("set_interval", e))?;
        bridge
            .set_local_pressure(config.local_pressure_hpa)
            .map_err(|e| BarometerError::bridge("set_local_pressure", e))?;
        if let Some(factor) = config.smoothing_factor {
            bridge
                .set_smoothing_factor(factor)
                .map_err(|e| BarometerError::bridge("set_smoothing_factor", e))?;
        }

        info!(
            interval_ms = config.interval_ms,
            local_pressure_hpa = config.local_pressure_hpa,
            "barometer attached"
        );

        Ok(Self {
            bridge,
            subscriptions: SubscriptionManager::with_buffer_size(config.subscriber_buffer),
            lifecycle: Mutex::new(Lifecycle {
                observing: false,
                suspended: false,
                running: false,
                interval_ms: config.interval_ms,
            }),
            config,
            sink,
            receiver,
        })
    }

    // --- Watches ---

    /// Call `callback` with every future payload until the watch is cleared.
    ///
    /// Starts the bridge if this is the first watch. If the bridge cannot
    /// start, nothing is registered.
    pub fn watch<F>(&self, callback: F) -> Result<WatchId>
    where
        F: FnMut(&Payload) + Send + 'static,
    {
        let mut lifecycle = self.lifecycle.lock();
        self.ensure_observing(&mut lifecycle)?;
        let id = self.subscriptions.insert_callback(Box::new(callback));
        debug!(watch_id = %id, "watch added");
        Ok(id)
    }

    /// Like [`watch`](Self::watch), but payloads arrive on a bounded channel.
    pub fn watch_channel(&self) -> Result<WatchHandle> {
        let mut lifecycle = self.lifecycle.lock();
        self.ensure_observing(&mut lifecycle)?;
        let handle = self.subscriptions.insert_channel();
        debug!(watch_id = %handle.id, "channel watch added");
        Ok(handle)
    }

    /// Stop delivering payloads to `id`.
    ///
    /// Unknown or already-cleared ids are ignored. Stops the bridge when the
    /// last watch is cleared.
    pub fn clear_watch(&self, id: WatchId) {
        let mut lifecycle = self.lifecycle.lock();
        if !self.subscriptions.remove(id) {
            debug!(watch_id = %id, "clear_watch on inactive id ignored");
            return;
        }
        debug!(watch_id = %id, "watch cleared");
        self.stop_if_idle(&mut lifecycle);
    }

    /// Stop the bridge and clear every watch. Ids restart at zero.
    pub fn stop_observing(&self) {
        let mut lifecycle = self.lifecycle.lock();
        self.stop_bridge(&mut lifecycle);
        let removed = self.subscriptions.clear();
        lifecycle.observing = false;
        self.discard_pending();
        info!(removed, "barometer stopped");
    }

    /// Mark the session wanted and make sure the bridge runs.
    ///
    /// Also retries a start that failed earlier while watches already existed.
    fn ensure_observing(&self, lifecycle: &mut Lifecycle) -> Result<()> {
        let was_observing = lifecycle.observing;
        lifecycle.observing = true;
        if let Err(e) = self.start_if_owed(lifecycle) {
            lifecycle.observing = was_observing;
            return Err(e);
        }
        if !was_observing {
            info!(suspended = lifecycle.suspended, "barometer observing");
        }
        Ok(())
    }

    /// Start the bridge if watches exist, the host is active and it is down.
    fn start_if_owed(&self, lifecycle: &mut Lifecycle) -> Result<()> {
        if lifecycle.observing && !lifecycle.suspended && !lifecycle.running {
            self.bridge
                .start_observing()
                .map_err(|e| BarometerError::bridge("start_observing", e))?;
            lifecycle.running = true;
        }
        Ok(())
    }

    fn stop_if_idle(&self, lifecycle: &mut Lifecycle) {
        if !lifecycle.observing || !self.subscriptions.is_empty() {
            return;
        }
        if lifecycle.running {
            self.stop_bridge(lifecycle);
        }
        lifecycle.observing = false;
        self.discard_pending();
        info!("last watch cleared, barometer idle");
    }

    /// Stop failures are logged, not returned: the session is over either way.
    fn stop_bridge(&self, lifecycle: &mut Lifecycle) {
        if let Err(e) = self.bridge.stop_observing() {
            warn!(error = %e, "bridge failed to stop observing");
        }
        lifecycle.running = false;
    }

    fn discard_pending(&self) {
        let discarded = self.receiver.try_iter().count();
        if discarded > 0 {
            debug!(discarded, "discarded queued samples");
        }
    }

    // --- Bridge settings ---

    /// Whether this device can provide barometer updates.
    pub async fn is_supported(&self) -> Result<bool> {
        match self.bridge.is_supported().await {
            Ok(supported) => Ok(supported),
            Err(BridgeError::Unsupported) => Ok(false),
            Err(e) => Err(BarometerError::bridge("is_supported", e)),
        }
    }

    /// Set the sampling interval. A running session is restarted so the new
    /// interval applies immediately; watches are untouched. A session whose
    /// earlier start failed is started again.
    pub fn set_interval(&self, millis: u32) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        self.bridge
            .set_interval(millis)
            .map_err(|e| BarometerError::bridge("set_interval", e))?;
        lifecycle.interval_ms = millis;

        if lifecycle.observing && !lifecycle.suspended {
            if lifecycle.running {
                debug!(interval_ms = millis, "restarting bridge session");
                self.bridge
                    .stop_observing()
                    .map_err(|e| BarometerError::bridge("stop_observing", e))?;
                lifecycle.running = false;
            }
            self.start_if_owed(&mut lifecycle)?;
        }
        Ok(())
    }

    /// Set the local sea-level pressure (hPa) used for altitude.
    pub fn set_local_pressure(&self, hectopascals: f64) -> Result<()> {
        validate_pressure(hectopascals)?;
        self.bridge
            .set_local_pressure(hectopascals)
            .map_err(|e| BarometerError::bridge("set_local_pressure", e))
    }

    /// Set the pressure low-pass factor (0..=1).
    pub fn set_smoothing_factor(&self, factor: f64) -> Result<()> {
        validate_smoothing_factor(factor)?;
        self.bridge
            .set_smoothing_factor(factor)
            .map_err(|e| BarometerError::bridge("set_smoothing_factor", e))
    }

    /// Current pressure low-pass factor.
    pub async fn smoothing_factor(&self) -> Result<f64> {
        self.bridge
            .smoothing_factor()
            .await
            .map_err(|e| BarometerError::bridge("smoothing_factor", e))
    }

    // --- Host lifecycle ---

    /// Host went to the background: hold the sensor down, keep the watches.
    pub fn suspend(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.suspended {
            return;
        }
        lifecycle.suspended = true;
        if lifecycle.running {
            self.stop_bridge(&mut lifecycle);
        }
        debug!(observing = lifecycle.observing, "barometer suspended");
    }

    /// Host came back: restart the sensor if anyone is watching.
    ///
    /// Also retries a bridge start that failed while the host was active.
    /// On failure the suspended state is left as it was.
    pub fn resume(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        let was_suspended = lifecycle.suspended;
        lifecycle.suspended = false;
        if let Err(e) = self.start_if_owed(&mut lifecycle) {
            lifecycle.suspended = was_suspended;
            return Err(e);
        }
        if was_suspended {
            debug!(observing = lifecycle.observing, "barometer resumed");
        }
        Ok(())
    }

    // --- Dispatch ---

    /// Deliver one payload to every watch now. Returns how many received it.
    ///
    /// Must not be called from inside a watch callback.
    pub fn dispatch(&self, payload: &Payload) -> usize {
        let outcome = self.subscriptions.broadcast(payload);
        if !outcome.dropped.is_empty() {
            let mut lifecycle = self.lifecycle.lock();
            self.stop_if_idle(&mut lifecycle);
        }
        outcome.delivered
    }

    /// Deliver every queued payload, oldest first. Returns how many were handled.
    pub fn dispatch_pending(&self) -> usize {
        let mut handled = 0;
        while let Ok(payload) = self.receiver.try_recv() {
            self.dispatch(&payload);
            handled += 1;
        }
        handled
    }

    /// Wait up to `timeout` for the next payload and deliver it.
    ///
    /// Returns false if nothing arrived in time.
    pub fn dispatch_next(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(payload) => {
                self.dispatch(&payload);
                true
            }
            Err(_) => false,
        }
    }

    // --- Accessors ---

    /// Whether at least one watch is registered.
    pub fn is_observing(&self) -> bool {
        self.lifecycle.lock().observing
    }

    pub fn is_suspended(&self) -> bool {
        self.lifecycle.lock().suspended
    }

    /// Whether the bridge session is running right now.
    pub fn is_sampling(&self) -> bool {
        self.lifecycle.lock().running
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Active watch ids in ascending order.
    pub fn watch_ids(&self) -> Vec<WatchId> {
        self.subscriptions.ids()
    }

    pub fn interval_ms(&self) -> u32 {
        self.lifecycle.lock().interval_ms
    }

    /// Another handle on the bridge-facing end of the payload stream.
    pub fn sink(&self) -> PayloadSink {
        self.sink.clone()
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn config(&self) -> &BarometerConfig {
        &self.config
    }
}

impl<B: SensorBridge> Drop for Barometer<B> {
    fn drop(&mut self) {
        // Host destroyed: stop regardless of state, like stop_observing.
        if let Err(e) = self.bridge.stop_observing() {
            warn!(error = %e, "bridge failed to stop observing on drop");
        }
    }
}
