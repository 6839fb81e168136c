//! Seam to the native sensor driver.
//!
//! A [`SensorBridge`] owns the physical sensor session. The manager calls its
//! lifecycle methods and hands it a [`PayloadSink`] once, at construction. The
//! bridge pushes every produced sample into that sink (the
//! [`BAROMETER_UPDATE_EVENT`](crate::types::BAROMETER_UPDATE_EVENT) stream),
//! from whatever thread its driver runs on.
//!
//! # Example
//!
//! ```ignore
//! struct AndroidBridge { /* JNI handles */ }
//!
//! #[async_trait]
//! impl SensorBridge for AndroidBridge {
//!     fn attach(&self, sink: PayloadSink) { self.listener.set(sink); }
//!     fn start_observing(&self) -> BridgeResult<()> { /* register listener */ }
//!     // ...
//! }
//! ```

mod recording;

pub use recording::{BridgeCall, RecordingBridge};

use crate::error::BridgeResult;
use crate::types::{Payload, BAROMETER_UPDATE_EVENT};
use async_trait::async_trait;
use crossbeam_channel::{Sender, TrySendError};
use std::sync::Arc;

/// Native capability providing raw barometric samples and lifecycle control.
#[async_trait]
pub trait SensorBridge: Send + Sync {
    /// Receive the sending end of the shared event stream.
    fn attach(&self, sink: PayloadSink);

    /// Start the sensor session. Must be idempotent.
    fn start_observing(&self) -> BridgeResult<()>;

    /// Stop the sensor session. Must be idempotent.
    fn stop_observing(&self) -> BridgeResult<()>;

    /// Whether this device can provide barometric updates.
    async fn is_supported(&self) -> BridgeResult<bool>;

    /// Set the sampling cadence. Takes effect on the next start.
    fn set_interval(&self, millis: u32) -> BridgeResult<()>;

    /// Set the local sea-level pressure (hPa) used for `altitude`.
    fn set_local_pressure(&self, hectopascals: f64) -> BridgeResult<()>;

    /// Set the low-pass filter factor applied to raw pressure.
    fn set_smoothing_factor(&self, factor: f64) -> BridgeResult<()>;

    /// Current low-pass filter factor.
    async fn smoothing_factor(&self) -> BridgeResult<f64>;
}

#[async_trait]
impl<T: SensorBridge + ?Sized> SensorBridge for Arc<T> {
    fn attach(&self, sink: PayloadSink) {
        (**self).attach(sink)
    }

    fn start_observing(&self) -> BridgeResult<()> {
        (**self).start_observing()
    }

    fn stop_observing(&self) -> BridgeResult<()> {
        (**self).stop_observing()
    }

    async fn is_supported(&self) -> BridgeResult<bool> {
        (**self).is_supported().await
    }

    fn set_interval(&self, millis: u32) -> BridgeResult<()> {
        (**self).set_interval(millis)
    }

    fn set_local_pressure(&self, hectopascals: f64) -> BridgeResult<()> {
        (**self).set_local_pressure(hectopascals)
    }

    fn set_smoothing_factor(&self, factor: f64) -> BridgeResult<()> {
        (**self).set_smoothing_factor(factor)
    }

    async fn smoothing_factor(&self) -> BridgeResult<f64> {
        (**self).smoothing_factor().await
    }
}

/// Sending end of the shared payload stream, handed to the bridge.
#[derive(Clone, Debug)]
pub struct PayloadSink {
    sender: Sender<Payload>,
}

impl PayloadSink {
    pub(crate) fn new(sender: Sender<Payload>) -> Self {
        Self { sender }
    }

    /// Queue a sample for delivery. Returns false if it was dropped.
    ///
    /// Never blocks: a full queue drops the sample, sampling is best effort.
    pub fn emit(&self, payload: Payload) -> bool {
        match self.sender.try_send(payload) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    event = BAROMETER_UPDATE_EVENT,
                    timestamp = payload.timestamp,
                    "payload queue full, sample dropped"
                );
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!(event = BAROMETER_UPDATE_EVENT, "payload sink disconnected, sample dropped");
                false
            }
        }
    }

    /// Number of samples waiting to be dispatched.
    pub fn pending(&self) -> usize {
        self.sender.len()
    }
}
