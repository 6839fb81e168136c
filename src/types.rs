//! Core types for the barometer manager.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the event the native bridge emits for every new sample.
pub const BAROMETER_UPDATE_EVENT: &str = "barometerUpdate";

/// Unique identifier for a watch (subscription).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WatchId(pub u64);

impl WatchId {
    /// The following id in allocation order.
    ///
    /// Saturates at `u64::MAX`; a counter that also restarts every epoch
    /// cannot get there in practice.
    pub fn next(self) -> Self {
        WatchId(self.0.saturating_add(1))
    }
}

impl fmt::Debug for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WatchId({})", self.0)
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One sensor sample as produced by the bridge.
///
/// The manager never looks inside a payload; it is routed verbatim to every
/// subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    /// Sample time in milliseconds since the Unix epoch.
    pub timestamp: f64,

    /// Smoothed pressure in hPa.
    pub pressure: f64,

    /// Altitude above sea level against the standard atmosphere (m).
    #[serde(rename = "altitudeASL")]
    pub altitude_asl: f64,

    /// Altitude against the configured local pressure (m).
    pub altitude: f64,

    /// Change in altitude since observation started (m).
    pub relative_altitude: f64,

    /// Vertical speed (m/s).
    pub vertical_speed: f64,
}

impl Payload {
    /// Parse a payload from its JSON wire shape.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode the payload in its JSON wire shape.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
