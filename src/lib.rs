//! # Barometer Watch
//!
//! Subscription and session management for a continuous barometric sensor
//! stream (pressure, derived altitude, vertical speed).
//!
//! ## Core Concepts
//!
//! - **Bridge**: the native sensor driver behind the [`SensorBridge`] trait
//! - **Watches**: independent, cancellable subscriptions to the sample stream
//! - **Session**: the bridge runs only while at least one watch exists
//! - **Dispatch**: the host loop drains queued samples and fans them out
//!
//! ## Example
//!
//! ```ignore
//! use barometer_watch::{Barometer, BarometerConfig};
//!
//! let barometer = Barometer::new(bridge, BarometerConfig::default())?;
//!
//! if barometer.is_supported().await? {
//!     let id = barometer.watch(|payload| {
//!         println!("{} hPa, {} m", payload.pressure, payload.altitude);
//!     })?;
//!
//!     // In the host event loop
//!     barometer.dispatch_pending();
//!
//!     barometer.clear_watch(id);
//! }
//! ```

pub mod barometer;
pub mod bridge;
pub mod error;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use barometer::{Barometer, BarometerConfig};
pub use bridge::{BridgeCall, PayloadSink, RecordingBridge, SensorBridge};
pub use error::{BarometerError, BridgeError, BridgeResult, Result};
pub use subscriptions::{
    BroadcastOutcome, DropReason, SubscriptionManager, WatchCallback, WatchEvent, WatchHandle,
};
pub use types::*;
