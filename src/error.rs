//! Error types for the barometer manager.

use thiserror::Error;

/// Failure reported by a sensor bridge implementation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("Pressure sensor not available on this device")]
    Unsupported,

    #[error("Native call failed: {0}")]
    Failed(String),
}

/// Main error type for barometer operations.
#[derive(Debug, Error)]
pub enum BarometerError {
    #[error("Barometer updates are not supported on this device")]
    Unsupported,

    #[error("Bridge {operation} failed: {source}")]
    Bridge {
        operation: &'static str,
        #[source]
        source: BridgeError,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BarometerError {
    /// Classify a bridge failure for the given operation.
    pub(crate) fn bridge(operation: &'static str, source: BridgeError) -> Self {
        match source {
            BridgeError::Unsupported => BarometerError::Unsupported,
            source => BarometerError::Bridge { operation, source },
        }
    }
}

impl From<serde_json::Error> for BarometerError {
    fn from(e: serde_json::Error) -> Self {
        BarometerError::Serialization(e.to_string())
    }
}

/// Result type for barometer operations.
pub type Result<T> = std::result::Result<T, BarometerError>;

/// Result type returned by bridge implementations.
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
