use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A single register reading produced by one fetch cycle.
///
/// Immutable once created; the reading sink owns it from then on. Its
/// lifetime is independent of the device's polling state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Unix epoch milliseconds when the value was read.
    pub timestamp: i64,

    /// Device identifier.
    pub device: String,

    /// Absolute register number (starting register + index within the fetch).
    pub register: u32,

    /// The value read from the register.
    pub value: f64,

    /// Error reported by the gateway for this fetch, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reading {
    /// Create a new reading with the current timestamp.
    pub fn new(device: impl Into<String>, register: u32, value: f64) -> Self {
        Self {
            timestamp: current_timestamp_millis(),
            device: device.into(),
            register,
            value,
            error: None,
        }
    }

    /// Attach a gateway-reported error to this reading.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Get the current timestamp in milliseconds since Unix epoch.
///
/// Returns 0 if system time is before Unix epoch (should never happen in practice).
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
