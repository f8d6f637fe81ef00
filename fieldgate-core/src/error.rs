//! Error types for the polling core.

use thiserror::Error;

/// A poll cycle that did not complete.
///
/// `retryable` tells the scheduler whether the next interval may clear the
/// condition; the device's failure policy decides whether the loop actually
/// tries again.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CycleError {
    /// Human-readable description, also recorded as the device's last error.
    pub message: String,
    /// Whether the loop may try again on the next interval.
    pub retryable: bool,
}

impl CycleError {
    /// An error the next interval may clear (unreachable gateway, HTTP 5xx).
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// An error that must stop the polling task.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// Errors from recording readings into a sink.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SinkError {
    /// The reading's value is not a finite number.
    #[error("Invalid value for device '{device}' register {register}: {value}")]
    InvalidValue {
        device: String,
        register: u32,
        value: f64,
    },

    /// No subscriber is listening for readings.
    #[error("No subscribers for readings from device '{device}'")]
    NoSubscribers { device: String },
}
