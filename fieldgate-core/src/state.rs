//! Per-device runtime state.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use fieldgate_common::ConnectionStatus;

/// Snapshot of a device's runtime state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Current connection status.
    pub status: ConnectionStatus,
    /// Whether a polling task is supposed to be running.
    pub is_polling: bool,
    /// Formatted values from the last successful fetch.
    pub last_values: Vec<String>,
    /// Last error message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Runtime state of a single device.
///
/// Every mutation takes the write lock exactly once, so a reader can never
/// observe a torn update such as `is_polling` true with `status`
/// Disconnected. There is one lock per device and no lock shared across
/// devices.
///
/// The scheduler is the only writer of `is_polling`; fetch cycles update the
/// remaining fields through [`record_fetch`](Self::record_fetch),
/// [`record_probe`](Self::record_probe) and
/// [`record_failure`](Self::record_failure).
#[derive(Debug)]
pub struct DeviceState {
    name: String,
    fields: RwLock<DeviceSnapshot>,
}

impl DeviceState {
    /// Create state for a device, initially disconnected.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: RwLock::new(DeviceSnapshot::default()),
        }
    }

    /// Device identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> DeviceSnapshot {
        self.fields.read().unwrap().clone()
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.fields.read().unwrap().status
    }

    /// Whether the polling flag is set.
    pub fn is_polling(&self) -> bool {
        self.fields.read().unwrap().is_polling
    }

    /// Last error message, if any.
    pub fn last_error(&self) -> Option<String> {
        self.fields.read().unwrap().last_error.clone()
    }

    /// Mark the device as actively polling. Scheduler only.
    pub fn begin_polling(&self) {
        let mut fields = self.fields.write().unwrap();
        fields.is_polling = true;
        fields.status = ConnectionStatus::Polling;
    }

    /// Clear the polling flag after a stop request. Scheduler only.
    pub fn stop_polling(&self) {
        let mut fields = self.fields.write().unwrap();
        fields.is_polling = false;
        fields.status = ConnectionStatus::Connected;
    }

    /// Terminate polling after a fatal cycle error. Scheduler only.
    pub fn fail_stop(&self, error: impl Into<String>) {
        let mut fields = self.fields.write().unwrap();
        fields.is_polling = false;
        fields.status = ConnectionStatus::Error;
        fields.last_error = Some(error.into());
    }

    /// Record the outcome of a completed fetch cycle.
    ///
    /// The gateway's self-reported status is trusted, except that an
    /// error-free fetch on a polling device keeps the status at `Polling`.
    pub fn record_fetch(
        &self,
        gateway_status: ConnectionStatus,
        values: Vec<String>,
        error: Option<String>,
    ) {
        let mut fields = self.fields.write().unwrap();
        fields.status = if error.is_none() && fields.is_polling {
            ConnectionStatus::Polling
        } else {
            gateway_status
        };
        fields.last_values = values;
        fields.last_error = error;
    }

    /// Record the outcome of a connection probe, which carries no values.
    pub fn record_probe(&self, gateway_status: ConnectionStatus, error: Option<String>) {
        let mut fields = self.fields.write().unwrap();
        fields.status = if error.is_none() && fields.is_polling {
            ConnectionStatus::Polling
        } else {
            gateway_status
        };
        fields.last_error = error;
    }

    /// Record a failed gateway round trip. The polling flag is untouched so
    /// the loop can keep retrying under a retry policy.
    pub fn record_failure(&self, error: impl Into<String>) {
        let mut fields = self.fields.write().unwrap();
        fields.status = ConnectionStatus::Error;
        fields.last_error = Some(error.into());
    }
}
