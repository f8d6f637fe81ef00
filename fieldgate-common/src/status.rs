use serde::{Deserialize, Serialize};

/// Device connection status.
///
/// Tracks the bridge's view of one device; the gateway reports the same set
/// of states (minus `Polling`, which only the bridge itself assigns).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No contact with the device yet.
    #[default]
    Disconnected,
    /// The last gateway round trip succeeded.
    Connected,
    /// The last gateway round trip failed.
    Error,
    /// A polling task is actively fetching from the device.
    Polling,
}

impl ConnectionStatus {
    /// Get the string representation used on the wire and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
            ConnectionStatus::Polling => "polling",
        }
    }

    /// Parse a gateway-reported status string.
    ///
    /// Unknown strings map to [`ConnectionStatus::Error`] so a misbehaving
    /// gateway can never make a device look healthy.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "disconnected" => ConnectionStatus::Disconnected,
            "connected" => ConnectionStatus::Connected,
            "polling" => ConnectionStatus::Polling,
            _ => ConnectionStatus::Error,
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
