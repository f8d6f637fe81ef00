//! Fieldgate bridge for Modbus devices behind a REST gateway.
//!
//! The gateway is the external service that actually speaks the Modbus wire
//! protocol; this bridge consumes its JSON-over-HTTP facade and forwards
//! register readings to subscribers:
//!
//! ```text
//! POST {api_url}/data
//! body     {"ip", "port", "slaveId", "startingRegister", "numberOfRegisters"}
//! response {"connectionStatus": "...", "values": [...], "error": "..."}
//! ```
//!
//! Each configured device gets its own repeating polling task; see
//! [`fieldgate_core::PollScheduler`] for the scheduling rules.

pub mod config;
pub mod gateway;
pub mod poller;
