//! HTTP client for the Modbus REST gateway.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use fieldgate_common::ConnectionStatus;

/// Error type for gateway round trips.
///
/// Callers react differently to an unreachable gateway (the next interval
/// may succeed) than to a broken response contract, so the variants are
/// kept distinct.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The gateway could not be reached (refused, unreachable, DNS, timeout).
    #[error("Gateway unreachable: {0}")]
    Unreachable(String),
    /// The gateway answered with a non-success HTTP status.
    #[error("Gateway returned HTTP {0}")]
    Http(StatusCode),
    /// The gateway answered with a body that does not match the contract.
    #[error("Gateway protocol error: {0}")]
    Protocol(String),
}

/// Network coordinates for one device's fetches.
#[derive(Debug, Clone)]
pub struct GatewayTarget {
    /// Gateway base URL.
    pub api_url: String,
    /// PLC host address.
    pub ip: String,
    /// PLC TCP port.
    pub port: u16,
    /// Modbus slave/unit ID.
    pub slave_id: u8,
    /// First register to read.
    pub starting_register: u16,
    /// Number of registers to read.
    pub register_count: u16,
}

/// Request body for `POST /data`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DataRequest<'a> {
    ip: &'a str,
    port: u16,
    slave_id: u8,
    starting_register: u16,
    number_of_registers: u16,
}

/// Raw response body from `POST /data`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataResponse {
    #[serde(default)]
    connection_status: Option<String>,
    #[serde(default)]
    values: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Parsed outcome of one gateway round trip. Ephemeral: consumed within the
/// fetch cycle that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    /// Gateway-reported connection status.
    pub status: ConnectionStatus,
    /// Register values in register-index order (possibly empty).
    pub values: Vec<f64>,
    /// Error reported by the gateway, if any.
    pub error: Option<String>,
}

/// Client for the REST gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
}

impl GatewayClient {
    /// Build a client with a bounded per-request timeout.
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Fetch one batch of register values through the gateway.
    pub async fn fetch(&self, target: &GatewayTarget) -> Result<FetchResult, GatewayError> {
        let body = DataRequest {
            ip: &target.ip,
            port: target.port,
            slave_id: target.slave_id,
            starting_register: target.starting_register,
            number_of_registers: target.register_count,
        };
        let url = format!("{}/data", target.api_url);

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Http(status));
        }

        let raw: DataResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(e.to_string()))?;

        parse_response(raw)
    }
}

/// Turn a raw gateway body into a typed result.
///
/// A missing or non-array `values` field normalizes to an empty vec: an
/// empty reading set is itself meaningful (the device returned nothing).
/// A non-numeric element inside the array is a contract violation.
fn parse_response(raw: DataResponse) -> Result<FetchResult, GatewayError> {
    let status = raw
        .connection_status
        .as_deref()
        .map(ConnectionStatus::from_wire)
        .unwrap_or(ConnectionStatus::Error);

    let values = match raw.values {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_f64().ok_or_else(|| {
                    GatewayError::Protocol(format!("Non-numeric value in response: {}", item))
                })
            })
            .collect::<Result<Vec<f64>, GatewayError>>()?,
        _ => Vec::new(),
    };

    Ok(FetchResult {
        status,
        values,
        error: raw.error,
    })
}
