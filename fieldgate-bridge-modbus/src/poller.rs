//! Fetch cycle: one gateway round trip plus its state updates, readings and
//! notifications.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use fieldgate_common::{ConnectionStatus, Notification, Reading};
use fieldgate_core::{CycleError, DevicePoller, DeviceState, Notifier, ReadingSink};

use crate::gateway::{FetchResult, GatewayClient, GatewayError, GatewayTarget};

/// Drives fetch cycles for a single device.
///
/// Used in two ways: as the [`DevicePoller`] behind a scheduled polling task,
/// and standalone for the manual "fetch once" and "test connection" operator
/// actions. Everything the cycle touches is passed in at construction; the
/// task captures no ambient context.
pub struct FetchCycle {
    target: GatewayTarget,
    state: Arc<DeviceState>,
    client: GatewayClient,
    sink: Arc<dyn ReadingSink>,
    notifier: Arc<dyn Notifier>,
}

impl FetchCycle {
    /// Create a fetch cycle for one device.
    pub fn new(
        target: GatewayTarget,
        state: Arc<DeviceState>,
        client: GatewayClient,
        sink: Arc<dyn ReadingSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            target,
            state,
            client,
            sink,
            notifier,
        }
    }

    /// Runtime state of the device this cycle serves.
    pub fn state(&self) -> &Arc<DeviceState> {
        &self.state
    }

    /// Run one fetch cycle: request, state update, readings, notification.
    ///
    /// Returns the number of readings forwarded to the sink. Gateway errors
    /// never escape uncaught: every failure path updates the device status
    /// and last error together before the error is returned.
    pub async fn fetch_once(&self) -> Result<usize, CycleError> {
        let device = self.state.name();
        debug!(
            "Fetching data for device '{}' from {}/data",
            device, self.target.api_url
        );

        let result = match self.client.fetch(&self.target).await {
            Ok(result) => result,
            Err(e) => return Err(self.fail(e)),
        };

        let formatted: Vec<String> = result
            .values
            .iter()
            .enumerate()
            .map(|(i, value)| format!("Register {}: {}", self.register_number(i), value))
            .collect();

        let was_polling = self.state.is_polling();
        self.state
            .record_fetch(result.status, formatted.clone(), result.error.clone());

        // An in-band error suppresses persistence even when the gateway sent
        // partial data alongside it.
        let recorded = if result.error.is_none() && !result.values.is_empty() {
            let timestamp = chrono::Utc::now().timestamp_millis();
            let batch: Vec<Reading> = result
                .values
                .iter()
                .enumerate()
                .map(|(i, &value)| Reading {
                    timestamp,
                    device: device.to_string(),
                    register: self.register_number(i),
                    value,
                    error: None,
                })
                .collect();
            self.sink.record_batch(batch)
        } else {
            0
        };

        self.notify_outcome(&result, &formatted, was_polling);
        Ok(recorded)
    }

    /// Probe the gateway without recording any readings.
    ///
    /// Manual action: always notifies, on success and on failure.
    pub async fn test_connection(&self) -> Result<(), CycleError> {
        let device = self.state.name();
        info!(
            "Testing connection for device '{}' at {}/data",
            device, self.target.api_url
        );

        let result = match self.client.fetch(&self.target).await {
            Ok(result) => result,
            Err(e) => return Err(self.fail(e)),
        };

        if let Some(error) = result.error {
            let message = format!("Connection test failed: {}", error);
            self.state.record_probe(ConnectionStatus::Error, Some(message.clone()));
            self.notifier.notify(Notification::danger(
                format!("Connection Test Failed for {}", device),
                message.clone(),
            ));
            return Err(CycleError::retryable(message));
        }

        self.state.record_probe(result.status, None);
        self.notifier.notify(Notification::success(
            "Connection Test Successful",
            format!(
                "Successfully connected to Modbus device '{}' at {}:{}",
                device, self.target.ip, self.target.port
            ),
        ));
        Ok(())
    }

    fn register_number(&self, index: usize) -> u32 {
        self.target.starting_register as u32 + index as u32
    }

    /// Notify per policy: always on error, otherwise only outside polling
    /// mode, so routine successful ticks stay silent.
    fn notify_outcome(&self, result: &FetchResult, formatted: &[String], was_polling: bool) {
        let device = self.state.name();
        let title = format!("Modbus Data for {}", device);

        if let Some(error) = &result.error {
            self.notifier.notify(Notification::danger(
                title,
                format!("Error fetching data for device '{}': {}", device, error),
            ));
            return;
        }

        if was_polling {
            return;
        }

        if formatted.is_empty() {
            self.notifier.notify(
                Notification::warning(
                    title,
                    format!("No data received from device '{}'", device),
                )
                .sticky(),
            );
        } else {
            self.notifier.notify(Notification::success(
                title,
                format!(
                    "Data fetched successfully for device '{}':\n{}",
                    device,
                    formatted.join("\n")
                ),
            ));
        }
    }

    /// Record a failed round trip and classify it for the scheduler.
    fn fail(&self, error: GatewayError) -> CycleError {
        let device = self.state.name();
        let message = match &error {
            GatewayError::Unreachable(_) => format!(
                "Could not connect to the Modbus gateway at {} for device '{}'. \
                 Ensure the gateway is running and accessible.",
                self.target.api_url, device
            ),
            other => format!("Error fetching data for device '{}': {}", device, other),
        };

        self.state.record_failure(message.clone());
        self.notifier.notify(Notification::danger(
            format!("Gateway Error for {}", device),
            message.clone(),
        ));
        warn!("Device '{}': fetch failed: {}", device, error);

        match error {
            GatewayError::Protocol(_) => CycleError::fatal(message),
            GatewayError::Unreachable(_) | GatewayError::Http(_) => {
                CycleError::retryable(message)
            }
        }
    }
}

impl DevicePoller for FetchCycle {
    fn poll(&self) -> impl Future<Output = Result<(), CycleError>> + Send {
        async move { self.fetch_once().await.map(|_| ()) }
    }
}
