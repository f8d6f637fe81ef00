//! Per-device polling task scheduling.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::CycleError;
use crate::state::DeviceState;

/// One unit of per-device work, run once per polling interval.
pub trait DevicePoller: Send + Sync + 'static {
    /// Run a single poll cycle.
    fn poll(&self) -> impl Future<Output = Result<(), CycleError>> + Send;
}

/// What the polling loop does after a retryable cycle error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Record the error and try again on the next interval (default).
    #[default]
    Retry,
    /// Stop the polling task on the first failed cycle.
    FailStop,
}

/// Outcome of a start request. `AlreadyRunning` is informational, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    UnknownDevice,
}

/// Outcome of a stop request. `NotRunning` is informational, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotRunning,
    UnknownDevice,
}

/// Effective sleep between poll cycles for an interval configured in
/// milliseconds. Sub-second intervals are clamped to one second.
pub fn effective_interval(configured_ms: u64) -> Duration {
    Duration::from_secs((configured_ms / 1000).max(1))
}

struct Entry<P> {
    state: Arc<DeviceState>,
    poller: Arc<P>,
    configured_interval_ms: u64,
    policy: FailurePolicy,
    task: Option<JoinHandle<()>>,
}

/// Schedules one repeating polling task per registered device.
///
/// The registry map, not the device's persisted `is_polling` flag, is the
/// source of truth for mutual exclusion: a start request checks for a live
/// task, flips the flag and spawns the replacement under a single lock
/// acquisition, so concurrent starts for the same device cannot race. The
/// flag mirrors the decision for visibility and is what the task re-reads at
/// the top of each iteration, which is how stop requests are observed.
pub struct PollScheduler<P> {
    devices: Mutex<HashMap<String, Entry<P>>>,
}

impl<P> Default for PollScheduler<P> {
    fn default() -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
        }
    }
}

impl<P: DevicePoller> PollScheduler<P> {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device and the poller that services it.
    ///
    /// Registration does not start polling; call [`start`](Self::start).
    pub fn register(
        &self,
        state: Arc<DeviceState>,
        poller: P,
        configured_interval_ms: u64,
        policy: FailurePolicy,
    ) {
        let mut devices = self.devices.lock().unwrap();
        devices.insert(
            state.name().to_string(),
            Entry {
                state,
                poller: Arc::new(poller),
                configured_interval_ms,
                policy,
                task: None,
            },
        );
    }

    /// Names of all registered devices.
    pub fn device_names(&self) -> Vec<String> {
        self.devices.lock().unwrap().keys().cloned().collect()
    }

    /// Runtime state handle for one device.
    pub fn state(&self, name: &str) -> Option<Arc<DeviceState>> {
        self.devices
            .lock()
            .unwrap()
            .get(name)
            .map(|entry| entry.state.clone())
    }

    /// Whether a polling task for the device is currently alive.
    pub fn is_running(&self, name: &str) -> bool {
        self.devices
            .lock()
            .unwrap()
            .get(name)
            .is_some_and(|entry| entry.task.as_ref().is_some_and(|task| !task.is_finished()))
    }

    /// Start polling a device.
    ///
    /// At most one task per device is ever alive: the running-check, the
    /// polling-flag transition and the spawn all happen under the registry
    /// lock.
    pub fn start(&self, name: &str) -> StartOutcome {
        let mut devices = self.devices.lock().unwrap();
        let Some(entry) = devices.get_mut(name) else {
            return StartOutcome::UnknownDevice;
        };

        if entry.task.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("Polling already running for device '{}'", name);
            return StartOutcome::AlreadyRunning;
        }

        entry.state.begin_polling();
        let interval = effective_interval(entry.configured_interval_ms);
        entry.task = Some(tokio::spawn(poll_loop(
            entry.state.clone(),
            entry.poller.clone(),
            interval,
            entry.policy,
        )));

        StartOutcome::Started
    }

    /// Request that a device's polling task stop.
    ///
    /// Cooperative: the task observes the cleared flag at the top of its next
    /// iteration, so it may keep running for up to one interval.
    pub fn stop(&self, name: &str) -> StopOutcome {
        let devices = self.devices.lock().unwrap();
        let Some(entry) = devices.get(name) else {
            return StopOutcome::UnknownDevice;
        };

        if !entry.task.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("No polling task running for device '{}'", name);
            return StopOutcome::NotRunning;
        }

        entry.state.stop_polling();
        StopOutcome::Stopped
    }
}

/// The per-device polling loop.
///
/// Runs until the polling flag is cleared or a cycle error is terminal under
/// the device's failure policy. No lock is held across an await point.
async fn poll_loop<P: DevicePoller>(
    state: Arc<DeviceState>,
    poller: Arc<P>,
    interval: Duration,
    policy: FailurePolicy,
) {
    let device = state.name().to_string();
    info!(
        "Polling task started for device '{}' (interval: {}s)",
        device,
        interval.as_secs()
    );

    loop {
        if !state.is_polling() {
            info!("Polling stopped for device '{}'", device);
            break;
        }

        match poller.poll().await {
            Ok(()) => {
                debug!("Device '{}': poll cycle complete", device);
            }
            Err(e) if e.retryable && policy == FailurePolicy::Retry => {
                debug!("Device '{}': retrying next interval after: {}", device, e);
            }
            Err(e) => {
                error!("Device '{}': polling task terminated: {}", device, e);
                state.fail_stop(e.message);
                break;
            }
        }

        tokio::time::sleep(interval).await;
    }
}
