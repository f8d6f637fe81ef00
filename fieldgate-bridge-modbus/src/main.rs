//! Fieldgate bridge for Modbus devices behind a REST gateway.
//!
//! Polls each configured device through its REST gateway and fans register
//! readings out to subscribers; a history store keeps them for retrieval.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use fieldgate_bridge_modbus::config::BridgeConfig;
use fieldgate_bridge_modbus::gateway::GatewayClient;
use fieldgate_bridge_modbus::poller::FetchCycle;
use fieldgate_common::{LoggingConfig, Notification};
use fieldgate_core::{
    ChannelSink, DeviceState, HistoryStore, LogNotifier, Notifier, PollScheduler, ReadingSink,
    StartOutcome, StopOutcome,
};

/// Fieldgate bridge for Modbus devices behind a REST gateway.
#[derive(Parser, Debug)]
#[command(name = "fieldgate-bridge-modbus")]
#[command(about = "Polls Modbus devices through a REST gateway and records readings")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format)
    #[arg(short, long, default_value = "fieldgate.json5")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Fetch once from every configured device and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = BridgeConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    // Initialize logging
    let log_config = LoggingConfig {
        level: args
            .log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone()),
        format: config.logging.format,
    };
    fieldgate_common::init_tracing(&log_config)
        .map_err(|e| anyhow::anyhow!("Failed to init tracing: {}", e))?;

    info!("Starting fieldgate-bridge-modbus");
    info!("Loaded configuration from {:?}", args.config);

    // Reading fan-out: the history store consumes the broadcast channel.
    let (sink, mut readings) = ChannelSink::new(config.channel_capacity);
    let sink = Arc::new(sink);
    let history = Arc::new(HistoryStore::new());

    let store = history.clone();
    let consumer = tokio::spawn(async move {
        loop {
            match readings.recv().await {
                Ok(reading) => {
                    debug!(
                        "Reading: device '{}' register {} = {}",
                        reading.device, reading.register, reading.value
                    );
                    if let Err(e) = store.record(reading) {
                        warn!("Failed to record reading: {}", e);
                    }
                }
                Err(RecvError::Lagged(dropped)) => {
                    warn!("Reading consumer lagged, dropped {} readings", dropped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let notifier = Arc::new(LogNotifier);
    let scheduler = PollScheduler::new();
    let mut manual_cycles = Vec::new();

    for device in &config.devices {
        let state = Arc::new(DeviceState::new(&device.name));
        let client = GatewayClient::new(Duration::from_secs(device.timeout_secs))
            .with_context(|| format!("Failed to build gateway client for '{}'", device.name))?;
        let cycle = FetchCycle::new(
            device.target(),
            state.clone(),
            client,
            sink.clone(),
            notifier.clone(),
        );

        if args.once {
            manual_cycles.push(cycle);
        } else {
            scheduler.register(state, cycle, device.poll_interval_ms, device.on_error);
        }
    }

    if args.once {
        for cycle in &manual_cycles {
            if let Err(e) = cycle.fetch_once().await {
                error!(
                    "Manual fetch failed for device '{}': {}",
                    cycle.state().name(),
                    e
                );
            }
        }
        info!("Recorded {} readings", history.len());
        return Ok(());
    }

    // Start a polling task per device
    for device in &config.devices {
        match scheduler.start(&device.name) {
            StartOutcome::Started => notifier.notify(Notification::success(
                "Polling Started",
                format!(
                    "Auto fetch started for device '{}' every {} ms.",
                    device.name, device.poll_interval_ms
                ),
            )),
            StartOutcome::AlreadyRunning => notifier.notify(Notification::warning(
                "Polling Already Running",
                format!("Auto fetch is already running for device '{}'.", device.name),
            )),
            StartOutcome::UnknownDevice => {
                error!("Device '{}' is not registered", device.name)
            }
        }
    }

    info!(
        "Modbus gateway bridge running with {} device(s)",
        config.devices.len()
    );

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    for name in scheduler.device_names() {
        match scheduler.stop(&name) {
            StopOutcome::Stopped => notifier.notify(Notification::warning(
                "Polling Stopped",
                format!("Auto fetch stopped for device '{}'.", name),
            )),
            StopOutcome::NotRunning => notifier.notify(Notification::info(
                "Polling Not Running",
                format!("No polling task was running for device '{}'.", name),
            )),
            StopOutcome::UnknownDevice => {}
        }
    }

    consumer.abort();
    info!("Modbus gateway bridge stopped");

    Ok(())
}
