//! In-memory historical reading store.

use std::sync::RwLock;

use fieldgate_common::Reading;

use crate::error::SinkError;
use crate::sink::{ReadingSink, validate};

/// Historical readings, retrievable per device newest first.
///
/// In-process stand-in for the durable record store; a deployment that needs
/// durability subscribes its database writer to the same readings through a
/// [`ReadingSink`]. Readings outlive the device's polling state.
#[derive(Debug, Default)]
pub struct HistoryStore {
    readings: RwLock<Vec<Reading>>,
}

impl HistoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored readings across all devices.
    pub fn len(&self) -> usize {
        self.readings.read().unwrap().len()
    }

    /// Whether the store holds no readings.
    pub fn is_empty(&self) -> bool {
        self.readings.read().unwrap().is_empty()
    }

    /// Readings for one device, ordered by timestamp descending.
    pub fn history(&self, device: &str) -> Vec<Reading> {
        let readings = self.readings.read().unwrap();
        let mut result: Vec<Reading> = readings
            .iter()
            .filter(|r| r.device == device)
            .cloned()
            .collect();
        result.sort_by_key(|r| std::cmp::Reverse(r.timestamp));
        result
    }

    /// Remove all readings for one device, returning how many were removed.
    pub fn clear(&self, device: &str) -> usize {
        let mut readings = self.readings.write().unwrap();
        let before = readings.len();
        readings.retain(|r| r.device != device);
        before - readings.len()
    }
}

impl ReadingSink for HistoryStore {
    fn record(&self, reading: Reading) -> Result<(), SinkError> {
        validate(&reading)?;
        self.readings.write().unwrap().push(reading);
        Ok(())
    }
}
