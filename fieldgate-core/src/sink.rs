//! Reading sink trait and the broadcast channel sink.

use tokio::sync::broadcast;

use fieldgate_common::Reading;

use crate::error::SinkError;

/// Reject readings whose value is not a finite number.
pub(crate) fn validate(reading: &Reading) -> Result<(), SinkError> {
    if reading.value.is_finite() {
        Ok(())
    } else {
        Err(SinkError::InvalidValue {
            device: reading.device.clone(),
            register: reading.register,
            value: reading.value,
        })
    }
}

/// Receives parsed readings from fetch cycles and forwards them downstream.
pub trait ReadingSink: Send + Sync + 'static {
    /// Record one reading.
    fn record(&self, reading: Reading) -> Result<(), SinkError>;

    /// Record a batch of readings in order.
    ///
    /// Individual failures are logged rather than aborting the batch.
    /// Returns the number of readings recorded.
    fn record_batch(&self, batch: Vec<Reading>) -> usize {
        let mut recorded = 0;
        for reading in batch {
            match self.record(reading) {
                Ok(()) => recorded += 1,
                Err(e) => tracing::warn!("Failed to record reading: {}", e),
            }
        }
        recorded
    }
}

/// Fan-out sink that broadcasts readings to subscribers.
///
/// Fetch cycles hand a completed batch to this sink; each subscriber sees
/// the readings of one cycle in register-index order. Slow subscribers drop
/// the oldest readings once the channel capacity is exceeded.
#[derive(Debug)]
pub struct ChannelSink {
    tx: broadcast::Sender<Reading>,
}

impl ChannelSink {
    /// Create a sink with the given channel capacity, along with the first
    /// subscriber.
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<Reading>) {
        let (tx, rx) = broadcast::channel(capacity);
        (Self { tx }, rx)
    }

    /// Subscribe an additional reading consumer.
    pub fn subscribe(&self) -> broadcast::Receiver<Reading> {
        self.tx.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl ReadingSink for ChannelSink {
    fn record(&self, reading: Reading) -> Result<(), SinkError> {
        validate(&reading)?;
        self.tx
            .send(reading)
            .map(|_| ())
            .map_err(|broadcast::error::SendError(reading)| SinkError::NoSubscribers {
                device: reading.device,
            })
    }
}
