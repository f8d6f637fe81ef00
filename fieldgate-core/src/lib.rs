//! Fieldgate polling core.
//!
//! Protocol-agnostic machinery shared by Fieldgate device bridges:
//!
//! - [`state`] - Per-device runtime state (`DeviceState`)
//! - [`scheduler`] - Per-device repeating poll tasks (`PollScheduler`)
//! - [`sink`] - Reading fan-out to subscribers (`ReadingSink`, `ChannelSink`)
//! - [`history`] - In-memory historical reading store (`HistoryStore`)
//! - [`notify`] - User-facing notification emitters (`Notifier`)
//! - [`error`] - Error types

pub mod error;
pub mod history;
pub mod notify;
pub mod scheduler;
pub mod sink;
pub mod state;

// Re-export commonly used types at the crate root
pub use error::{CycleError, SinkError};
pub use history::HistoryStore;
pub use notify::{BufferNotifier, LogNotifier, Notifier};
pub use scheduler::{
    DevicePoller, FailurePolicy, PollScheduler, StartOutcome, StopOutcome, effective_interval,
};
pub use sink::{ChannelSink, ReadingSink};
pub use state::{DeviceSnapshot, DeviceState};
