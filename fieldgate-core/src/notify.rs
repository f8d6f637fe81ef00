//! Notification emitters.

use std::sync::Mutex;

use fieldgate_common::{Notification, Severity};

/// Sink for user-facing notifications.
///
/// Fetch cycles stay silent on routine successful polls and emit through
/// this trait otherwise; whatever UI embeds the bridge decides how the
/// messages are displayed.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notification: Notification);
}

/// Notifier that writes notifications to the tracing log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, n: Notification) {
        match n.severity {
            Severity::Danger => {
                tracing::error!(sticky = n.sticky, "{}: {}", n.title, n.message)
            }
            Severity::Warning => {
                tracing::warn!(sticky = n.sticky, "{}: {}", n.title, n.message)
            }
            Severity::Info | Severity::Success => {
                tracing::info!("{}: {}", n.title, n.message)
            }
        }
    }
}

/// Notifier that buffers notifications for later inspection.
#[derive(Debug, Default)]
pub struct BufferNotifier {
    entries: Mutex<Vec<Notification>>,
}

impl BufferNotifier {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the buffered notifications.
    pub fn entries(&self) -> Vec<Notification> {
        self.entries.lock().unwrap().clone()
    }

    /// Drain the buffered notifications.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.entries.lock().unwrap())
    }
}

impl Notifier for BufferNotifier {
    fn notify(&self, notification: Notification) {
        self.entries.lock().unwrap().push(notification);
    }
}
