use serde::{Deserialize, Serialize};

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Danger,
}

impl Severity {
    /// Get the string representation used in payloads and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Danger => "danger",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-facing status message emitted by bridge operations.
///
/// Sticky notifications are meant to stay on screen until dismissed;
/// non-sticky ones may expire on their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Short headline (e.g. "Polling Started").
    pub title: String,
    /// Full message body.
    pub message: String,
    /// Display severity.
    pub severity: Severity,
    /// Whether the notification should persist until dismissed.
    pub sticky: bool,
}

impl Notification {
    /// Create a new notification.
    pub fn new(title: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
            sticky: false,
        }
    }

    /// Create an informational notification.
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Severity::Info)
    }

    /// Create a success notification.
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Severity::Success)
    }

    /// Create a warning notification.
    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Severity::Warning)
    }

    /// Create an error notification. Danger notifications are sticky.
    pub fn danger(title: impl Into<String>, message: impl Into<String>) -> Self {
        let mut notification = Self::new(title, message, Severity::Danger);
        notification.sticky = true;
        notification
    }

    /// Mark the notification as sticky.
    pub fn sticky(mut self) -> Self {
        self.sticky = true;
        self
    }
}
