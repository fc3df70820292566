//! Alerting port used by the health monitor.

use std::fmt;

use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("WARNING"),
            Self::Critical => f.write_str("CRITICAL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: AlertSeverity::Warning,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn critical(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: AlertSeverity::Critical,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Receives alerts. Fire-and-forget.
///
/// `notify` must return quickly; implementations doing network I/O hand the
/// alert to a background task.
pub trait AlertNotifier: Send + Sync {
    fn notify(&self, alert: Alert);
}

/// Broadcasts alerts to every registered notifier.
#[derive(Default)]
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn AlertNotifier>>,
}

impl NotifierRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, notifier: Box<dyn AlertNotifier>) {
        self.notifiers.push(notifier);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl AlertNotifier for NotifierRegistry {
    fn notify(&self, alert: Alert) {
        if self.notifiers.is_empty() {
            match alert.severity {
                AlertSeverity::Warning => warn!(title = %alert.title, "Alert dropped: no notifiers"),
                AlertSeverity::Critical => error!(title = %alert.title, "Alert dropped: no notifiers"),
            }
            return;
        }
        for notifier in &self.notifiers {
            notifier.notify(alert.clone());
        }
    }
}

/// A no-op notifier for when alerting is disabled.
pub struct NullNotifier;

impl AlertNotifier for NullNotifier {
    fn notify(&self, _alert: Alert) {}
}
