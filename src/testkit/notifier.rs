//! Alert notifier that records instead of sending.

use parking_lot::Mutex;

use crate::port::{Alert, AlertNotifier};

#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts received so far, oldest first.
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }
}

impl AlertNotifier for RecordingNotifier {
    fn notify(&self, alert: Alert) {
        self.alerts.lock().push(alert);
    }
}
