use tracing::{error, warn};

use crate::port::{Alert, AlertNotifier, AlertSeverity};

/// Writes alerts to the tracing log.
pub struct LogNotifier;

impl AlertNotifier for LogNotifier {
    fn notify(&self, alert: Alert) {
        match alert.severity {
            AlertSeverity::Warning => {
                warn!(title = %alert.title, message = %alert.message, "Health alert");
            }
            AlertSeverity::Critical => {
                error!(title = %alert.title, message = %alert.message, "Health alert");
            }
        }
    }
}
