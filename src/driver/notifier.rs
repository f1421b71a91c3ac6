use log::warn;
use notify_rust::{Hint, Notification as Toast};

use crate::domain::Notification;

/// Desktop toasts for processed-email outcomes. Failures to reach the
/// notification server are logged and swallowed; the dashboard keeps running.
pub struct Notifier {
    enabled: bool,
}

impl Notifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn notify(&self, note: &Notification) {
        if !self.enabled {
            return;
        }

        let (summary, body) = match note {
            Notification::ReplySent { email } => {
                ("Reply sent", format!("Automatic reply sent to {email}"))
            }
            Notification::ManualReview { email } => (
                "Manual review needed",
                format!("Email from {email} needs a manual reply"),
            ),
            Notification::ProcessingError { email } => (
                "Processing error",
                format!("Failed to process email from {email}"),
            ),
        };

        let result = Toast::new()
            .summary(summary)
            .body(&body)
            .hint(Hint::Category("email".to_string()))
            .show();
        if let Err(e) = result {
            warn!("notification error: {e}");
        }
    }
}
