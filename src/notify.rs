use tracing::{info, warn};

/// Receives messages meant for a blocking dialog.
pub trait ErrorPresenter: Send + Sync {
    fn show_error(&self, message: &str);
    fn show_info(&self, title: &str, message: &str);
}

/// Receives transient user notifications.
pub trait NotificationSender: Send + Sync {
    fn send(&self, title: &str, body: &str);
}

/// Writes dialogs and notifications to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogPresenter;

impl ErrorPresenter for LogPresenter {
    fn show_error(&self, message: &str) {
        warn!(message = %message, "Error");
    }

    fn show_info(&self, title: &str, message: &str) {
        info!(title = %title, message = %message, "Info");
    }
}

impl NotificationSender for LogPresenter {
    fn send(&self, title: &str, body: &str) {
        info!(title = %title, body = %body, "Notification");
    }
}
