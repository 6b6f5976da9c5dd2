use models::{Id, Notification, NotificationType};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Alert is a transient, user-visible announcement of a newly-arrived Notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub notification_id: Id,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    /// How long the alert remains visible.
    pub duration: Duration,
}

impl Alert {
    pub fn for_notification(notification: &Notification) -> Self {
        let (severity, seconds) = match notification.type_ {
            NotificationType::Error => (Severity::Error, 30),
            NotificationType::Warning => (Severity::Warning, 7),
            _ => (Severity::Info, 5),
        };
        Alert {
            notification_id: notification.id,
            title: notification.title.clone(),
            message: notification.message.clone(),
            severity,
            duration: Duration::from_secs(seconds),
        }
    }
}

/// AlertSink presents Alerts to the user.
pub trait AlertSink: Send + Sync + 'static {
    fn raise(&self, alert: Alert);
}

/// TracingAlerts presents Alerts as log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlerts;

impl AlertSink for TracingAlerts {
    fn raise(&self, alert: Alert) {
        let Alert {
            notification_id,
            title,
            message,
            severity,
            duration,
        } = alert;
        let duration = format!("{}s", duration.as_secs());

        match severity {
            Severity::Error => {
                tracing::error!(%notification_id, %title, %duration, "{message}")
            }
            Severity::Warning => {
                tracing::warn!(%notification_id, %title, %duration, "{message}")
            }
            Severity::Info => {
                tracing::info!(%notification_id, %title, %duration, "{message}")
            }
        }
    }
}

impl AlertSink for tokio::sync::mpsc::UnboundedSender<Alert> {
    fn raise(&self, alert: Alert) {
        // The receiver may have gone away, in which case nobody is watching.
        let _ = self.send(alert);
    }
}
