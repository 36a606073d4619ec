use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// Default time a notice stays on screen
pub const DEFAULT_NOTICE_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    /// Local quotes were overwritten with server data
    Success,
    /// Divergence found, local quotes kept
    Conflict,
}

impl NotificationKind {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "synced",
            NotificationKind::Conflict => "conflict",
        }
    }
}

/// A short-lived message for the view layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    /// How long before the view should dismiss it
    pub duration: Duration,
    pub issued_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            kind,
            message: message.into(),
            duration,
            issued_at: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>, duration: Duration) -> Self {
        Self::new(NotificationKind::Info, message, duration)
    }

    pub fn success(message: impl Into<String>, duration: Duration) -> Self {
        Self::new(NotificationKind::Success, message, duration)
    }

    pub fn conflict(message: impl Into<String>, duration: Duration) -> Self {
        Self::new(NotificationKind::Conflict, message, duration)
    }
}

/// Whatever shows notices to the user
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notices to the log and nowhere else
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        info!(kind = notification.kind.label(), "{}", notification.message);
    }
}

/// Forwards notices over a channel, for views that render them on their own schedule
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        // Receiver gone means nobody is watching anymore
        let _ = self.tx.send(notification);
    }
}
