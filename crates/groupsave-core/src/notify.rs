//! Fire-and-forget user notifications.
//!
//! Operations publish through a `Notifier`; front ends hold a
//! `NotificationFeed` and show whatever is still visible. Notifications
//! dismiss themselves after `NOTIFICATION_DURATION_SECS`.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

/// Seconds a notification stays visible.
pub const NOTIFICATION_DURATION_SECS: i64 = 5;

/// Notifications buffered per subscriber before the oldest are dropped.
const CHANNEL_CAPACITY: usize = 32;

/// Most notifications a feed shows at once.
const MAX_VISIBLE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn title(&self) -> &'static str {
        match self {
            NotificationKind::Info => "Information",
            NotificationKind::Success => "Success",
            NotificationKind::Warning => "Warning",
            NotificationKind::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_dismissed_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= Duration::seconds(NOTIFICATION_DURATION_SECS)
    }
}

/// Publishing side of the relay. Clone freely.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish a notification. Having no subscribers is fine.
    pub fn notify(&self, kind: NotificationKind, message: impl Into<String>) {
        let notification = Notification::new(kind, message);
        debug!(kind = ?notification.kind, message = %notification.message, "Notification");
        let _ = self.tx.send(notification);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(NotificationKind::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(NotificationKind::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.notify(NotificationKind::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(NotificationKind::Error, message);
    }

    /// Only notifications published after this call are received.
    pub fn subscribe(&self) -> NotificationFeed {
        NotificationFeed {
            rx: self.tx.subscribe(),
            active: VecDeque::new(),
        }
    }
}

/// Receiving side: keeps the most recent notifications until they dismiss.
pub struct NotificationFeed {
    rx: broadcast::Receiver<Notification>,
    active: VecDeque<Notification>,
}

impl NotificationFeed {
    fn push(&mut self, notification: Notification) {
        self.active.push_back(notification);
        while self.active.len() > MAX_VISIBLE {
            self.active.pop_front();
        }
    }

    /// Pull in everything published so far without waiting.
    /// Returns how many notifications arrived.
    pub fn poll(&mut self) -> usize {
        let mut received = 0;
        loop {
            match self.rx.try_recv() {
                Ok(notification) => {
                    self.push(notification);
                    received += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Notification feed lagged, dropped oldest");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        received
    }

    /// Wait for the next notification. `None` once every `Notifier` is gone.
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            match self.rx.recv().await {
                Ok(notification) => {
                    self.push(notification.clone());
                    return Some(notification);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Notification feed lagged, dropped oldest");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Notifications still on screen at `now`; dismissed ones are dropped.
    pub fn visible_at(&mut self, now: DateTime<Utc>) -> impl Iterator<Item = &Notification> {
        self.active.retain(|n| !n.is_dismissed_at(now));
        self.active.iter()
    }

    pub fn visible(&mut self) -> impl Iterator<Item = &Notification> {
        self.visible_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles() {
        assert_eq!(NotificationKind::Info.title(), "Information");
        assert_eq!(NotificationKind::Success.title(), "Success");
        assert_eq!(NotificationKind::Warning.title(), "Warning");
        assert_eq!(NotificationKind::Error.title(), "Error");
    }

    #[test]
    fn test_notify_without_subscribers_is_fine() {
        let notifier = Notifier::new();
        notifier.error("nobody is listening");
    }

    #[test]
    fn test_feed_receives_in_order() {
        let notifier = Notifier::new();
        let mut feed = notifier.subscribe();

        notifier.success("Group created");
        notifier.error("Amount must be a positive number");

        assert_eq!(feed.poll(), 2);
        let messages: Vec<_> = feed.visible().map(|n| n.message.clone()).collect();
        assert_eq!(messages, ["Group created", "Amount must be a positive number"]);
    }

    #[test]
    fn test_notifications_dismiss_after_duration() {
        let notifier = Notifier::new();
        let mut feed = notifier.subscribe();
        notifier.info("Refreshing");
        feed.poll();

        let later = Utc::now() + Duration::seconds(NOTIFICATION_DURATION_SECS + 1);
        assert_eq!(feed.visible_at(later).count(), 0);
        // Dismissed notifications do not come back
        assert_eq!(feed.visible().count(), 0);
    }

    #[test]
    fn test_feed_keeps_most_recent() {
        let notifier = Notifier::new();
        let mut feed = notifier.subscribe();
        for i in 0..(MAX_VISIBLE + 3) {
            notifier.info(format!("n{}", i));
        }
        feed.poll();

        let visible: Vec<_> = feed.visible().map(|n| n.message.clone()).collect();
        assert_eq!(visible.len(), MAX_VISIBLE);
        assert_eq!(visible.last().map(String::as_str), Some("n7"));
        assert_eq!(visible.first().map(String::as_str), Some("n3"));
    }

    #[tokio::test]
    async fn test_recv_waits_for_notification() {
        let notifier = Notifier::new();
        let mut feed = notifier.subscribe();

        let publisher = notifier.clone();
        tokio::spawn(async move {
            publisher.warning("Low balance");
        });

        let notification = feed.recv().await.expect("notification");
        assert_eq!(notification.kind, NotificationKind::Warning);
        assert_eq!(notification.title, "Warning");

        drop(notifier);
        assert!(feed.recv().await.is_none());
    }
}
