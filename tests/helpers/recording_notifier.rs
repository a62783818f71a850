//! Notifier that forwards every notification to the test over a channel

use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::mpsc;
use SignupEngine::services::{SignUpNotification, SignUpNotifier};
use SignupEngine::Result;

pub struct RecordingNotifier {
    sender: mpsc::UnboundedSender<SignUpNotification>,
}

impl RecordingNotifier {
    pub fn new() -> (Self, NotificationInbox) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, NotificationInbox { receiver })
    }
}

#[async_trait]
impl SignUpNotifier for RecordingNotifier {
    async fn notify(&self, notification: SignUpNotification) -> Result<()> {
        // The inbox may already be gone at the end of a test.
        let _ = self.sender.send(notification);
        Ok(())
    }
}

/// Receiving side of a [`RecordingNotifier`]
pub struct NotificationInbox {
    receiver: mpsc::UnboundedReceiver<SignUpNotification>,
}

impl NotificationInbox {
    /// Wait for the next notification; delivery happens on a spawned task
    pub async fn next(&mut self) -> Option<SignUpNotification> {
        tokio::time::timeout(Duration::from_secs(2), self.receiver.recv())
            .await
            .ok()
            .flatten()
    }

    /// Collect exactly `count` notifications, sorted by sign-up id
    pub async fn take(&mut self, count: usize) -> Vec<SignUpNotification> {
        let mut received = Vec::with_capacity(count);
        while received.len() < count {
            match self.next().await {
                Some(notification) => received.push(notification),
                None => break,
            }
        }
        received.sort_by_key(|n| n.sign_up.id);
        received
    }

    /// True when nothing else arrives within a short grace period
    pub async fn is_quiet(&mut self) -> bool {
        tokio::time::timeout(Duration::from_millis(100), self.receiver.recv())
            .await
            .is_err()
    }
}
