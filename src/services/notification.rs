//! Notification service implementation
//!
//! Informs the notification collaborator after a sign-up commits. Delivery
//! is fire-and-forget: it runs on a spawned task after the unit of work has
//! committed, and a failure is logged and counted but never undoes the
//! sign-up.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::models::EventSignUp;
use crate::utils::errors::{Result, SignupError};

/// What happened to a sign-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignUpNotificationKind {
    Confirmed,
    Waitlisted,
    Promoted,
    Retracted,
    Removed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpNotification {
    pub kind: SignUpNotificationKind,
    pub sign_up: EventSignUp,
}

impl SignUpNotification {
    pub fn new(kind: SignUpNotificationKind, sign_up: EventSignUp) -> Self {
        Self { kind, sign_up }
    }
}

/// Notification collaborator boundary
#[async_trait]
pub trait SignUpNotifier: Send + Sync {
    async fn notify(&self, notification: SignUpNotification) -> Result<()>;
}

/// Notifier that emits each notification as a structured log line
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl SignUpNotifier for LoggingNotifier {
    async fn notify(&self, notification: SignUpNotification) -> Result<()> {
        let payload = serde_json::to_string(&notification)
            .map_err(|e| SignupError::Internal(format!("Failed to encode notification: {}", e)))?;
        info!(
            user_id = notification.sign_up.user_id,
            event_id = notification.sign_up.event_id,
            kind = ?notification.kind,
            payload = %payload,
            "Sign-up notification"
        );
        Ok(())
    }
}

/// Notification statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStats {
    pub total_sent: u64,
    pub total_failed: u64,
}

#[derive(Clone)]
pub struct NotificationService {
    notifier: Arc<dyn SignUpNotifier>,
    enabled: bool,
    sent: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn SignUpNotifier>, enabled: bool) -> Self {
        Self {
            notifier,
            enabled,
            sent: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Hand notifications to the collaborator without waiting for delivery
    pub fn dispatch(&self, notifications: Vec<SignUpNotification>) {
        if !self.enabled || notifications.is_empty() {
            return;
        }

        let notifier = Arc::clone(&self.notifier);
        let sent = Arc::clone(&self.sent);
        let failed = Arc::clone(&self.failed);

        tokio::spawn(async move {
            let deliveries = notifications.into_iter().map(|notification| {
                let notifier = Arc::clone(&notifier);
                async move {
                    let sign_up_id = notification.sign_up.id;
                    (sign_up_id, notifier.notify(notification).await)
                }
            });

            for (sign_up_id, result) in futures::future::join_all(deliveries).await {
                match result {
                    Ok(()) => {
                        sent.fetch_add(1, Ordering::Relaxed);
                        debug!(sign_up_id = sign_up_id, "Notification delivered");
                    }
                    Err(e) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        warn!(sign_up_id = sign_up_id, error = %e, "Failed to deliver sign-up notification");
                    }
                }
            }
        });
    }

    pub fn stats(&self) -> NotificationStats {
        NotificationStats {
            total_sent: self.sent.load(Ordering::Relaxed),
            total_failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
