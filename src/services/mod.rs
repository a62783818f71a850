//! Services module
//!
//! This module contains the sign-up engine and its collaborators

pub mod auth;
pub mod notification;
pub mod promotion;
pub mod reservation;
pub mod retry;
pub mod sign_up;

// Re-export commonly used services
pub use auth::{AuthService, PermissionChecker, SignUpAction};
pub use notification::{LoggingNotifier, NotificationService, NotificationStats, SignUpNotification, SignUpNotificationKind, SignUpNotifier};
pub use retry::RetryPolicy;
pub use sign_up::{SignUpService, Withdrawal};

use std::sync::Arc;
use crate::config::settings::Settings;
use crate::database::{DatabaseService, EventCatalog, MemorySignUpStore, SignUpStore};

/// Service factory for creating and wiring all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub sign_up_service: SignUpService,
    pub auth_service: AuthService,
    pub notification_service: NotificationService,
}

impl ServiceFactory {
    /// Wire the engine against arbitrary store and collaborator implementations
    pub fn new(
        settings: &Settings,
        catalog: Arc<dyn EventCatalog>,
        store: Arc<dyn SignUpStore>,
        notifier: Arc<dyn SignUpNotifier>,
    ) -> Self {
        let auth_service = AuthService::new(Arc::clone(&catalog), &settings.permissions);
        let notification_service = NotificationService::new(notifier, settings.notifications.enabled);
        let sign_up_service = SignUpService::new(
            catalog,
            store,
            Arc::new(auth_service.clone()),
            notification_service.clone(),
            RetryPolicy::from(&settings.engine),
        );

        Self {
            sign_up_service,
            auth_service,
            notification_service,
        }
    }

    /// Engine backed by Postgres repositories
    pub fn with_database(settings: &Settings, database: &DatabaseService) -> Self {
        Self::new(
            settings,
            Arc::new(database.events.clone()),
            Arc::new(database.sign_ups.clone()),
            Arc::new(LoggingNotifier),
        )
    }

    /// Engine backed by the in-memory store
    pub fn in_memory(settings: &Settings, store: MemorySignUpStore) -> Self {
        Self::new(
            settings,
            Arc::new(store.clone()),
            Arc::new(store),
            Arc::new(LoggingNotifier),
        )
    }
}
