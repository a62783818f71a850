//! Test context wiring the engine against the in-memory store

use std::sync::{Arc, Once};
use SignupEngine::config::Settings;
use SignupEngine::models::{CreateEventRequest, Event, EventParticipationStatus, EventSignUp, Slot};
use SignupEngine::services::{ServiceFactory, SignUpService};
use SignupEngine::MemorySignUpStore;
use super::recording_notifier::{NotificationInbox, RecordingNotifier};
use super::test_data::ADMIN_ID;

static INIT: Once = Once::new();

/// Initialize logging for tests (called once)
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("SignupEngine=debug")
            .with_test_writer()
            .try_init();
    });
}

/// Settings used by every test context
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.permissions.admin_ids = vec![ADMIN_ID];
    settings.engine.retry_base_delay_ms = 1;
    settings
}

pub struct TestContext {
    pub store: MemorySignUpStore,
    pub services: ServiceFactory,
    pub inbox: NotificationInbox,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: Settings) -> Self {
        init_test_logging();

        let store = MemorySignUpStore::new();
        let (notifier, inbox) = RecordingNotifier::new();
        let services = ServiceFactory::new(
            &settings,
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(notifier),
        );

        Self { store, services, inbox }
    }

    pub fn engine(&self) -> &SignUpService {
        &self.services.sign_up_service
    }

    /// Create an event and return it with its slots
    pub fn create_event(&self, request: CreateEventRequest) -> (Event, Vec<Slot>) {
        self.store.create_event(request).expect("Failed to create test event")
    }

    /// Every sign-up record of the event, read with administrator rights
    pub async fn records(&self, event_id: i64) -> Vec<EventSignUp> {
        self.engine()
            .list_sign_ups(ADMIN_ID, event_id)
            .await
            .expect("Failed to list sign-ups")
    }

    /// User ids holding `status` on the event, in waitlist order
    pub async fn users_with_status(&self, event_id: i64, status: EventParticipationStatus) -> Vec<i64> {
        self.records(event_id)
            .await
            .into_iter()
            .filter(|s| s.status == status)
            .map(|s| s.user_id)
            .collect()
    }
}
