//! Sign-up lifecycle service
//!
//! The façade resolvers call: `sign_up`, `retract_sign_up`, `remove_sign_up`
//! and `get_availability`, plus participation lookups. Every mutating call
//! runs one unit of work per attempt through [`RetryPolicy`]; notifications
//! go out only after the unit of work has committed.

use std::sync::Arc;
use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use crate::database::store::{EventCatalog, SignUpRecordStore, SignUpStore, SlotCapacityStore, UnitOfWork};
use crate::models::{Event, EventAvailability, EventParticipationStatus, EventSignUp, Slot};
use crate::services::auth::{require_permission, PermissionChecker, SignUpAction};
use crate::services::notification::{NotificationService, SignUpNotification, SignUpNotificationKind};
use crate::services::promotion::fill_vacated_seat;
use crate::services::reservation::reserve;
use crate::services::retry::RetryPolicy;
use crate::utils::errors::{ErrorSeverity, Result, SignupError};
use crate::utils::logging::{log_admin_action, log_sign_up_action};

/// Outcome of a retract or remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    /// The record in its terminal state
    pub withdrawn: EventSignUp,
    /// The waitlisted record that took over the freed seat, if any
    pub promoted: Option<EventSignUp>,
}

/// Move the user's active sign-up to `terminal` and refill the seat it held
async fn withdraw(
    uow: &mut dyn UnitOfWork,
    user_id: i64,
    event_id: i64,
    terminal: EventParticipationStatus,
) -> Result<Withdrawal> {
    let not_found = || SignupError::SignUpNotFound { user_id, event_id };

    let unlocked = uow.find_active(user_id, event_id).await?.ok_or_else(not_found)?;
    uow.lock_slot(unlocked.slot_id)
        .await?
        .ok_or(SignupError::SlotNotFound { slot_id: unlocked.slot_id })?;

    // A promotion or withdrawal may have committed between the first read and the lock.
    let active = uow.find_active(user_id, event_id).await?.ok_or_else(not_found)?;
    if active.id != unlocked.id {
        return Err(SignupError::ConcurrencyConflict(format!(
            "active sign-up of user {} on event {} changed while locking",
            user_id, event_id
        )));
    }

    let withdrawn = uow.update_status(active.id, terminal).await?;
    let promoted = match active.status {
        EventParticipationStatus::Confirmed => fill_vacated_seat(uow, active.slot_id).await?,
        _ => None,
    };

    Ok(Withdrawal { withdrawn, promoted })
}

/// Pick the slot a sign-up targets
fn choose_slot(event: &Event, slots: &[Slot], requested: Option<i64>) -> Result<i64> {
    match (requested, slots) {
        (Some(slot_id), _) => slots
            .iter()
            .find(|slot| slot.id == slot_id)
            .map(|slot| slot.id)
            .ok_or(SignupError::SlotNotFound { slot_id }),
        (None, [only]) => Ok(only.id),
        (None, []) => Err(SignupError::Internal(format!("event {} has no slots", event.id))),
        (None, many) => Err(SignupError::InvalidInput(format!(
            "Event {} has {} slots; a slot must be chosen",
            event.id,
            many.len()
        ))),
    }
}

#[derive(Clone)]
pub struct SignUpService {
    catalog: Arc<dyn EventCatalog>,
    store: Arc<dyn SignUpStore>,
    permissions: Arc<dyn PermissionChecker>,
    notifications: NotificationService,
    retry: RetryPolicy,
}

impl SignUpService {
    pub fn new(
        catalog: Arc<dyn EventCatalog>,
        store: Arc<dyn SignUpStore>,
        permissions: Arc<dyn PermissionChecker>,
        notifications: NotificationService,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            catalog,
            store,
            permissions,
            notifications,
            retry,
        }
    }

    async fn require_event(&self, event_id: i64) -> Result<Event> {
        self.catalog
            .find_event(event_id)
            .await?
            .ok_or(SignupError::EventNotFound { event_id })
    }

    /// Log a failed operation at a level matching its severity
    fn log_failure(operation: &str, error: SignupError) -> SignupError {
        match error.severity() {
            ErrorSeverity::Info => debug!(operation = operation, error = %error, "Sign-up request rejected"),
            ErrorSeverity::Warning => warn!(operation = operation, error = %error, "Sign-up request refused"),
            ErrorSeverity::Error | ErrorSeverity::Critical => {
                error!(operation = operation, error = %error, "Sign-up request failed")
            }
        }
        error
    }

    /// Sign the user up for an event with a single slot
    pub async fn sign_up(&self, user_id: i64, event_id: i64) -> Result<EventSignUp> {
        self.sign_up_to(user_id, event_id, None).await
    }

    /// Sign the user up for a specific slot of an event
    pub async fn sign_up_for_slot(&self, user_id: i64, event_id: i64, slot_id: i64) -> Result<EventSignUp> {
        self.sign_up_to(user_id, event_id, Some(slot_id)).await
    }

    #[instrument(skip(self), fields(request_id = %Uuid::new_v4()))]
    async fn sign_up_to(&self, user_id: i64, event_id: i64, slot_id: Option<i64>) -> Result<EventSignUp> {
        let attempt: Result<EventSignUp> = async {
            let event = self.require_event(event_id).await?;
            if !event.is_sign_up_open(Utc::now()) {
                return Err(SignupError::SignUpClosed { event_id });
            }
            let slots = self.catalog.slots_for_event(event_id).await?;
            let slot_id = choose_slot(&event, &slots, slot_id)?;

            self.retry
                .run("sign_up", || {
                    let store = Arc::clone(&self.store);
                    async move {
                        let mut uow = store.begin().await?;
                        let sign_up = reserve(uow.as_mut(), event_id, slot_id, user_id).await?;
                        uow.commit().await?;
                        Ok(sign_up)
                    }
                })
                .await
        }
        .await;
        let result = attempt.map_err(|e| Self::log_failure("sign_up", e))?;

        log_sign_up_action(event_id, "sign_up", user_id, Some(result.status.as_db_str()));
        let kind = match result.status {
            EventParticipationStatus::Confirmed => SignUpNotificationKind::Confirmed,
            _ => SignUpNotificationKind::Waitlisted,
        };
        self.notifications.dispatch(vec![SignUpNotification::new(kind, result.clone())]);

        Ok(result)
    }

    /// Withdraw the caller's own active sign-up
    #[instrument(skip(self), fields(request_id = %Uuid::new_v4()))]
    pub async fn retract_sign_up(&self, user_id: i64, event_id: i64) -> Result<Withdrawal> {
        let attempt: Result<Withdrawal> = async {
            self.require_event(event_id).await?;
            self.withdraw_with_retry("retract_sign_up", user_id, event_id, EventParticipationStatus::Retracted)
                .await
        }
        .await;
        let withdrawal = attempt.map_err(|e| Self::log_failure("retract_sign_up", e))?;

        log_sign_up_action(event_id, "retract_sign_up", user_id, None);
        self.notify_withdrawal(SignUpNotificationKind::Retracted, &withdrawal);
        Ok(withdrawal)
    }

    /// Withdraw another user's active sign-up on behalf of an administrator
    #[instrument(skip(self), fields(request_id = %Uuid::new_v4()))]
    pub async fn remove_sign_up(&self, actor_id: i64, event_id: i64, target_user_id: i64) -> Result<Withdrawal> {
        let attempt: Result<Withdrawal> = async {
            require_permission(self.permissions.as_ref(), actor_id, SignUpAction::RemoveSignUp, event_id).await?;
            self.require_event(event_id).await?;
            self.withdraw_with_retry("remove_sign_up", target_user_id, event_id, EventParticipationStatus::Removed)
                .await
        }
        .await;
        let withdrawal = attempt.map_err(|e| Self::log_failure("remove_sign_up", e))?;

        let target = target_user_id.to_string();
        log_admin_action(actor_id, "remove_sign_up", Some(&target), Some(&format!("event {}", event_id)));
        self.notify_withdrawal(SignUpNotificationKind::Removed, &withdrawal);
        Ok(withdrawal)
    }

    async fn withdraw_with_retry(
        &self,
        operation: &str,
        user_id: i64,
        event_id: i64,
        terminal: EventParticipationStatus,
    ) -> Result<Withdrawal> {
        self.retry
            .run(operation, || {
                let store = Arc::clone(&self.store);
                async move {
                    let mut uow = store.begin().await?;
                    let withdrawal = withdraw(uow.as_mut(), user_id, event_id, terminal).await?;
                    uow.commit().await?;
                    Ok(withdrawal)
                }
            })
            .await
    }

    fn notify_withdrawal(&self, kind: SignUpNotificationKind, withdrawal: &Withdrawal) {
        let mut notifications = vec![SignUpNotification::new(kind, withdrawal.withdrawn.clone())];
        if let Some(promoted) = &withdrawal.promoted {
            info!(
                event_id = promoted.event_id,
                user_id = promoted.user_id,
                sign_up_id = promoted.id,
                "Waitlisted user promoted"
            );
            notifications.push(SignUpNotification::new(SignUpNotificationKind::Promoted, promoted.clone()));
        }
        self.notifications.dispatch(notifications);
    }

    /// Per-slot capacity, confirmed count and waitlist length
    #[instrument(skip(self))]
    pub async fn get_availability(&self, event_id: i64) -> Result<EventAvailability> {
        let attempt: Result<EventAvailability> = async {
            self.require_event(event_id).await?;
            let slots = self.store.availability(event_id).await?;
            Ok(EventAvailability { event_id, slots })
        }
        .await;
        attempt.map_err(|e| Self::log_failure("get_availability", e))
    }

    /// The user's most recent sign-up record for the event, active or terminal
    pub async fn get_sign_up(&self, user_id: i64, event_id: i64) -> Result<Option<EventSignUp>> {
        self.require_event(event_id).await?;
        self.store.latest_sign_up(user_id, event_id).await
    }

    /// Every sign-up record of the event in waitlist order
    #[instrument(skip(self))]
    pub async fn list_sign_ups(&self, actor_id: i64, event_id: i64) -> Result<Vec<EventSignUp>> {
        let attempt: Result<Vec<EventSignUp>> = async {
            require_permission(self.permissions.as_ref(), actor_id, SignUpAction::ViewSignUps, event_id).await?;
            self.require_event(event_id).await?;
            self.store.sign_ups_for_event(event_id).await
        }
        .await;
        attempt.map_err(|e| Self::log_failure("list_sign_ups", e))
    }
}
