//! Capacity reservation protocol
//!
//! Try-confirm-or-waitlist inside one unit of work. The slot lock is taken
//! before anything is read, so the capacity check, the record insert and the
//! counter increment are indivisible with respect to every other
//! reservation or promotion on the same slot.

use tracing::debug;
use crate::database::store::{SignUpRecordStore, SlotCapacityStore, UnitOfWork};
use crate::models::{EventParticipationStatus, EventSignUp, NewSignUp};
use crate::utils::errors::{Result, SignupError};

/// Reserve a seat on `slot_id` for `user_id`, or waitlist them when the slot is full.
///
/// The caller commits the unit of work.
pub async fn reserve(uow: &mut dyn UnitOfWork, event_id: i64, slot_id: i64, user_id: i64) -> Result<EventSignUp> {
    let slot = uow
        .lock_slot(slot_id)
        .await?
        .ok_or(SignupError::SlotNotFound { slot_id })?;

    if slot.event_id != event_id {
        return Err(SignupError::InvalidInput(format!(
            "Slot {} does not belong to event {}",
            slot_id, event_id
        )));
    }

    if uow.find_active(user_id, event_id).await?.is_some() {
        return Err(SignupError::AlreadySignedUp { user_id, event_id });
    }

    let status = if slot.has_free_seat() {
        EventParticipationStatus::Confirmed
    } else {
        EventParticipationStatus::OnWaitlist
    };

    let sign_up = uow
        .insert(NewSignUp {
            event_id,
            slot_id,
            user_id,
            status,
        })
        .await?;

    if status == EventParticipationStatus::Confirmed {
        uow.adjust_confirmed_count(slot_id, 1).await?;
    }

    debug!(
        sign_up_id = sign_up.id,
        slot_id = slot_id,
        user_id = user_id,
        status = %status,
        confirmed_before = slot.confirmed_count,
        capacity = slot.capacity,
        "Reservation staged"
    );
    Ok(sign_up)
}
