//! Waitlist promotion protocol
//!
//! Runs in the same unit of work as the withdrawal that vacated a confirmed
//! seat, while the slot lock is still held.

use tracing::debug;
use crate::database::store::{SignUpRecordStore, SlotCapacityStore, UnitOfWork};
use crate::models::{EventParticipationStatus, EventSignUp};
use crate::utils::errors::Result;

/// Release one confirmed seat on `slot_id` and hand it to the oldest waitlisted sign-up.
///
/// Returns the promoted sign-up, or `None` when the waitlist was empty and
/// the seat stays free. The slot must already be locked by `uow`.
pub async fn fill_vacated_seat(uow: &mut dyn UnitOfWork, slot_id: i64) -> Result<Option<EventSignUp>> {
    uow.adjust_confirmed_count(slot_id, -1).await?;

    let Some(candidate) = uow.oldest_waitlisted(slot_id).await? else {
        debug!(slot_id = slot_id, "Seat freed, waitlist empty");
        return Ok(None);
    };

    let promoted = uow
        .update_status(candidate.id, EventParticipationStatus::Confirmed)
        .await?;
    uow.adjust_confirmed_count(slot_id, 1).await?;

    debug!(
        slot_id = slot_id,
        sign_up_id = promoted.id,
        user_id = promoted.user_id,
        "Promoted from waitlist"
    );
    Ok(Some(promoted))
}
