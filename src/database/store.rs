//! Store capabilities the sign-up engine depends on
//!
//! The engine never talks to a concrete database. It is handed an
//! [`EventCatalog`] and a [`SignUpStore`] at construction; Postgres and
//! in-memory implementations live next to this module.
//!
//! Every write goes through a [`UnitOfWork`]. Dropping a unit of work
//! without calling [`UnitOfWork::commit`] discards everything it staged, so
//! a cancelled or timed-out request leaves no counter increment and no
//! orphan record behind.

use async_trait::async_trait;
use crate::models::{Event, EventParticipationStatus, EventSignUp, NewSignUp, Slot, SlotAvailability};
use crate::utils::errors::Result;

/// Read-only event and slot configuration
#[async_trait]
pub trait EventCatalog: Send + Sync {
    async fn find_event(&self, event_id: i64) -> Result<Option<Event>>;

    /// Slots of an event ordered by position
    async fn slots_for_event(&self, event_id: i64) -> Result<Vec<Slot>>;
}

/// Confirmed-seat counters, mutated only inside a unit of work
#[async_trait]
pub trait SlotCapacityStore: Send {
    /// Serializes on the slot until the unit of work ends and returns its current state.
    async fn lock_slot(&mut self, slot_id: i64) -> Result<Option<Slot>>;

    /// Adds `delta` to the slot's confirmed count and returns the new value.
    ///
    /// Fails with `SignupError::Internal` if the result would leave `0..=capacity`.
    async fn adjust_confirmed_count(&mut self, slot_id: i64, delta: i32) -> Result<i32>;
}

/// Sign-up records, mutated only inside a unit of work
#[async_trait]
pub trait SignUpRecordStore: Send {
    /// The user's CONFIRMED or ON_WAITLIST record for the event, if any
    async fn find_active(&mut self, user_id: i64, event_id: i64) -> Result<Option<EventSignUp>>;

    /// Inserts a record. Fails with `SignupError::AlreadySignedUp` when the user
    /// already holds an active record for the event.
    async fn insert(&mut self, sign_up: NewSignUp) -> Result<EventSignUp>;

    async fn update_status(&mut self, sign_up_id: i64, status: EventParticipationStatus) -> Result<EventSignUp>;

    /// Earliest ON_WAITLIST record of the slot by `(created_at, id)`
    async fn oldest_waitlisted(&mut self, slot_id: i64) -> Result<Option<EventSignUp>>;
}

/// One atomic unit of work spanning counters and records
#[async_trait]
pub trait UnitOfWork: SlotCapacityStore + SignUpRecordStore {
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Entry point to the durable sign-up state
#[async_trait]
pub trait SignUpStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;

    /// Per-slot counters and waitlist lengths read from one consistent snapshot
    async fn availability(&self, event_id: i64) -> Result<Vec<SlotAvailability>>;

    /// All records of an event ordered by `(created_at, id)`
    async fn sign_ups_for_event(&self, event_id: i64) -> Result<Vec<EventSignUp>>;

    /// Most recent record of the user for the event, active or terminal
    async fn latest_sign_up(&self, user_id: i64, event_id: i64) -> Result<Option<EventSignUp>>;
}
