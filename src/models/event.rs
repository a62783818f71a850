//! Event and slot models

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub organization_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub signup_opens_at: Option<DateTime<Utc>>,
    pub signup_closes_at: Option<DateTime<Utc>>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Whether new sign-ups are accepted at `now`
    pub fn is_sign_up_open(&self, now: DateTime<Utc>) -> bool {
        let opened = self.signup_opens_at.map_or(true, |opens| now >= opens);
        let not_closed = self.signup_closes_at.map_or(true, |closes| now < closes);
        opened && not_closed
    }
}

/// Capacity-bounded sub-unit of an event.
///
/// `confirmed_count` is owned by the engine and only changes inside a unit of work.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Slot {
    pub id: i64,
    pub event_id: i64,
    pub name: String,
    pub capacity: i32,
    pub confirmed_count: i32,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl Slot {
    pub fn has_free_seat(&self) -> bool {
        self.confirmed_count < self.capacity
    }
}

/// Capacity policy of a new event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CapacityPolicy {
    /// One implicit slot holding the whole event capacity
    Single { capacity: i32 },
    /// Explicit slots, in display order
    Slots(Vec<CreateSlotRequest>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlotRequest {
    pub name: String,
    pub capacity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub organization_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub signup_opens_at: Option<DateTime<Utc>>,
    pub signup_closes_at: Option<DateTime<Utc>>,
    pub created_by: Option<i64>,
    pub capacity: CapacityPolicy,
}

impl CreateEventRequest {
    /// Slot definitions to materialize, in position order
    pub fn slot_definitions(&self) -> Vec<CreateSlotRequest> {
        match &self.capacity {
            CapacityPolicy::Single { capacity } => vec![CreateSlotRequest {
                name: self.name.clone(),
                capacity: *capacity,
            }],
            CapacityPolicy::Slots(slots) => slots.clone(),
        }
    }

    /// Reject definitions the store would refuse anyway
    pub fn validate(&self) -> crate::utils::errors::Result<()> {
        use crate::utils::errors::SignupError;

        if self.name.trim().is_empty() {
            return Err(SignupError::InvalidInput("Event name is required".to_string()));
        }
        if self.end_time < self.start_time {
            return Err(SignupError::InvalidInput("Event ends before it starts".to_string()));
        }
        let slots = self.slot_definitions();
        if slots.is_empty() {
            return Err(SignupError::InvalidInput("An event needs at least one slot".to_string()));
        }
        if let Some(slot) = slots.iter().find(|slot| slot.capacity < 0) {
            return Err(SignupError::InvalidInput(format!(
                "Slot '{}' has negative capacity {}",
                slot.name, slot.capacity
            )));
        }
        Ok(())
    }
}
