//! Sign-up model

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Participation status of a sign-up record.
///
/// `Confirmed` and `OnWaitlist` are active; `Retracted` and `Removed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventParticipationStatus {
    Confirmed,
    OnWaitlist,
    Retracted,
    Removed,
}

impl EventParticipationStatus {
    /// Database string representation
    pub fn as_db_str(&self) -> &'static str {
        match self {
            EventParticipationStatus::Confirmed => "CONFIRMED",
            EventParticipationStatus::OnWaitlist => "ON_WAITLIST",
            EventParticipationStatus::Retracted => "RETRACTED",
            EventParticipationStatus::Removed => "REMOVED",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, EventParticipationStatus::Confirmed | EventParticipationStatus::OnWaitlist)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Whether the state machine allows `self -> next`
    pub fn can_transition_to(&self, next: EventParticipationStatus) -> bool {
        use EventParticipationStatus::*;
        matches!(
            (self, next),
            (Confirmed, Retracted)
                | (Confirmed, Removed)
                | (OnWaitlist, Retracted)
                | (OnWaitlist, Removed)
                | (OnWaitlist, Confirmed)
        )
    }
}

impl fmt::Display for EventParticipationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl FromStr for EventParticipationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(EventParticipationStatus::Confirmed),
            "ON_WAITLIST" => Ok(EventParticipationStatus::OnWaitlist),
            "RETRACTED" => Ok(EventParticipationStatus::Retracted),
            "REMOVED" => Ok(EventParticipationStatus::Removed),
            other => Err(format!("unknown participation status: {}", other)),
        }
    }
}

impl TryFrom<String> for EventParticipationStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct EventSignUp {
    pub id: i64,
    pub event_id: i64,
    pub slot_id: i64,
    pub user_id: i64,
    #[sqlx(try_from = "String")]
    pub status: EventParticipationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventSignUp {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Values for a sign-up row about to be inserted
#[derive(Debug, Clone)]
pub struct NewSignUp {
    pub event_id: i64,
    pub slot_id: i64,
    pub user_id: i64,
    pub status: EventParticipationStatus,
}

/// Per-slot capacity snapshot
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct SlotAvailability {
    pub slot_id: i64,
    pub event_id: i64,
    pub name: String,
    pub capacity: i32,
    pub confirmed_count: i32,
    pub waitlist_length: i64,
}

impl SlotAvailability {
    pub fn available_seats(&self) -> i32 {
        (self.capacity - self.confirmed_count).max(0)
    }
}

/// Consistent availability snapshot of every slot of an event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventAvailability {
    pub event_id: i64,
    pub slots: Vec<SlotAvailability>,
}

impl EventAvailability {
    pub fn total_capacity(&self) -> i64 {
        self.slots.iter().map(|slot| i64::from(slot.capacity)).sum()
    }

    pub fn total_confirmed(&self) -> i64 {
        self.slots.iter().map(|slot| i64::from(slot.confirmed_count)).sum()
    }

    pub fn total_waitlisted(&self) -> i64 {
        self.slots.iter().map(|slot| slot.waitlist_length).sum()
    }

    pub fn slot(&self, slot_id: i64) -> Option<&SlotAvailability> {
        self.slots.iter().find(|slot| slot.slot_id == slot_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EventParticipationStatus::*;

    #[test]
    fn test_status_db_round_trip() {
        for status in [Confirmed, OnWaitlist, Retracted, Removed] {
            assert_eq!(status.as_db_str().parse::<EventParticipationStatus>(), Ok(status));
        }
        assert!("ATTENDED".parse::<EventParticipationStatus>().is_err());
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for next in [Confirmed, OnWaitlist, Retracted, Removed] {
            assert!(!Retracted.can_transition_to(next));
            assert!(!Removed.can_transition_to(next));
        }
    }

    #[test]
    fn test_confirmed_cannot_fall_back_to_waitlist() {
        assert!(!Confirmed.can_transition_to(OnWaitlist));
        assert!(OnWaitlist.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Removed));
    }

    #[test]
    fn test_serde_uses_screaming_case() {
        let json = serde_json::to_string(&OnWaitlist).unwrap();
        assert_eq!(json, "\"ON_WAITLIST\"");
    }
}
