//! Test data helpers for creating events and slots

use chrono::{Duration, Utc};
use SignupEngine::models::{CapacityPolicy, CreateEventRequest, CreateSlotRequest};

/// Platform administrator configured in every test context
pub const ADMIN_ID: i64 = 1;

/// User who creates events through [`event_request`]
pub const ORGANIZER_ID: i64 = 2;

/// Event a week from now with a single implicit slot
pub fn event_request(capacity: i32) -> CreateEventRequest {
    let start = Utc::now() + Duration::days(7);
    CreateEventRequest {
        organization_id: Some(100),
        name: "Hyttetur".to_string(),
        description: Some("Weekend cabin trip".to_string()),
        start_time: start,
        end_time: start + Duration::days(2),
        signup_opens_at: None,
        signup_closes_at: None,
        created_by: Some(ORGANIZER_ID),
        capacity: CapacityPolicy::Single { capacity },
    }
}

/// Event with one named slot per capacity
pub fn slotted_event_request(capacities: &[i32]) -> CreateEventRequest {
    CreateEventRequest {
        name: "Workshop".to_string(),
        capacity: CapacityPolicy::Slots(
            capacities
                .iter()
                .enumerate()
                .map(|(i, capacity)| CreateSlotRequest {
                    name: format!("Session {}", i + 1),
                    capacity: *capacity,
                })
                .collect(),
        ),
        ..event_request(0)
    }
}

/// Event whose sign-up window closed an hour ago
pub fn closed_event_request(capacity: i32) -> CreateEventRequest {
    CreateEventRequest {
        signup_opens_at: Some(Utc::now() - Duration::days(3)),
        signup_closes_at: Some(Utc::now() - Duration::hours(1)),
        ..event_request(capacity)
    }
}

/// Event whose sign-up window opens tomorrow
pub fn not_yet_open_event_request(capacity: i32) -> CreateEventRequest {
    CreateEventRequest {
        signup_opens_at: Some(Utc::now() + Duration::days(1)),
        ..event_request(capacity)
    }
}
