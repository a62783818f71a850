//! Data models module
//!
//! This module contains all data structures owned or read by the sign-up engine

pub mod event;
pub mod sign_up;

// Re-export commonly used models
pub use event::{Event, Slot, CapacityPolicy, CreateEventRequest, CreateSlotRequest};
pub use sign_up::{EventSignUp, EventParticipationStatus, NewSignUp, SlotAvailability, EventAvailability};
