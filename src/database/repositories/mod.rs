//! Database repositories module
//!
//! Postgres implementations of the engine's store capabilities

pub mod event;
pub mod sign_up;

// Re-export repositories
pub use event::EventRepository;
pub use sign_up::{SignUpRepository, PgUnitOfWork};
