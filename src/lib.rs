//! SignupEngine
//!
//! Event sign-up, capacity and waitlist engine for a membership platform.
//! Sign-ups against capacity-bounded slots are confirmed while seats remain
//! and waitlisted afterwards; a withdrawn confirmed seat is handed to the
//! oldest waitlisted sign-up in the same unit of work.

#![allow(non_snake_case)]

pub mod config;
pub mod services;
pub mod models;
pub mod database;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{SignupError, Result};

// Re-export main components for easy access
pub use database::{DatabaseService, MemorySignUpStore};
pub use services::{ServiceFactory, SignUpService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
