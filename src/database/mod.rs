//! Database module
//!
//! This module handles database connections, the store capabilities the
//! engine depends on, and their Postgres and in-memory implementations

pub mod connection;
pub mod memory;
pub mod repositories;
pub mod service;
pub mod store;

// Re-export commonly used database components
pub use connection::{DatabasePool, create_pool, pool_options, run_migrations, health_check};
pub use memory::MemorySignUpStore;
pub use repositories::{EventRepository, SignUpRepository};
pub use service::DatabaseService;
pub use store::{EventCatalog, SignUpStore, SlotCapacityStore, SignUpRecordStore, UnitOfWork};
