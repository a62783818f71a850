//! Test helpers module
//!
//! Shared setup for the engine's integration tests: an in-memory test
//! context, a recording notifier, event fixtures and a Postgres helper.

#![allow(dead_code)]

pub mod database_helper;
pub mod recording_notifier;
pub mod test_context;
pub mod test_data;

pub use database_helper::*;
pub use recording_notifier::*;
pub use test_context::*;
pub use test_data::*;
