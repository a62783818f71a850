//! Database service layer
//!
//! Bundles the Postgres repositories behind one handle

use crate::database::{DatabasePool, EventRepository, SignUpRepository};
use crate::models::{CreateEventRequest, Event, Slot};
use crate::utils::errors::SignupError;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub events: EventRepository,
    pub sign_ups: SignUpRepository,
    pool: DatabasePool,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            events: EventRepository::new(pool.clone()),
            sign_ups: SignUpRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new event with its slots
    pub async fn create_event(&self, request: CreateEventRequest) -> Result<(Event, Vec<Slot>), SignupError> {
        self.events.create(request).await
    }

    /// Check the underlying pool
    pub async fn health_check(&self) -> Result<(), SignupError> {
        super::connection::health_check(&self.pool).await
    }
}
