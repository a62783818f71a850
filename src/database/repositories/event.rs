//! Event repository implementation
//!
//! Backs the [`EventCatalog`] with the `events` and `slots` tables. Event
//! creation is administrative plumbing kept here so the console and tests
//! can seed data.

use async_trait::async_trait;
use sqlx::PgPool;
use chrono::Utc;
use crate::database::store::EventCatalog;
use crate::models::event::{Event, Slot, CreateEventRequest};
use crate::utils::errors::SignupError;

const EVENT_COLUMNS: &str = "id, organization_id, name, description, start_time, end_time, signup_opens_at, signup_closes_at, created_by, created_at, updated_at";
const SLOT_COLUMNS: &str = "id, event_id, name, capacity, confirmed_count, position, created_at";

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event together with its slots
    pub async fn create(&self, request: CreateEventRequest) -> Result<(Event, Vec<Slot>), SignupError> {
        request.validate()?;
        let mut tx = self.pool.begin().await?;

        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (organization_id, name, description, start_time, end_time, signup_opens_at, signup_closes_at, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(request.organization_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(request.signup_opens_at)
        .bind(request.signup_closes_at)
        .bind(request.created_by)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let mut slots = Vec::new();
        for (position, definition) in request.slot_definitions().into_iter().enumerate() {
            let slot = sqlx::query_as::<_, Slot>(&format!(
                r#"
                INSERT INTO slots (event_id, name, capacity, position)
                VALUES ($1, $2, $3, $4)
                RETURNING {SLOT_COLUMNS}
                "#
            ))
            .bind(event.id)
            .bind(definition.name)
            .bind(definition.capacity)
            .bind(position as i32)
            .fetch_one(&mut *tx)
            .await?;
            slots.push(slot);
        }

        tx.commit().await?;
        tracing::info!(event_id = event.id, slots = slots.len(), "Event created");
        Ok((event, slots))
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Event>, SignupError> {
        let event = sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    /// Slots of an event in display order
    pub async fn get_slots(&self, event_id: i64) -> Result<Vec<Slot>, SignupError> {
        let slots = sqlx::query_as::<_, Slot>(&format!(
            "SELECT {SLOT_COLUMNS} FROM slots WHERE event_id = $1 ORDER BY position ASC, id ASC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(slots)
    }
}

#[async_trait]
impl EventCatalog for EventRepository {
    async fn find_event(&self, event_id: i64) -> Result<Option<Event>, SignupError> {
        self.find_by_id(event_id).await
    }

    async fn slots_for_event(&self, event_id: i64) -> Result<Vec<Slot>, SignupError> {
        self.get_slots(event_id).await
    }
}
