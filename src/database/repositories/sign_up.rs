//! Sign-up repository implementation
//!
//! Postgres backing for the engine's unit of work. Serialization happens on
//! the slot row: `lock_slot` takes `SELECT ... FOR UPDATE`, and every read
//! and write of that slot's counter and records happens while the lock is
//! held. The partial unique index `event_sign_ups_one_active_per_user`
//! enforces one active sign-up per (user, event) across slots.

use std::collections::HashSet;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};
use crate::database::store::{SignUpRecordStore, SignUpStore, SlotCapacityStore, UnitOfWork};
use crate::models::{EventParticipationStatus, EventSignUp, NewSignUp, Slot, SlotAvailability};
use crate::utils::errors::{is_active_sign_up_violation, SignupError, Result};

const SIGN_UP_COLUMNS: &str = "id, event_id, slot_id, user_id, status, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct SignUpRepository {
    pool: PgPool,
}

impl SignUpRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SignUpStore for SignUpRepository {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        // The pool's connections already carry the lock_timeout.
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork {
            tx,
            locked_slots: HashSet::new(),
        }))
    }

    #[instrument(skip(self))]
    async fn availability(&self, event_id: i64) -> Result<Vec<SlotAvailability>> {
        // One statement, one snapshot: counters and waitlist lengths cannot tear.
        let availability = sqlx::query_as::<_, SlotAvailability>(
            r#"
            SELECT s.id AS slot_id,
                   s.event_id,
                   s.name,
                   s.capacity,
                   s.confirmed_count,
                   COUNT(su.id) FILTER (WHERE su.status = 'ON_WAITLIST') AS waitlist_length
            FROM slots s
            LEFT JOIN event_sign_ups su ON su.slot_id = s.id
            WHERE s.event_id = $1
            GROUP BY s.id
            ORDER BY s.position ASC, s.id ASC
            "#
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(availability)
    }

    async fn sign_ups_for_event(&self, event_id: i64) -> Result<Vec<EventSignUp>> {
        let sign_ups = sqlx::query_as::<_, EventSignUp>(&format!(
            "SELECT {SIGN_UP_COLUMNS} FROM event_sign_ups WHERE event_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sign_ups)
    }

    async fn latest_sign_up(&self, user_id: i64, event_id: i64) -> Result<Option<EventSignUp>> {
        let sign_up = sqlx::query_as::<_, EventSignUp>(&format!(
            "SELECT {SIGN_UP_COLUMNS} FROM event_sign_ups WHERE user_id = $1 AND event_id = $2 ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sign_up)
    }
}

/// Unit of work over one Postgres transaction.
///
/// Dropping it before `commit` rolls the transaction back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
    locked_slots: HashSet<i64>,
}

#[async_trait]
impl SlotCapacityStore for PgUnitOfWork {
    async fn lock_slot(&mut self, slot_id: i64) -> Result<Option<Slot>> {
        let slot = sqlx::query_as::<_, Slot>(
            "SELECT id, event_id, name, capacity, confirmed_count, position, created_at FROM slots WHERE id = $1 FOR UPDATE"
        )
        .bind(slot_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        if slot.is_some() {
            self.locked_slots.insert(slot_id);
            debug!(slot_id = slot_id, "Slot row locked");
        }
        Ok(slot)
    }

    async fn adjust_confirmed_count(&mut self, slot_id: i64, delta: i32) -> Result<i32> {
        if !self.locked_slots.contains(&slot_id) {
            return Err(SignupError::Internal(format!("slot {} adjusted without holding its lock", slot_id)));
        }

        let updated: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE slots
            SET confirmed_count = confirmed_count + $2
            WHERE id = $1 AND confirmed_count + $2 BETWEEN 0 AND capacity
            RETURNING confirmed_count
            "#
        )
        .bind(slot_id)
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await?;

        updated.map(|(count,)| count).ok_or_else(|| {
            SignupError::Internal(format!("confirmed count of slot {} cannot move by {}", slot_id, delta))
        })
    }
}

#[async_trait]
impl SignUpRecordStore for PgUnitOfWork {
    async fn find_active(&mut self, user_id: i64, event_id: i64) -> Result<Option<EventSignUp>> {
        let sign_up = sqlx::query_as::<_, EventSignUp>(&format!(
            "SELECT {SIGN_UP_COLUMNS} FROM event_sign_ups WHERE user_id = $1 AND event_id = $2 AND status IN ('CONFIRMED', 'ON_WAITLIST')"
        ))
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(sign_up)
    }

    async fn insert(&mut self, sign_up: NewSignUp) -> Result<EventSignUp> {
        // clock_timestamp() is taken after the slot lock, so created_at follows lock order.
        let inserted = sqlx::query_as::<_, EventSignUp>(&format!(
            r#"
            INSERT INTO event_sign_ups (event_id, slot_id, user_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, clock_timestamp(), clock_timestamp())
            RETURNING {SIGN_UP_COLUMNS}
            "#
        ))
        .bind(sign_up.event_id)
        .bind(sign_up.slot_id)
        .bind(sign_up.user_id)
        .bind(sign_up.status.as_db_str())
        .fetch_one(&mut *self.tx)
        .await;

        match inserted {
            Ok(record) => Ok(record),
            Err(e) if is_active_sign_up_violation(&e) => Err(SignupError::AlreadySignedUp {
                user_id: sign_up.user_id,
                event_id: sign_up.event_id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_status(&mut self, sign_up_id: i64, status: EventParticipationStatus) -> Result<EventSignUp> {
        let current = sqlx::query_as::<_, EventSignUp>(&format!(
            "SELECT {SIGN_UP_COLUMNS} FROM event_sign_ups WHERE id = $1"
        ))
        .bind(sign_up_id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| SignupError::Internal(format!("sign-up {} vanished", sign_up_id)))?;

        if !current.status.can_transition_to(status) {
            return Err(SignupError::Internal(format!(
                "illegal transition {} -> {} for sign-up {}",
                current.status, status, sign_up_id
            )));
        }

        let updated = sqlx::query_as::<_, EventSignUp>(&format!(
            r#"
            UPDATE event_sign_ups
            SET status = $2, updated_at = clock_timestamp()
            WHERE id = $1
            RETURNING {SIGN_UP_COLUMNS}
            "#
        ))
        .bind(sign_up_id)
        .bind(status.as_db_str())
        .fetch_one(&mut *self.tx)
        .await;

        match updated {
            Ok(record) => Ok(record),
            Err(e) if is_active_sign_up_violation(&e) => Err(SignupError::AlreadySignedUp {
                user_id: current.user_id,
                event_id: current.event_id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn oldest_waitlisted(&mut self, slot_id: i64) -> Result<Option<EventSignUp>> {
        let sign_up = sqlx::query_as::<_, EventSignUp>(&format!(
            r#"
            SELECT {SIGN_UP_COLUMNS}
            FROM event_sign_ups
            WHERE slot_id = $1 AND status = 'ON_WAITLIST'
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#
        ))
        .bind(slot_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(sign_up)
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
