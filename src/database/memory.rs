//! In-memory sign-up store
//!
//! Substitutes the Postgres store in tests and in the offline console. Each
//! slot has its own async mutex which a unit of work holds from
//! `lock_slot` until it is committed or dropped. Writes are staged in the
//! unit of work and only become visible on commit.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;
use crate::database::store::{EventCatalog, SignUpRecordStore, SignUpStore, SlotCapacityStore, UnitOfWork};
use crate::models::{CreateEventRequest, Event, EventParticipationStatus, EventSignUp, NewSignUp, Slot, SlotAvailability};
use crate::utils::errors::{Result, SignupError};

#[derive(Debug, Default)]
struct MemoryState {
    events: HashMap<i64, Event>,
    slots: BTreeMap<i64, Slot>,
    sign_ups: BTreeMap<i64, EventSignUp>,
}

/// In-memory event catalog and sign-up store
#[derive(Debug, Clone, Default)]
pub struct MemorySignUpStore {
    state: Arc<Mutex<MemoryState>>,
    slot_locks: Arc<Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>>,
    next_id: Arc<AtomicI64>,
}

fn poisoned<T>(_: T) -> SignupError {
    SignupError::Internal("memory store lock poisoned".to_string())
}

impl MemorySignUpStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Create an event together with its slots
    pub fn create_event(&self, request: CreateEventRequest) -> Result<(Event, Vec<Slot>)> {
        request.validate()?;
        let now = Utc::now();
        let event = Event {
            id: self.allocate_id(),
            organization_id: request.organization_id,
            name: request.name.clone(),
            description: request.description.clone(),
            start_time: request.start_time,
            end_time: request.end_time,
            signup_opens_at: request.signup_opens_at,
            signup_closes_at: request.signup_closes_at,
            created_by: request.created_by,
            created_at: now,
            updated_at: now,
        };

        let slots: Vec<Slot> = request
            .slot_definitions()
            .into_iter()
            .enumerate()
            .map(|(position, definition)| Slot {
                id: self.allocate_id(),
                event_id: event.id,
                name: definition.name,
                capacity: definition.capacity,
                confirmed_count: 0,
                position: position as i32,
                created_at: now,
            })
            .collect();

        let mut state = self.state.lock().map_err(poisoned)?;
        state.events.insert(event.id, event.clone());
        for slot in &slots {
            state.slots.insert(slot.id, slot.clone());
        }

        Ok((event, slots))
    }

    fn slot_lock(&self, slot_id: i64) -> Result<Arc<AsyncMutex<()>>> {
        let mut locks = self.slot_locks.lock().map_err(poisoned)?;
        Ok(Arc::clone(locks.entry(slot_id).or_default()))
    }
}

#[async_trait]
impl EventCatalog for MemorySignUpStore {
    async fn find_event(&self, event_id: i64) -> Result<Option<Event>> {
        let state = self.state.lock().map_err(poisoned)?;
        Ok(state.events.get(&event_id).cloned())
    }

    async fn slots_for_event(&self, event_id: i64) -> Result<Vec<Slot>> {
        let state = self.state.lock().map_err(poisoned)?;
        let mut slots: Vec<Slot> = state
            .slots
            .values()
            .filter(|slot| slot.event_id == event_id)
            .cloned()
            .collect();
        slots.sort_by_key(|slot| (slot.position, slot.id));
        Ok(slots)
    }
}

#[async_trait]
impl SignUpStore for MemorySignUpStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(MemoryUnitOfWork {
            store: self.clone(),
            guards: HashMap::new(),
            staged_counts: HashMap::new(),
            staged_sign_ups: BTreeMap::new(),
        }))
    }

    async fn availability(&self, event_id: i64) -> Result<Vec<SlotAvailability>> {
        let state = self.state.lock().map_err(poisoned)?;
        let mut slots: Vec<&Slot> = state.slots.values().filter(|slot| slot.event_id == event_id).collect();
        slots.sort_by_key(|slot| (slot.position, slot.id));

        Ok(slots
            .into_iter()
            .map(|slot| SlotAvailability {
                slot_id: slot.id,
                event_id: slot.event_id,
                name: slot.name.clone(),
                capacity: slot.capacity,
                confirmed_count: slot.confirmed_count,
                waitlist_length: state
                    .sign_ups
                    .values()
                    .filter(|s| s.slot_id == slot.id && s.status == EventParticipationStatus::OnWaitlist)
                    .count() as i64,
            })
            .collect())
    }

    async fn sign_ups_for_event(&self, event_id: i64) -> Result<Vec<EventSignUp>> {
        let state = self.state.lock().map_err(poisoned)?;
        let mut sign_ups: Vec<EventSignUp> = state
            .sign_ups
            .values()
            .filter(|s| s.event_id == event_id)
            .cloned()
            .collect();
        sign_ups.sort_by_key(|s| (s.created_at, s.id));
        Ok(sign_ups)
    }

    async fn latest_sign_up(&self, user_id: i64, event_id: i64) -> Result<Option<EventSignUp>> {
        let state = self.state.lock().map_err(poisoned)?;
        Ok(state
            .sign_ups
            .values()
            .filter(|s| s.user_id == user_id && s.event_id == event_id)
            .max_by_key(|s| (s.created_at, s.id))
            .cloned())
    }
}

/// Unit of work over [`MemorySignUpStore`]
pub struct MemoryUnitOfWork {
    store: MemorySignUpStore,
    guards: HashMap<i64, OwnedMutexGuard<()>>,
    staged_counts: HashMap<i64, i32>,
    staged_sign_ups: BTreeMap<i64, EventSignUp>,
}

impl MemoryUnitOfWork {
    /// Committed records overlaid with this unit of work's staged writes
    fn merged_sign_ups(&self) -> Result<Vec<EventSignUp>> {
        let state = self.store.state.lock().map_err(poisoned)?;
        let mut merged: BTreeMap<i64, EventSignUp> = state.sign_ups.clone();
        for (id, sign_up) in &self.staged_sign_ups {
            merged.insert(*id, sign_up.clone());
        }
        Ok(merged.into_values().collect())
    }

    fn current_slot(&self, slot_id: i64) -> Result<Option<Slot>> {
        let state = self.store.state.lock().map_err(poisoned)?;
        Ok(state.slots.get(&slot_id).cloned().map(|mut slot| {
            if let Some(count) = self.staged_counts.get(&slot_id) {
                slot.confirmed_count = *count;
            }
            slot
        }))
    }
}

#[async_trait]
impl SlotCapacityStore for MemoryUnitOfWork {
    async fn lock_slot(&mut self, slot_id: i64) -> Result<Option<Slot>> {
        if !self.guards.contains_key(&slot_id) {
            if self.current_slot(slot_id)?.is_none() {
                return Ok(None);
            }
            let lock = self.store.slot_lock(slot_id)?;
            let guard = lock.lock_owned().await;
            self.guards.insert(slot_id, guard);
            debug!(slot_id = slot_id, "Slot locked");
        }
        self.current_slot(slot_id)
    }

    async fn adjust_confirmed_count(&mut self, slot_id: i64, delta: i32) -> Result<i32> {
        if !self.guards.contains_key(&slot_id) {
            return Err(SignupError::Internal(format!("slot {} adjusted without holding its lock", slot_id)));
        }
        let slot = self
            .current_slot(slot_id)?
            .ok_or(SignupError::SlotNotFound { slot_id })?;

        let updated = slot.confirmed_count + delta;
        if updated < 0 || updated > slot.capacity {
            return Err(SignupError::Internal(format!(
                "confirmed count of slot {} would become {} (capacity {})",
                slot_id, updated, slot.capacity
            )));
        }
        self.staged_counts.insert(slot_id, updated);
        Ok(updated)
    }
}

#[async_trait]
impl SignUpRecordStore for MemoryUnitOfWork {
    async fn find_active(&mut self, user_id: i64, event_id: i64) -> Result<Option<EventSignUp>> {
        Ok(self
            .merged_sign_ups()?
            .into_iter()
            .find(|s| s.user_id == user_id && s.event_id == event_id && s.is_active()))
    }

    async fn insert(&mut self, sign_up: NewSignUp) -> Result<EventSignUp> {
        if self.find_active(sign_up.user_id, sign_up.event_id).await?.is_some() {
            return Err(SignupError::AlreadySignedUp {
                user_id: sign_up.user_id,
                event_id: sign_up.event_id,
            });
        }

        let now = Utc::now();
        let record = EventSignUp {
            id: self.store.allocate_id(),
            event_id: sign_up.event_id,
            slot_id: sign_up.slot_id,
            user_id: sign_up.user_id,
            status: sign_up.status,
            created_at: now,
            updated_at: now,
        };
        self.staged_sign_ups.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_status(&mut self, sign_up_id: i64, status: EventParticipationStatus) -> Result<EventSignUp> {
        let mut record = self
            .merged_sign_ups()?
            .into_iter()
            .find(|s| s.id == sign_up_id)
            .ok_or_else(|| SignupError::Internal(format!("sign-up {} vanished", sign_up_id)))?;

        if !record.status.can_transition_to(status) {
            return Err(SignupError::Internal(format!(
                "illegal transition {} -> {} for sign-up {}",
                record.status, status, sign_up_id
            )));
        }
        record.status = status;
        record.updated_at = Utc::now();
        self.staged_sign_ups.insert(record.id, record.clone());
        Ok(record)
    }

    async fn oldest_waitlisted(&mut self, slot_id: i64) -> Result<Option<EventSignUp>> {
        Ok(self
            .merged_sign_ups()?
            .into_iter()
            .filter(|s| s.slot_id == slot_id && s.status == EventParticipationStatus::OnWaitlist)
            .min_by_key(|s| (s.created_at, s.id)))
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<()> {
        let mut state = self.store.state.lock().map_err(poisoned)?;

        // Same check the partial unique index performs in Postgres.
        for staged in self.staged_sign_ups.values().filter(|s| s.is_active()) {
            let duplicate = state.sign_ups.values().any(|existing| {
                existing.id != staged.id
                    && existing.user_id == staged.user_id
                    && existing.event_id == staged.event_id
                    && existing.is_active()
                    && self
                        .staged_sign_ups
                        .get(&existing.id)
                        .map_or(true, |overlay| overlay.is_active())
            });
            if duplicate {
                return Err(SignupError::AlreadySignedUp {
                    user_id: staged.user_id,
                    event_id: staged.event_id,
                });
            }
        }

        for (slot_id, count) in &self.staged_counts {
            if let Some(slot) = state.slots.get_mut(slot_id) {
                slot.confirmed_count = *count;
            }
        }
        for (id, sign_up) in &self.staged_sign_ups {
            state.sign_ups.insert(*id, sign_up.clone());
        }

        Ok(())
    }
}
