//! Postgres integration tests
//!
//! Exercise the repositories, the row locks and the schema constraints
//! against a real database. Skipped unless `TEST_DATABASE_URL` is set.

mod helpers;

use assert_matches::assert_matches;
use futures::future::join_all;
use helpers::*;
use serial_test::serial;
use SignupEngine::database::{EventCatalog, SignUpRecordStore, SignUpStore, SlotCapacityStore};
use SignupEngine::models::EventParticipationStatus::{Confirmed, OnWaitlist, Retracted};
use SignupEngine::models::NewSignUp;
use SignupEngine::SignupError;

#[tokio::test]
#[serial]
async fn test_pg_event_round_trip() {
    let Some(db) = TestDatabase::connect().await else { return };

    let (event, slots) = db.service.create_event(slotted_event_request(&[4, 2])).await.unwrap();
    let found = db.service.events.find_event(event.id).await.unwrap().unwrap();
    assert_eq!(found.name, "Workshop");
    assert_eq!(found.created_by, Some(ORGANIZER_ID));

    let listed = db.service.events.slots_for_event(event.id).await.unwrap();
    assert_eq!(listed, slots);
    assert_eq!(listed.iter().map(|s| s.capacity).collect::<Vec<_>>(), vec![4, 2]);
    assert!(db.service.events.find_event(event.id + 1000).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_pg_capacity_two_with_three_users() {
    let Some(db) = TestDatabase::connect().await else { return };
    let services = db.services();
    let engine = &services.sign_up_service;
    let (event, _) = db.service.create_event(event_request(2)).await.unwrap();

    assert_eq!(engine.sign_up(11, event.id).await.unwrap().status, Confirmed);
    assert_eq!(engine.sign_up(12, event.id).await.unwrap().status, Confirmed);
    let third = engine.sign_up(13, event.id).await.unwrap();
    assert_eq!(third.status, OnWaitlist);

    let withdrawal = engine.retract_sign_up(11, event.id).await.unwrap();
    assert_eq!(withdrawal.withdrawn.status, Retracted);
    assert_eq!(withdrawal.promoted.map(|s| s.id), Some(third.id));

    let availability = engine.get_availability(event.id).await.unwrap();
    assert_eq!(availability.total_confirmed(), 2);
    assert_eq!(availability.total_waitlisted(), 0);
    assert_eq!(
        engine.get_sign_up(11, event.id).await.unwrap().map(|s| s.status),
        Some(Retracted)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[serial]
async fn test_pg_fifty_users_race_for_one_seat() {
    let Some(db) = TestDatabase::connect().await else { return };
    let services = db.services();
    let (event, _) = db.service.create_event(event_request(1)).await.unwrap();
    let event_id = event.id;

    let tasks = (1..=50).map(|user_id| {
        let engine = services.sign_up_service.clone();
        tokio::spawn(async move { engine.sign_up(user_id, event_id).await })
    });
    let statuses: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked").expect("sign-up failed").status)
        .collect();

    assert_eq!(statuses.iter().filter(|s| **s == Confirmed).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == OnWaitlist).count(), 49);

    let availability = services.sign_up_service.get_availability(event.id).await.unwrap();
    assert_eq!(availability.total_confirmed(), 1);
    assert_eq!(availability.total_waitlisted(), 49);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_pg_simultaneous_retractions_promote_once() {
    let Some(db) = TestDatabase::connect().await else { return };
    let services = db.services();
    let (event, _) = db.service.create_event(event_request(2)).await.unwrap();
    let event_id = event.id;

    for user_id in [21, 22, 23] {
        services.sign_up_service.sign_up(user_id, event.id).await.unwrap();
    }

    let tasks = [21, 22].map(|user_id| {
        let engine = services.sign_up_service.clone();
        tokio::spawn(async move { engine.retract_sign_up(user_id, event_id).await })
    });
    let promoted: Vec<i64> = join_all(tasks)
        .await
        .into_iter()
        .filter_map(|joined| joined.expect("task panicked").expect("retract failed").promoted)
        .map(|s| s.user_id)
        .collect();

    assert_eq!(promoted, vec![23]);
    let availability = services.sign_up_service.get_availability(event.id).await.unwrap();
    assert_eq!(availability.total_confirmed(), 1);
}

#[tokio::test]
#[serial]
async fn test_pg_unique_index_rejects_second_active_record() {
    let Some(db) = TestDatabase::connect().await else { return };
    let (event, slots) = db.service.create_event(slotted_event_request(&[3, 3])).await.unwrap();

    let mut first = db.service.sign_ups.begin().await.unwrap();
    first.lock_slot(slots[0].id).await.unwrap();
    first
        .insert(NewSignUp {
            event_id: event.id,
            slot_id: slots[0].id,
            user_id: 31,
            status: OnWaitlist,
        })
        .await
        .unwrap();
    first.commit().await.unwrap();

    // A different slot lock does not bypass the per-event uniqueness.
    let mut second = db.service.sign_ups.begin().await.unwrap();
    second.lock_slot(slots[1].id).await.unwrap();
    assert_matches!(
        second
            .insert(NewSignUp {
                event_id: event.id,
                slot_id: slots[1].id,
                user_id: 31,
                status: OnWaitlist,
            })
            .await,
        Err(SignupError::AlreadySignedUp { user_id: 31, .. })
    );
    drop(second);

    assert_eq!(db.count_records("event_sign_ups").await.unwrap(), 1);
}

#[tokio::test]
#[serial]
async fn test_pg_counter_cannot_exceed_capacity() {
    let Some(db) = TestDatabase::connect().await else { return };
    let (_, slots) = db.service.create_event(event_request(1)).await.unwrap();
    let slot_id = slots[0].id;

    let mut uow = db.service.sign_ups.begin().await.unwrap();
    uow.lock_slot(slot_id).await.unwrap();
    assert_eq!(uow.adjust_confirmed_count(slot_id, 1).await.unwrap(), 1);
    assert!(uow.adjust_confirmed_count(slot_id, 1).await.is_err());
    drop(uow);

    // Nothing was committed.
    let availability = db.service.sign_ups.availability(slots[0].event_id).await.unwrap();
    assert_eq!(availability[0].confirmed_count, 0);

    let raw = sqlx::query("UPDATE slots SET confirmed_count = capacity + 1 WHERE id = $1")
        .bind(slot_id)
        .execute(&db.pool)
        .await;
    assert!(raw.is_err(), "check constraint should reject an overfull slot");
}

#[tokio::test]
#[serial]
async fn test_pg_remove_requires_permission() {
    let Some(db) = TestDatabase::connect().await else { return };
    let services = db.services();
    let engine = &services.sign_up_service;
    let (event, _) = db.service.create_event(event_request(1)).await.unwrap();

    engine.sign_up(41, event.id).await.unwrap();
    engine.sign_up(42, event.id).await.unwrap();

    assert_matches!(
        engine.remove_sign_up(42, event.id, 41).await,
        Err(SignupError::PermissionDenied(_))
    );
    let withdrawal = engine.remove_sign_up(ORGANIZER_ID, event.id, 41).await.unwrap();
    assert_eq!(withdrawal.promoted.map(|s| s.user_id), Some(42));

    let listed = engine.list_sign_ups(ADMIN_ID, event.id).await.unwrap();
    assert_eq!(listed.iter().map(|s| s.user_id).collect::<Vec<_>>(), vec![41, 42]);
}

#[tokio::test]
#[serial]
async fn test_pg_health_check() {
    let Some(db) = TestDatabase::connect().await else { return };
    db.service.health_check().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn test_pg_lock_wait_is_retried_before_attempt_deadline() {
    let Some(db) = TestDatabase::connect_with(|settings| {
        settings.engine.lock_timeout_ms = 100;
        settings.engine.transaction_timeout_ms = 5_000;
        settings.engine.max_retries = 2;
    })
    .await
    else {
        return;
    };
    let services = db.services();
    let (event, slots) = db.service.create_event(event_request(1)).await.unwrap();

    let mut blocker = db.service.sign_ups.begin().await.unwrap();
    blocker.lock_slot(slots[0].id).await.unwrap();

    let started = std::time::Instant::now();
    let result = services.sign_up_service.sign_up(51, event.id).await;
    let elapsed = started.elapsed();
    drop(blocker);

    // Every attempt hit lock_timeout (55P03) and was retried as a conflict.
    assert_matches!(result, Err(SignupError::Internal(_)));
    assert!(elapsed < std::time::Duration::from_millis(5_000), "took {:?}", elapsed);
    assert_eq!(db.count_records("event_sign_ups").await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn test_pg_sign_up_succeeds_once_slot_lock_is_released() {
    let Some(db) = TestDatabase::connect_with(|settings| {
        settings.engine.lock_timeout_ms = 100;
        settings.engine.transaction_timeout_ms = 5_000;
        settings.engine.max_retries = 10;
    })
    .await
    else {
        return;
    };
    let services = db.services();
    let (event, slots) = db.service.create_event(event_request(1)).await.unwrap();
    let event_id = event.id;

    let mut blocker = db.service.sign_ups.begin().await.unwrap();
    blocker.lock_slot(slots[0].id).await.unwrap();

    let engine = services.sign_up_service.clone();
    let pending = tokio::spawn(async move { engine.sign_up(52, event_id).await });
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    drop(blocker);

    let sign_up = pending.await.expect("task panicked").expect("sign-up failed");
    assert_eq!(sign_up.status, Confirmed);
}
