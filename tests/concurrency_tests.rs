use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use barbershop::db;
use barbershop::db::seed;
use barbershop::errors::AppError;
use barbershop::models::NewBooking;
use barbershop::services::booking;

fn monday_at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 16)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

// Two processes sharing one database file, each with its own connection.
#[test]
fn test_separate_connections_cannot_double_book() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("barbershop.db");
    let path = path.to_str().unwrap().to_string();

    let ids = seed::seed_demo_data(&db::init_db(&path).unwrap()).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [
        (ids.client_paolo.clone(), monday_at(10, 0)),
        (ids.client_giulia.clone(), monday_at(10, 30)),
    ]
    .into_iter()
    .map(|(customer_id, start_at)| {
        let path = path.clone();
        let barrier = Arc::clone(&barrier);
        let request = NewBooking {
            customer_id,
            barber_id: ids.barber_mario.clone(),
            service_ids: vec![ids.service_combo.clone()],
            start_at,
            note: None,
            idempotency_key: None,
        };
        thread::spawn(move || {
            let mut conn = db::init_db(&path).unwrap();
            barrier.wait();
            booking::reserve(&mut conn, &request, Duration::minutes(10), monday_at(8, 0))
        })
    })
    .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let created = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::Conflict(_))))
        .count();
    assert_eq!((created, conflicts), (1, 1), "{results:?}");

    let conn = db::init_db(&path).unwrap();
    let day = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
    let stored = db::queries::get_occupying_bookings(&conn, &ids.barber_mario, day).unwrap();
    assert_eq!(stored.len(), 1);
}

#[test]
fn test_different_barbers_book_in_parallel() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("barbershop.db");
    let path = path.to_str().unwrap().to_string();

    let ids = seed::seed_demo_data(&db::init_db(&path).unwrap()).unwrap();

    let handles: Vec<_> = [
        (ids.client_paolo.clone(), ids.barber_mario.clone()),
        (ids.client_giulia.clone(), ids.barber_luca.clone()),
    ]
    .into_iter()
    .map(|(customer_id, barber_id)| {
        let path = path.clone();
        let request = NewBooking {
            customer_id,
            barber_id,
            service_ids: vec![ids.service_cut.clone()],
            start_at: monday_at(10, 0),
            note: None,
            idempotency_key: None,
        };
        thread::spawn(move || {
            let mut conn = db::init_db(&path).unwrap();
            booking::reserve(&mut conn, &request, Duration::minutes(10), monday_at(8, 0))
        })
    })
    .collect();

    for handle in handles {
        assert!(handle.join().unwrap().is_ok());
    }
}
