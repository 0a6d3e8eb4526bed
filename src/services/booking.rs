//! Booking writer, cancellation and completion.
//!
//! Every write runs in a `BEGIN IMMEDIATE` transaction: SQLite hands out its
//! single writer lock before the availability re-check, so two requests for
//! overlapping intervals are serialised and the second one sees the first.

use std::collections::HashSet;

use chrono::{Duration, NaiveDateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::working_hours::{format_time, weekday_index};
use crate::models::{
    Booking, BookingDetails, BookingServiceLine, BookingStatus, ChannelKind, Interval, NewBooking,
    Requester, Role, ServiceSummary,
};
use crate::services::scheduling;
use crate::state::AppState;

/// A committed booking. `details` is present only when the booking was newly created.
#[derive(Debug)]
pub struct Reservation {
    pub booking: Booking,
    pub details: Option<BookingDetails>,
}

impl Reservation {
    pub fn replayed(&self) -> bool {
        self.details.is_none()
    }
}

#[derive(Debug)]
pub struct BookingOutcome {
    pub booking: Booking,
    pub replayed: bool,
    /// Notification channels that failed; the booking stands regardless.
    pub failed_channels: Vec<ChannelKind>,
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Reserves the requested slot, then notifies best-effort.
pub async fn create_booking(state: &AppState, request: NewBooking) -> AppResult<BookingOutcome> {
    let reservation = {
        let mut db = state.db()?;
        reserve(
            &mut db,
            &request,
            Duration::seconds(state.config.idempotency_window_secs),
            now(),
        )?
    };

    let Some(details) = reservation.details else {
        tracing::info!(booking_id = %reservation.booking.id, "replayed booking request");
        return Ok(BookingOutcome {
            booking: reservation.booking,
            replayed: true,
            failed_channels: vec![],
        });
    };

    let report = state.notifier.send_booking_notifications(&details).await;

    Ok(BookingOutcome {
        booking: reservation.booking,
        replayed: false,
        failed_channels: report.failed_channels(),
    })
}

/// Check-then-insert for a booking, as one transaction.
pub fn reserve(
    conn: &mut Connection,
    request: &NewBooking,
    idempotency_window: Duration,
    now: NaiveDateTime,
) -> AppResult<Reservation> {
    if request.service_ids.is_empty() {
        return Err(AppError::Validation("select at least one service".to_string()));
    }
    let mut seen = HashSet::with_capacity(request.service_ids.len());
    if !request.service_ids.iter().all(|id| seen.insert(id.as_str())) {
        return Err(AppError::Validation(
            "each service can be selected only once".to_string(),
        ));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let since = now - idempotency_window;
    let expired = queries::purge_idempotency_keys(&tx, &since)?;
    if expired > 0 {
        tracing::debug!(expired, "purged expired idempotency keys");
    }

    if let Some(key) = &request.idempotency_key {
        if let Some(booking_id) =
            queries::find_idempotent_booking(&tx, &request.customer_id, key, &since)?
        {
            if let Some(booking) = queries::get_booking(&tx, &booking_id)? {
                tx.commit()?;
                return Ok(Reservation {
                    booking,
                    details: None,
                });
            }
        }
    }

    let customer = queries::get_user(&tx, &request.customer_id)?
        .ok_or_else(|| AppError::NotFound("customer".to_string()))?;
    let barber = queries::get_barber(&tx, &request.barber_id)?
        .ok_or_else(|| AppError::NotFound("barber".to_string()))?;

    let mut services = Vec::with_capacity(request.service_ids.len());
    for service_id in &request.service_ids {
        let service = queries::get_service(&tx, service_id)?
            .ok_or_else(|| AppError::NotFound(format!("service {service_id}")))?;
        services.push(service);
    }

    let total_minutes: i64 = services.iter().map(|s| s.duration_minutes).sum();
    let requested = Interval::new(request.start_at, total_minutes);
    let date = request.start_at.date();

    let windows = queries::get_working_hours(&tx, &barber.id, weekday_index(date))?;
    if !scheduling::fits_working_hours(&windows, date, &requested) {
        return Err(AppError::Validation(
            "the requested time is outside the barber's working hours".to_string(),
        ));
    }

    let existing = queries::get_occupying_bookings(&tx, &barber.id, date)?;
    if let Some(conflict) = scheduling::find_conflict(&existing, &requested) {
        tracing::info!(
            barber_id = %barber.id,
            requested_start = %requested.start,
            conflicting_booking = %conflict.id,
            "slot no longer available"
        );
        return Err(AppError::Conflict(
            "the selected time is no longer available, please pick another time".to_string(),
        ));
    }

    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        barber_id: barber.id.clone(),
        customer_id: customer.id.clone(),
        start_at: request.start_at,
        duration_minutes: total_minutes,
        status: BookingStatus::Confirmed,
        note: request.note.clone(),
        services: services
            .iter()
            .map(|s| BookingServiceLine {
                service_id: s.id.clone(),
                price_cents: s.price_cents,
                duration_minutes: s.duration_minutes,
            })
            .collect(),
        created_at: now,
        updated_at: now,
    };

    queries::insert_booking(&tx, &booking)?;
    if let Some(key) = &request.idempotency_key {
        queries::record_idempotency_key(&tx, &customer.id, key, &booking.id, &now)?;
    }
    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        barber_id = %booking.barber_id,
        start_at = %booking.start_at,
        duration_minutes = booking.duration_minutes,
        "booking created"
    );

    let details = BookingDetails {
        booking_id: booking.id.clone(),
        customer_id: customer.id.clone(),
        customer_name: customer.full_name(),
        barber_id: barber.id.clone(),
        barber_user_id: barber.user_id.clone(),
        barber_name: barber.display_name(),
        date,
        time: format_time(booking.start_at.time()),
        services: services
            .iter()
            .map(|s| ServiceSummary {
                name: s.name.clone(),
                price_cents: s.price_cents,
            })
            .collect(),
        total_cents: booking.total_price_cents(),
    };

    Ok(Reservation {
        booking,
        details: Some(details),
    })
}

/// Deletes a booking and its line items. Only the customer or an admin may cancel.
pub fn cancel_booking(
    conn: &mut Connection,
    requester: &Requester,
    booking_id: &str,
) -> AppResult<Booking> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let booking = queries::get_booking(&tx, booking_id)?
        .ok_or_else(|| AppError::NotFound("booking".to_string()))?;

    if booking.customer_id != requester.user_id && !requester.is_admin() {
        return Err(AppError::Forbidden(
            "you do not have permission to cancel this booking".to_string(),
        ));
    }

    queries::delete_booking(&tx, &booking.id)?;
    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        requester = %requester.user_id,
        "booking cancelled"
    );
    Ok(booking)
}

/// Marks a booking completed and credits the customer's loyalty points.
/// Returns the points awarded.
pub fn complete_booking(
    conn: &mut Connection,
    requester: &Requester,
    booking_id: &str,
    points_per_euro: i64,
    now: NaiveDateTime,
) -> AppResult<i64> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let booking = queries::get_booking(&tx, booking_id)?
        .ok_or_else(|| AppError::NotFound("booking".to_string()))?;

    let allowed = match requester.role {
        Role::Admin => true,
        Role::Barber => queries::get_barber_by_user(&tx, &requester.user_id)?
            .is_some_and(|barber| barber.id == booking.barber_id),
        Role::Client => false,
    };
    if !allowed {
        return Err(AppError::Forbidden(
            "only the assigned barber or an admin can complete this booking".to_string(),
        ));
    }

    match booking.status {
        BookingStatus::Completed => {
            return Err(AppError::Conflict("booking is already completed".to_string()))
        }
        BookingStatus::Cancelled => {
            return Err(AppError::Conflict("booking was cancelled".to_string()))
        }
        BookingStatus::Pending | BookingStatus::Confirmed => {}
    }

    queries::update_booking_status(&tx, &booking.id, BookingStatus::Completed, &now)?;

    let points = booking.total_price_cents() / 100 * points_per_euro;
    if points > 0 {
        queries::add_points(&tx, &booking.customer_id, points)?;
    }
    tx.commit()?;

    tracing::info!(booking_id = %booking.id, points, "booking completed");
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::seed::{self, DemoIds};

    fn setup() -> (Connection, DemoIds) {
        let conn = db::init_db(":memory:").unwrap();
        let ids = seed::seed_demo_data(&conn).unwrap();
        (conn, ids)
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn request(ids: &DemoIds, customer: &str, services: &[&str], start: &str) -> NewBooking {
        NewBooking {
            customer_id: customer.to_string(),
            barber_id: ids.barber_mario.clone(),
            service_ids: services.iter().map(|s| s.to_string()).collect(),
            start_at: dt(start),
            note: None,
            idempotency_key: None,
        }
    }

    fn window() -> Duration {
        Duration::minutes(10)
    }

    fn client(id: &str) -> Requester {
        Requester {
            user_id: id.to_string(),
            role: Role::Client,
        }
    }

    #[test]
    fn test_reserve_snapshots_services() {
        let (mut conn, ids) = setup();
        let req = request(
            &ids,
            &ids.client_paolo,
            &[&ids.service_cut, &ids.service_beard],
            "2025-06-16 10:00",
        );

        let reservation = reserve(&mut conn, &req, window(), dt("2025-06-10 08:00")).unwrap();
        assert!(!reservation.replayed());
        let booking = reservation.booking;
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.duration_minutes, 60);
        assert_eq!(booking.services.len(), 2);
        assert_eq!(booking.total_price_cents(), 4500);

        let details = reservation.details.unwrap();
        assert_eq!(details.customer_name, "Paolo Verdi");
        assert_eq!(details.barber_name, "Mario Rossi");
        assert_eq!(details.time, "10:00");

        let stored = queries::get_booking(&conn, &booking.id).unwrap().unwrap();
        assert_eq!(stored.services, booking.services);
    }

    #[test]
    fn test_reserve_rejects_overlap() {
        let (mut conn, ids) = setup();
        let first = request(&ids, &ids.client_paolo, &[&ids.service_combo], "2025-06-16 10:00");
        reserve(&mut conn, &first, window(), dt("2025-06-10 08:00")).unwrap();

        let second = request(&ids, &ids.client_giulia, &[&ids.service_cut], "2025-06-16 10:30");
        let err = reserve(&mut conn, &second, window(), dt("2025-06-10 08:01")).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // starts inside a free slot but runs into the existing booking
        let third = request(&ids, &ids.client_giulia, &[&ids.service_combo], "2025-06-16 09:30");
        let err = reserve(&mut conn, &third, window(), dt("2025-06-10 08:02")).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_reserve_back_to_back_succeeds() {
        let (mut conn, ids) = setup();
        let first = request(&ids, &ids.client_paolo, &[&ids.service_combo], "2025-06-16 10:00");
        reserve(&mut conn, &first, window(), dt("2025-06-10 08:00")).unwrap();

        let second = request(&ids, &ids.client_giulia, &[&ids.service_cut], "2025-06-16 11:00");
        assert!(reserve(&mut conn, &second, window(), dt("2025-06-10 08:01")).is_ok());
    }

    #[test]
    fn test_reserve_missing_references() {
        let (mut conn, ids) = setup();

        let mut req = request(&ids, &ids.client_paolo, &[&ids.service_cut], "2025-06-16 10:00");
        req.barber_id = "nope".to_string();
        assert!(matches!(
            reserve(&mut conn, &req, window(), dt("2025-06-10 08:00")),
            Err(AppError::NotFound(ref what)) if what == "barber"
        ));

        let req = request(&ids, "ghost", &[&ids.service_cut], "2025-06-16 10:00");
        assert!(matches!(
            reserve(&mut conn, &req, window(), dt("2025-06-10 08:00")),
            Err(AppError::NotFound(ref what)) if what == "customer"
        ));

        let req = request(&ids, &ids.client_paolo, &[&ids.service_cut, "missing"], "2025-06-16 10:00");
        assert!(matches!(
            reserve(&mut conn, &req, window(), dt("2025-06-10 08:00")),
            Err(AppError::NotFound(_))
        ));

        let req = request(&ids, &ids.client_paolo, &[], "2025-06-16 10:00");
        assert!(matches!(
            reserve(&mut conn, &req, window(), dt("2025-06-10 08:00")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_reserve_outside_working_hours() {
        let (mut conn, ids) = setup();
        // Sunday
        let req = request(&ids, &ids.client_paolo, &[&ids.service_cut], "2025-06-15 10:00");
        assert!(matches!(
            reserve(&mut conn, &req, window(), dt("2025-06-10 08:00")),
            Err(AppError::Validation(_))
        ));
        // 17:30 + 60 minutes runs past 18:00
        let req = request(&ids, &ids.client_paolo, &[&ids.service_combo], "2025-06-16 17:30");
        assert!(matches!(
            reserve(&mut conn, &req, window(), dt("2025-06-10 08:00")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_idempotency_key_replays_within_window() {
        let (mut conn, ids) = setup();
        let mut req = request(&ids, &ids.client_paolo, &[&ids.service_cut], "2025-06-16 10:00");
        req.idempotency_key = Some("tap-1".to_string());

        let first = reserve(&mut conn, &req, window(), dt("2025-06-10 08:00")).unwrap();
        let replay = reserve(&mut conn, &req, window(), dt("2025-06-10 08:05")).unwrap();
        assert!(replay.replayed());
        assert_eq!(replay.booking.id, first.booking.id);

        // outside the window the key is stale and the slot is now taken
        let late = reserve(&mut conn, &req, window(), dt("2025-06-10 08:30")).unwrap_err();
        assert!(matches!(late, AppError::Conflict(_)));
    }

    #[test]
    fn test_expired_idempotency_keys_are_purged() {
        let (mut conn, ids) = setup();
        let mut req = request(&ids, &ids.client_paolo, &[&ids.service_cut], "2025-06-16 10:00");
        req.idempotency_key = Some("tap-old".to_string());
        reserve(&mut conn, &req, window(), dt("2025-06-10 08:00")).unwrap();

        let count_keys = |conn: &Connection| -> i64 {
            conn.query_row("SELECT COUNT(*) FROM idempotency_keys", [], |row| row.get(0))
                .unwrap()
        };
        assert_eq!(count_keys(&conn), 1);

        // any later write past the window clears the stale key
        let other = request(&ids, &ids.client_giulia, &[&ids.service_cut], "2025-06-16 11:00");
        reserve(&mut conn, &other, window(), dt("2025-06-10 09:00")).unwrap();
        assert_eq!(count_keys(&conn), 0);
    }

    #[test]
    fn test_duplicate_services_rejected() {
        let (mut conn, ids) = setup();
        let req = request(
            &ids,
            &ids.client_paolo,
            &[&ids.service_cut, &ids.service_cut],
            "2025-06-16 10:00",
        );
        assert!(matches!(
            reserve(&mut conn, &req, window(), dt("2025-06-10 08:00")),
            Err(AppError::Validation(_))
        ));
        assert!(queries::get_occupying_bookings(&conn, &ids.barber_mario, dt("2025-06-16 00:00").date())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_idempotency_key_for_cancelled_booking_creates_new() {
        let (mut conn, ids) = setup();
        let mut req = request(&ids, &ids.client_paolo, &[&ids.service_cut], "2025-06-16 10:00");
        req.idempotency_key = Some("tap-2".to_string());

        let first = reserve(&mut conn, &req, window(), dt("2025-06-10 08:00")).unwrap();
        cancel_booking(&mut conn, &client(&ids.client_paolo), &first.booking.id).unwrap();

        let again = reserve(&mut conn, &req, window(), dt("2025-06-10 08:01")).unwrap();
        assert!(!again.replayed());
        assert_ne!(again.booking.id, first.booking.id);
    }

    #[test]
    fn test_cancel_permissions_and_absent() {
        let (mut conn, ids) = setup();
        let req = request(&ids, &ids.client_paolo, &[&ids.service_cut], "2025-06-16 10:00");
        let booking = reserve(&mut conn, &req, window(), dt("2025-06-10 08:00"))
            .unwrap()
            .booking;

        let err = cancel_booking(&mut conn, &client(&ids.client_giulia), &booking.id).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let admin = Requester {
            user_id: ids.admin.clone(),
            role: Role::Admin,
        };
        cancel_booking(&mut conn, &admin, &booking.id).unwrap();

        let err = cancel_booking(&mut conn, &admin, &booking.id).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_cancel_frees_slot() {
        let (mut conn, ids) = setup();
        let req = request(&ids, &ids.client_paolo, &[&ids.service_cut], "2025-06-16 10:00");
        let booking = reserve(&mut conn, &req, window(), dt("2025-06-10 08:00"))
            .unwrap()
            .booking;

        let date = booking.start_at.date();
        let before = scheduling::available_slots(&conn, &ids.barber_mario, date, 30, 30, None).unwrap();
        assert!(!before.contains(&"10:00".to_string()));

        cancel_booking(&mut conn, &client(&ids.client_paolo), &booking.id).unwrap();

        let after = scheduling::available_slots(&conn, &ids.barber_mario, date, 30, 30, None).unwrap();
        assert!(after.contains(&"10:00".to_string()));
    }

    #[test]
    fn test_complete_awards_points_once() {
        let (mut conn, ids) = setup();
        let req = request(
            &ids,
            &ids.client_paolo,
            &[&ids.service_cut, &ids.service_beard],
            "2025-06-16 10:00",
        );
        let booking = reserve(&mut conn, &req, window(), dt("2025-06-10 08:00"))
            .unwrap()
            .booking;

        let other_barber = Requester {
            user_id: ids.barber_luca_user.clone(),
            role: Role::Barber,
        };
        let err = complete_booking(&mut conn, &other_barber, &booking.id, 1, dt("2025-06-16 11:00")).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let barber = Requester {
            user_id: ids.barber_mario_user.clone(),
            role: Role::Barber,
        };
        let points = complete_booking(&mut conn, &barber, &booking.id, 1, dt("2025-06-16 11:00")).unwrap();
        assert_eq!(points, 45);

        let customer = queries::get_user(&conn, &ids.client_paolo).unwrap().unwrap();
        assert_eq!(customer.points, 45);

        let err = complete_booking(&mut conn, &barber, &booking.id, 1, dt("2025-06-16 11:01")).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // completed bookings still occupy their slot
        let slots = scheduling::available_slots(&conn, &ids.barber_mario, booking.start_at.date(), 30, 30, None).unwrap();
        assert!(!slots.contains(&"10:00".to_string()));
    }
}
