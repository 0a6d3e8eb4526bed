//! Slot generation and the overlap checks shared with the booking writer.
//!
//! Availability is always derived from the current booking rows; nothing is
//! cached between calls.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::working_hours::{format_time, weekday_index};
use crate::models::{Booking, Interval, WorkingHours};

/// Longest duration a single appointment may request.
pub const MAX_REQUESTED_MINUTES: i64 = 24 * 60;

/// Why a candidate start time was accepted or skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotVerdict {
    Accepted,
    /// The requested duration runs past the end of the working window.
    ExceedsWindow,
    /// Collides with the booking occupying `[start, end)`.
    Overlaps(Interval),
}

/// Receives one decision per candidate start time.
pub trait SlotObserver {
    fn observe(&self, candidate: NaiveDateTime, verdict: SlotVerdict);
}

/// Emits slot decisions as `trace` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SlotObserver for TracingObserver {
    fn observe(&self, candidate: NaiveDateTime, verdict: SlotVerdict) {
        match verdict {
            SlotVerdict::Accepted => tracing::trace!(%candidate, "slot accepted"),
            SlotVerdict::ExceedsWindow => tracing::trace!(%candidate, "slot exceeds working window"),
            SlotVerdict::Overlaps(occupied) => tracing::trace!(
                %candidate,
                occupied_start = %occupied.start,
                occupied_end = %occupied.end,
                "slot overlaps existing booking"
            ),
        }
    }
}

pub fn validate_duration(duration_minutes: i64) -> AppResult<()> {
    if duration_minutes <= 0 {
        return Err(AppError::Validation(
            "requested duration must be a positive number of minutes".to_string(),
        ));
    }
    if duration_minutes > MAX_REQUESTED_MINUTES {
        return Err(AppError::Validation(format!(
            "requested duration cannot exceed {MAX_REQUESTED_MINUTES} minutes"
        )));
    }
    Ok(())
}

/// Start times on `date` where `duration_minutes` fits inside a working window
/// without touching any occupied interval, in ascending order.
///
/// Candidates are walked on a `step_minutes` grid anchored at each window's
/// start. Windows are merged, so overlapping windows never yield duplicates.
pub fn compute_available_slots(
    date: NaiveDate,
    windows: &[WorkingHours],
    occupied: &[Interval],
    duration_minutes: i64,
    step_minutes: i64,
    observer: Option<&dyn SlotObserver>,
) -> AppResult<Vec<NaiveTime>> {
    validate_duration(duration_minutes)?;
    if step_minutes <= 0 {
        return Err(AppError::Validation("slot step must be positive".to_string()));
    }

    let step = Duration::minutes(step_minutes);
    let mut slots = BTreeSet::new();

    for window in windows {
        let window = window.on(date);
        let mut candidate = window.start;

        while candidate < window.end {
            let requested = Interval::new(candidate, duration_minutes);

            let verdict = if requested.end > window.end {
                SlotVerdict::ExceedsWindow
            } else if let Some(busy) = occupied.iter().find(|busy| busy.overlaps(&requested)) {
                SlotVerdict::Overlaps(*busy)
            } else {
                SlotVerdict::Accepted
            };

            if let Some(observer) = observer {
                observer.observe(candidate, verdict);
            }
            if verdict == SlotVerdict::Accepted {
                slots.insert(candidate.time());
            }

            candidate += step;
        }
    }

    Ok(slots.into_iter().collect())
}

/// The first occupying booking whose interval overlaps `requested`.
pub fn find_conflict<'a>(bookings: &'a [Booking], requested: &Interval) -> Option<&'a Booking> {
    bookings
        .iter()
        .filter(|b| b.status.is_occupying())
        .find(|b| b.interval().overlaps(requested))
}

/// Whether `requested` lies entirely inside one of the windows placed on `date`.
pub fn fits_working_hours(windows: &[WorkingHours], date: NaiveDate, requested: &Interval) -> bool {
    windows.iter().any(|w| w.on(date).contains(requested))
}

/// Reads the barber's windows and bookings for `date` and returns free start times as `HH:MM`.
pub fn available_slots(
    conn: &Connection,
    barber_id: &str,
    date: NaiveDate,
    duration_minutes: i64,
    step_minutes: i64,
    observer: Option<&dyn SlotObserver>,
) -> AppResult<Vec<String>> {
    validate_duration(duration_minutes)?;

    if queries::get_barber(conn, barber_id)?.is_none() {
        return Err(AppError::NotFound("barber".to_string()));
    }

    let windows = queries::get_working_hours(conn, barber_id, weekday_index(date))?;
    if windows.is_empty() {
        tracing::debug!(barber_id, %date, "barber does not work on this day");
        return Ok(vec![]);
    }

    let occupied: Vec<Interval> = queries::get_occupying_bookings(conn, barber_id, date)?
        .iter()
        .map(Booking::interval)
        .collect();

    let slots = compute_available_slots(
        date,
        &windows,
        &occupied,
        duration_minutes,
        step_minutes,
        observer,
    )?;

    Ok(slots.into_iter().map(format_time).collect())
}
