use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::queries::{self, BookingFilter};
use crate::errors::{AppError, AppResult};
use crate::models::working_hours::{parse_date, parse_time};
use crate::models::{Booking, BookingStatus, ChannelKind, NewBooking, Requester};
use crate::services::booking;
use crate::services::scheduling::{self, TracingObserver};
use crate::state::AppState;

const IDEMPOTENCY_HEADER: &str = "idempotency-key";
const MAX_NOTE_CHARS: usize = 500;

// GET /bookings/available-times
#[derive(Debug, Deserialize)]
pub struct AvailableTimesQuery {
    #[serde(rename = "barberId", alias = "barbiereId")]
    pub barber_id: Option<String>,
    #[serde(alias = "data")]
    pub date: Option<String>,
    #[serde(alias = "durata")]
    pub duration: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AvailableTimesResponse {
    success: bool,
    times: Vec<String>,
}

fn required<'a>(value: &'a Option<String>, name: &str) -> AppResult<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("missing parameter: {name}")))
}

pub async fn available_times(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailableTimesQuery>,
) -> AppResult<Json<AvailableTimesResponse>> {
    let barber_id = required(&query.barber_id, "barberId")?;
    let date = parse_date(required(&query.date, "date")?)?;
    let duration: i64 = required(&query.duration, "duration")?
        .parse()
        .map_err(|_| AppError::Validation("duration must be a whole number of minutes".to_string()))?;
    scheduling::validate_duration(duration)?;

    let times = {
        let db = state.db()?;
        scheduling::available_slots(
            &db,
            barber_id,
            date,
            duration,
            state.config.slot_step_minutes,
            Some(&TracingObserver),
        )?
    };

    tracing::debug!(barber_id, %date, duration, count = times.len(), "computed available times");
    Ok(Json(AvailableTimesResponse {
        success: true,
        times,
    }))
}

// POST /bookings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[serde(alias = "barbiereId")]
    pub barber_id: Option<String>,
    #[serde(default)]
    pub servizi: Vec<String>,
    pub data: Option<String>,
    pub ora: Option<String>,
    pub note: Option<String>,
    pub idempotency_key: Option<String>,
}

impl CreateBookingRequest {
    /// Checks shape and formats; references are resolved by the booking writer.
    pub fn validate(self, customer_id: &str, header_key: Option<&str>) -> AppResult<NewBooking> {
        let barber_id = required(&self.barber_id, "barberId")?.to_string();
        if self.servizi.is_empty() {
            return Err(AppError::Validation("select at least one service".to_string()));
        }
        if self.servizi.iter().any(|s| s.trim().is_empty()) {
            return Err(AppError::Validation("service ids cannot be empty".to_string()));
        }
        let date = parse_date(required(&self.data, "data")?)?;
        let time = parse_time(required(&self.ora, "ora")?)?;

        let note = self
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if note.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTE_CHARS) {
            return Err(AppError::Validation(format!(
                "note cannot exceed {MAX_NOTE_CHARS} characters"
            )));
        }

        let idempotency_key = self
            .idempotency_key
            .as_deref()
            .or(header_key)
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        Ok(NewBooking {
            customer_id: customer_id.to_string(),
            barber_id,
            service_ids: self.servizi.into_iter().map(|s| s.trim().to_string()).collect(),
            start_at: date.and_time(time),
            note,
            idempotency_key,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingResponse {
    success: bool,
    booking_id: String,
    replayed: bool,
    /// Notification channels that could not be reached.
    warnings: Vec<ChannelKind>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    headers: HeaderMap,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CreateBookingResponse>)> {
    let Json(payload) =
        payload.map_err(|e| AppError::Validation(format!("invalid request body: {}", e.body_text())))?;

    let header_key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok());
    let request = payload.validate(&requester.user_id, header_key)?;

    tracing::info!(
        customer_id = %request.customer_id,
        barber_id = %request.barber_id,
        start_at = %request.start_at,
        services = request.service_ids.len(),
        "booking requested"
    );

    let outcome = booking::create_booking(&state, request).await?;

    let status = if outcome.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(CreateBookingResponse {
            success: true,
            booking_id: outcome.booking.id,
            replayed: outcome.replayed,
            warnings: outcome.failed_channels,
        }),
    ))
}

// DELETE /bookings/:id
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    {
        let mut db = state.db()?;
        booking::cancel_booking(&mut db, &requester, &id)?;
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "booking cancelled",
    })))
}

// POST /bookings/:id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let points = {
        let mut db = state.db()?;
        booking::complete_booking(
            &mut db,
            &requester,
            &id,
            state.config.points_per_euro,
            Utc::now().naive_utc(),
        )?
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "pointsAwarded": points,
    })))
}

#[derive(Debug, Serialize)]
pub struct BookingsResponse {
    success: bool,
    data: Vec<Booking>,
}

// GET /bookings/my
pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    requester: Requester,
) -> AppResult<Json<BookingsResponse>> {
    let data = {
        let db = state.db()?;
        queries::get_bookings_for_customer(&db, &requester.user_id)?
    };

    Ok(Json(BookingsResponse {
        success: true,
        data,
    }))
}

// GET /admin/bookings
#[derive(Debug, Deserialize)]
pub struct AdminBookingsQuery {
    pub status: Option<String>,
    #[serde(rename = "barberId")]
    pub barber_id: Option<String>,
    pub date: Option<String>,
    pub limit: Option<i64>,
}

pub async fn admin_bookings(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Query(query): Query<AdminBookingsQuery>,
) -> AppResult<Json<BookingsResponse>> {
    if !requester.is_admin() {
        return Err(AppError::Forbidden("admin role required".to_string()));
    }

    let status = query
        .status
        .as_deref()
        .map(|s| {
            BookingStatus::parse(s)
                .ok_or_else(|| AppError::Validation(format!("unknown booking status: {s}")))
        })
        .transpose()?;
    let date = query.date.as_deref().map(parse_date).transpose()?;

    let filter = BookingFilter {
        status,
        barber_id: query.barber_id,
        date,
        limit: query.limit.unwrap_or(50).clamp(1, 500),
    };

    let data = {
        let db = state.db()?;
        queries::list_bookings(&db, &filter)?
    };

    Ok(Json(BookingsResponse {
        success: true,
        data,
    }))
}
