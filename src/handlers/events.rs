use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::{Stream, StreamExt};

use crate::models::{BookingDetails, Requester, Role};
use crate::state::AppState;

/// Admins see every booking; barbers and clients only the ones they take part in.
pub fn visible_to(requester: &Requester, details: &BookingDetails) -> bool {
    match requester.role {
        Role::Admin => true,
        Role::Barber => details.barber_user_id == requester.user_id,
        Role::Client => details.customer_id == requester.user_id,
    }
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Only forward bookings for this barber.
    #[serde(rename = "barberId")]
    pub barber_id: Option<String>,
}

// GET /bookings/events
pub async fn booking_events(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.booking_events.subscribe();
    let barber_filter = query.barber_id;

    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(details) => {
            if !visible_to(&requester, &details) {
                return None;
            }
            if barber_filter
                .as_deref()
                .is_some_and(|barber_id| barber_id != details.barber_id)
            {
                return None;
            }
            let data = serde_json::to_string(&details).unwrap_or_default();
            Some(Ok::<_, Infallible>(
                Event::default().data(data).event("booking_created"),
            ))
        }
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "booking event subscriber lagged");
            None
        }
    });

    let keepalive_stream = IntervalStream::new(tokio::time::interval(Duration::from_secs(30)))
        .map(|_| Ok::<_, Infallible>(Event::default().comment("keepalive")));

    Sse::new(live_stream.merge(keepalive_stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn details() -> BookingDetails {
        BookingDetails {
            booking_id: "b-1".to_string(),
            customer_id: "u-client".to_string(),
            customer_name: "Paolo Verdi".to_string(),
            barber_id: "barber-1".to_string(),
            barber_user_id: "u-barber".to_string(),
            barber_name: "Mario Rossi".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
            time: "10:00".to_string(),
            services: vec![],
            total_cents: 2500,
        }
    }

    fn requester(user_id: &str, role: Role) -> Requester {
        Requester {
            user_id: user_id.to_string(),
            role,
        }
    }

    #[test]
    fn test_visibility_by_role() {
        let details = details();
        assert!(visible_to(&requester("u-admin", Role::Admin), &details));
        assert!(visible_to(&requester("u-barber", Role::Barber), &details));
        assert!(visible_to(&requester("u-client", Role::Client), &details));

        assert!(!visible_to(&requester("u-other-barber", Role::Barber), &details));
        assert!(!visible_to(&requester("u-other", Role::Client), &details));
        // a client id never matches on the barber side
        assert!(!visible_to(&requester("u-barber", Role::Client), &details));
    }
}
