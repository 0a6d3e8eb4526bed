pub mod account;
pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod events;
pub mod health;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/available-times", get(bookings::available_times))
        .route("/bookings/my", get(bookings::my_bookings))
        .route("/bookings/events", get(events::booking_events))
        .route("/bookings/:id", delete(bookings::cancel_booking))
        .route("/bookings/:id/complete", post(bookings::complete_booking))
        .route("/admin/bookings", get(bookings::admin_bookings))
        .route("/barbers", get(catalog::list_barbers))
        .route("/barbers/:id/working-hours", get(catalog::working_hours))
        .route("/services", get(catalog::list_services))
        .route("/points/my", get(account::my_points))
        .route("/notifications", get(account::list_notifications))
        .route("/notifications/:id/read", post(account::mark_read))
        .route("/notifications/all", delete(account::delete_read))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
