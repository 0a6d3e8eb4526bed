use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::models::BookingDetails;
use crate::services::notifications::NotificationDispatcher;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub notifier: NotificationDispatcher,
    /// Live feed of newly created bookings, served over SSE.
    pub booking_events: broadcast::Sender<BookingDetails>,
}

impl AppState {
    pub fn db(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".to_string()))
    }
}
