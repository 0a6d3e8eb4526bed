use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use super::NotificationChannel;
use crate::db::queries;
use crate::models::{BookingDetails, ChannelKind, Notification};

/// Writes in-app notifications for the barber and the customer.
pub struct PushChannel {
    db: Arc<Mutex<Connection>>,
}

impl PushChannel {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

const MONTHS_IT: [&str; 12] = [
    "gennaio", "febbraio", "marzo", "aprile", "maggio", "giugno", "luglio", "agosto", "settembre",
    "ottobre", "novembre", "dicembre",
];

/// `16 giugno 2025`
fn long_date(date: NaiveDate) -> String {
    format!(
        "{:02} {} {}",
        date.day(),
        MONTHS_IT[date.month0() as usize],
        date.year()
    )
}

fn notification(user_id: &str, title: &str, message: String, booking_id: &str) -> Notification {
    Notification {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        kind: "booking".to_string(),
        title: title.to_string(),
        message,
        booking_id: Some(booking_id.to_string()),
        read: false,
        created_at: Utc::now().naive_utc(),
    }
}

#[async_trait]
impl NotificationChannel for PushChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Push
    }

    async fn deliver(&self, details: &BookingDetails) -> anyhow::Result<()> {
        let date = long_date(details.date);

        let for_barber = notification(
            &details.barber_user_id,
            "Nuova Prenotazione",
            format!(
                "Nuova prenotazione da {} per il {date} alle {}",
                details.customer_name, details.time
            ),
            &details.booking_id,
        );
        let for_customer = notification(
            &details.customer_id,
            "Prenotazione Confermata",
            format!(
                "La tua prenotazione con {} per il {date} alle {} è confermata",
                details.barber_name, details.time
            ),
            &details.booking_id,
        );

        let db = self
            .db
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;
        queries::insert_notification(&db, &for_barber)?;
        queries::insert_notification(&db, &for_customer)?;
        Ok(())
    }
}
