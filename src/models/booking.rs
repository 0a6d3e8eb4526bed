use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Interval;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub barber_id: String,
    pub customer_id: String,
    pub start_at: NaiveDateTime,
    /// Sum of the line items' snapshotted durations.
    pub duration_minutes: i64,
    pub status: BookingStatus,
    pub note: Option<String>,
    pub services: Vec<BookingServiceLine>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A service as it was priced and timed when the booking was made.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingServiceLine {
    pub service_id: String,
    pub price_cents: i64,
    pub duration_minutes: i64,
}

impl Booking {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start_at, self.duration_minutes)
    }

    pub fn total_price_cents(&self) -> i64 {
        self.services.iter().map(|s| s.price_cents).sum()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether a booking in this state blocks its time interval.
    pub fn is_occupying(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

/// A booking request that has already passed boundary validation.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub customer_id: String,
    pub barber_id: String,
    pub service_ids: Vec<String>,
    pub start_at: NaiveDateTime,
    pub note: Option<String>,
    pub idempotency_key: Option<String>,
}
