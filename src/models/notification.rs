use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// In-app notification shown to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub booking_id: Option<String>,
    pub read: bool,
    pub created_at: NaiveDateTime,
}

/// Everything a delivery channel needs to announce a new booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    pub booking_id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub barber_id: String,
    pub barber_user_id: String,
    pub barber_name: String,
    pub date: NaiveDate,
    pub time: String,
    pub services: Vec<ServiceSummary>,
    pub total_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub name: String,
    pub price_cents: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Push,
    Realtime,
    Webhook,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelResult {
    pub channel: ChannelKind,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub success: bool,
    pub results: Vec<ChannelResult>,
}

impl DispatchReport {
    pub fn failed_channels(&self) -> Vec<ChannelKind> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.channel)
            .collect()
    }
}
