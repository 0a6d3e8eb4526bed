//! Post-booking notification fan-out.
//!
//! Delivery is best-effort: each channel's failure is recorded in the
//! returned report and never reaches the booking transaction.

pub mod push;
pub mod realtime;
pub mod webhook;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::models::{BookingDetails, ChannelKind, ChannelResult, DispatchReport};

/// Upper bound on a single channel delivery.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    async fn deliver(&self, details: &BookingDetails) -> anyhow::Result<()>;
}

pub struct NotificationDispatcher {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl NotificationDispatcher {
    pub fn new(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    /// Push and realtime are always on; the webhook only when a URL is configured.
    pub fn from_config(
        config: &AppConfig,
        db: Arc<Mutex<Connection>>,
        events: broadcast::Sender<BookingDetails>,
    ) -> Self {
        let mut channels: Vec<Box<dyn NotificationChannel>> = vec![
            Box::new(push::PushChannel::new(db)),
            Box::new(realtime::RealtimeChannel::new(events)),
        ];
        if !config.notify_webhook_url.is_empty() {
            channels.push(Box::new(webhook::WebhookChannel::new(
                config.notify_webhook_url.clone(),
                config.notify_webhook_secret.clone(),
            )));
        }
        Self::new(channels)
    }

    pub async fn send_booking_notifications(&self, details: &BookingDetails) -> DispatchReport {
        tracing::debug!(booking_id = %details.booking_id, "sending booking notifications");

        let mut results = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let kind = channel.kind();
            let outcome = match tokio::time::timeout(DELIVERY_TIMEOUT, channel.deliver(details)).await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("delivery timed out")),
            };

            match outcome {
                Ok(()) => results.push(ChannelResult {
                    channel: kind,
                    success: true,
                    error: None,
                }),
                Err(e) => {
                    tracing::warn!(
                        booking_id = %details.booking_id,
                        channel = ?kind,
                        error = %e,
                        "booking notification failed"
                    );
                    results.push(ChannelResult {
                        channel: kind,
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let success = results.iter().all(|r| r.success);
        if success {
            tracing::info!(booking_id = %details.booking_id, "booking notifications sent");
        }
        DispatchReport { success, results }
    }
}
