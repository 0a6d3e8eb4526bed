use async_trait::async_trait;
use tokio::sync::broadcast;

use super::NotificationChannel;
use crate::models::{BookingDetails, ChannelKind};

/// Publishes new bookings to live SSE subscribers.
pub struct RealtimeChannel {
    tx: broadcast::Sender<BookingDetails>,
}

impl RealtimeChannel {
    pub fn new(tx: broadcast::Sender<BookingDetails>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl NotificationChannel for RealtimeChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Realtime
    }

    async fn deliver(&self, details: &BookingDetails) -> anyhow::Result<()> {
        // No subscribers is not a failure
        let _ = self.tx.send(details.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_booking() {
        let (tx, mut rx) = broadcast::channel(8);
        let channel = RealtimeChannel::new(tx);

        channel
            .deliver(&super::super::tests::sample_details())
            .await
            .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.booking_id, "b-1");
    }

    #[tokio::test]
    async fn test_without_subscribers_still_ok() {
        let (tx, _) = broadcast::channel(8);
        let channel = RealtimeChannel::new(tx);
        assert!(channel
            .deliver(&super::super::tests::sample_details())
            .await
            .is_ok());
    }
}
