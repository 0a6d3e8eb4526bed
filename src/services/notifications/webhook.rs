use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use super::NotificationChannel;
use crate::models::{BookingDetails, ChannelKind};

pub const SIGNATURE_HEADER: &str = "X-Barbershop-Signature";

/// Hands booking details to an external relay (email, mobile push) over HTTP.
pub struct WebhookChannel {
    url: String,
    secret: String,
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(url: String, secret: String) -> Self {
        Self {
            url,
            secret,
            client: reqwest::Client::new(),
        }
    }
}

/// Base64 HMAC-SHA1 of `body` keyed with `secret`.
pub fn sign_payload(secret: &str, body: &[u8]) -> anyhow::Result<String> {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid webhook secret: {e}"))?;
    mac.update(body);
    let result = mac.finalize().into_bytes();
    Ok(base64::engine::general_purpose::STANDARD.encode(result))
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    async fn deliver(&self, details: &BookingDetails) -> anyhow::Result<()> {
        let body = serde_json::to_vec(&serde_json::json!({
            "event": "booking.created",
            "booking": details,
        }))?;

        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if !self.secret.is_empty() {
            request = request.header(SIGNATURE_HEADER, sign_payload(&self.secret, &body)?);
        }

        request
            .body(body)
            .send()
            .await
            .context("failed to reach notification webhook")?
            .error_for_status()
            .context("notification webhook returned error")?;

        Ok(())
    }
}
