use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    /// Grid step for candidate start times.
    pub slot_step_minutes: i64,
    /// How long a client idempotency key keeps mapping to its booking.
    pub idempotency_window_secs: i64,
    pub points_per_euro: i64,
    /// Empty disables the webhook notification channel.
    pub notify_webhook_url: String,
    pub notify_webhook_secret: String,
    pub seed_demo_data: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "barbershop.db".to_string()),
            slot_step_minutes: env::var("SLOT_STEP_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &i64| *v > 0)
                .unwrap_or(30),
            idempotency_window_secs: env::var("IDEMPOTENCY_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(600),
            points_per_euro: env::var("POINTS_PER_EURO")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL").unwrap_or_default(),
            notify_webhook_secret: env::var("NOTIFY_WEBHOOK_SECRET").unwrap_or_default(),
            seed_demo_data: env::var("SEED_DEMO_DATA")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "barbershop.db".to_string(),
            slot_step_minutes: 30,
            idempotency_window_secs: 600,
            points_per_euro: 1,
            notify_webhook_url: String::new(),
            notify_webhook_secret: String::new(),
            seed_demo_data: false,
        }
    }
}
