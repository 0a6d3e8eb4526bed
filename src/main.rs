use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use barbershop::config::AppConfig;
use barbershop::db;
use barbershop::handlers;
use barbershop::services::notifications::NotificationDispatcher;
use barbershop::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    if config.seed_demo_data {
        // Fails harmlessly (rolled back) when the demo rows already exist
        if let Err(e) = db::seed::seed_demo_data(&conn) {
            tracing::warn!(error = %e, "demo data not seeded");
        }
    }
    let db = Arc::new(Mutex::new(conn));

    let (booking_events, _) = broadcast::channel(256);
    let notifier = NotificationDispatcher::from_config(&config, Arc::clone(&db), booking_events.clone());
    if config.notify_webhook_url.is_empty() {
        tracing::info!("webhook notifications disabled (NOTIFY_WEBHOOK_URL not set)");
    }

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        notifier,
        booking_events,
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
